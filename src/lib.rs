pub mod batch;
pub mod conf;
pub mod core;
pub mod io;
pub mod table;
pub mod transform;

#[cfg(feature = "testutil")]
pub mod testutil;
