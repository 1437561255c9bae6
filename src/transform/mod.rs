mod elementwise;

pub use elementwise::ElementwiseTransform;
