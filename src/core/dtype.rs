use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray, PrimitiveArray, StringArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type, UInt64Type,
};
use serde::{Deserialize, Serialize};

use crate::core::error::{ColflowError, Result};

/// Element type identifier carried by every column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Utf8,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Bool,
}

impl DType {
    pub fn name(&self) -> &'static str {
        match self {
            DType::Utf8 => "utf8",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Uint8 => "uint8",
            DType::Uint16 => "uint16",
            DType::Uint32 => "uint32",
            DType::Uint64 => "uint64",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Bool => "bool",
        }
    }

    /// Map an Arrow type onto a column type. Dictionary types map to their value type.
    pub fn from_arrow(data_type: &DataType) -> Option<DType> {
        match data_type {
            DataType::Utf8 => Some(DType::Utf8),
            DataType::Int8 => Some(DType::Int8),
            DataType::Int16 => Some(DType::Int16),
            DataType::Int32 => Some(DType::Int32),
            DataType::Int64 => Some(DType::Int64),
            DataType::UInt8 => Some(DType::Uint8),
            DataType::UInt16 => Some(DType::Uint16),
            DataType::UInt32 => Some(DType::Uint32),
            DataType::UInt64 => Some(DType::Uint64),
            DataType::Float32 => Some(DType::Float32),
            DataType::Float64 => Some(DType::Float64),
            DataType::Boolean => Some(DType::Bool),
            DataType::Dictionary(_, value) => DType::from_arrow(value),
            _ => None,
        }
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<&DType> for DataType {
    fn from(dtype: &DType) -> Self {
        match dtype {
            DType::Utf8 => DataType::Utf8,
            DType::Int8 => DataType::Int8,
            DType::Int16 => DataType::Int16,
            DType::Int32 => DataType::Int32,
            DType::Int64 => DataType::Int64,
            DType::Uint8 => DataType::UInt8,
            DType::Uint16 => DataType::UInt16,
            DType::Uint32 => DataType::UInt32,
            DType::Uint64 => DataType::UInt64,
            DType::Float32 => DataType::Float32,
            DType::Float64 => DataType::Float64,
            DType::Bool => DataType::Boolean,
        }
    }
}

/// A Rust type that can live in a column buffer.
///
/// `Default::default()` is the placeholder written into slots whose row is null:
/// zero for numbers, `false` for bool, the empty string for utf8.
pub trait Element: Clone + Default + Debug + Send + Sync + 'static {
    const DTYPE: DType;

    /// Copy the values of a plain (non-dictionary) Arrow array. Null slots become
    /// `Default::default()`.
    fn from_arrow(array: &dyn Array) -> Result<Vec<Self>>;

    /// Build an Arrow array from logical rows.
    fn to_arrow(values: Vec<Option<Self>>) -> ArrayRef;
}

fn arrow_mismatch(expected: DType, actual: &DataType) -> ColflowError {
    ColflowError::TypeMismatch {
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

macro_rules! primitive_element {
    ($native:ty, $dtype:ident, $arrow:ty) => {
        impl Element for $native {
            const DTYPE: DType = DType::$dtype;

            fn from_arrow(array: &dyn Array) -> Result<Vec<Self>> {
                let typed = array
                    .as_primitive_opt::<$arrow>()
                    .ok_or_else(|| arrow_mismatch(Self::DTYPE, array.data_type()))?;
                Ok((0..typed.len())
                    .map(|i| if typed.is_null(i) { <$native>::default() } else { typed.value(i) })
                    .collect())
            }

            fn to_arrow(values: Vec<Option<Self>>) -> ArrayRef {
                Arc::new(values.into_iter().collect::<PrimitiveArray<$arrow>>())
            }
        }
    };
}

primitive_element!(i8, Int8, Int8Type);
primitive_element!(i16, Int16, Int16Type);
primitive_element!(i32, Int32, Int32Type);
primitive_element!(i64, Int64, Int64Type);
primitive_element!(u8, Uint8, UInt8Type);
primitive_element!(u16, Uint16, UInt16Type);
primitive_element!(u32, Uint32, UInt32Type);
primitive_element!(u64, Uint64, UInt64Type);
primitive_element!(f32, Float32, Float32Type);
primitive_element!(f64, Float64, Float64Type);

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn from_arrow(array: &dyn Array) -> Result<Vec<Self>> {
        let typed = array
            .as_boolean_opt()
            .ok_or_else(|| arrow_mismatch(Self::DTYPE, array.data_type()))?;
        Ok((0..typed.len())
            .map(|i| !typed.is_null(i) && typed.value(i))
            .collect())
    }

    fn to_arrow(values: Vec<Option<Self>>) -> ArrayRef {
        Arc::new(values.into_iter().collect::<BooleanArray>())
    }
}

impl Element for String {
    const DTYPE: DType = DType::Utf8;

    fn from_arrow(array: &dyn Array) -> Result<Vec<Self>> {
        let typed = array
            .as_string_opt::<i32>()
            .ok_or_else(|| arrow_mismatch(Self::DTYPE, array.data_type()))?;
        Ok((0..typed.len())
            .map(|i| {
                if typed.is_null(i) {
                    String::new()
                } else {
                    typed.value(i).to_string()
                }
            })
            .collect())
    }

    fn to_arrow(values: Vec<Option<Self>>) -> ArrayRef {
        Arc::new(values.into_iter().collect::<StringArray>())
    }
}

/// Call `$func::<T>(args)` with the Rust element type behind a [`DType`].
macro_rules! dispatch_element {
    ($dtype:expr, $func:ident ( $($arg:expr),* $(,)? )) => {
        match $dtype {
            $crate::core::DType::Utf8 => $func::<String>($($arg),*),
            $crate::core::DType::Int8 => $func::<i8>($($arg),*),
            $crate::core::DType::Int16 => $func::<i16>($($arg),*),
            $crate::core::DType::Int32 => $func::<i32>($($arg),*),
            $crate::core::DType::Int64 => $func::<i64>($($arg),*),
            $crate::core::DType::Uint8 => $func::<u8>($($arg),*),
            $crate::core::DType::Uint16 => $func::<u16>($($arg),*),
            $crate::core::DType::Uint32 => $func::<u32>($($arg),*),
            $crate::core::DType::Uint64 => $func::<u64>($($arg),*),
            $crate::core::DType::Float32 => $func::<f32>($($arg),*),
            $crate::core::DType::Float64 => $func::<f64>($($arg),*),
            $crate::core::DType::Bool => $func::<bool>($($arg),*),
        }
    };
}
pub(crate) use dispatch_element;
