// src/utils/serde_array.rs
//! `{shape, data}` representation of n-dimensional float arrays.
//!
//! Data is stored in row-major order. Non-finite values are written as `null` and read
//! back as NaN. Use with `#[serde(with = "crate::utils::serde_array")]`.

use ndarray::{Array, ArrayD, Dimension, IxDyn};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize)]
struct ArrayRef<'a> {
    shape: &'a [usize],
    data: Vec<Option<f64>>,
}

#[derive(Deserialize)]
struct ArrayRepr {
    shape: Vec<usize>,
    data: Vec<Option<f64>>,
}

/// Write `{shape, data}`
pub fn serialize<S, D>(array: &Array<f64, D>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    D: Dimension,
{
    ArrayRef {
        shape: array.shape(),
        data: array.iter().map(|v| v.is_finite().then_some(*v)).collect(),
    }
    .serialize(serializer)
}

/// Read `{shape, data}`, checking the length against the shape
pub fn deserialize<'de, De, D>(deserializer: De) -> Result<Array<f64, D>, De::Error>
where
    De: Deserializer<'de>,
    D: Dimension,
{
    let repr = ArrayRepr::deserialize(deserializer)?;
    let data: Vec<f64> = repr.data.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
    let array: ArrayD<f64> = ArrayD::from_shape_vec(IxDyn(&repr.shape), data).map_err(De::Error::custom)?;
    array.into_dimensionality::<D>().map_err(De::Error::custom)
}

/// A single float that may be NaN, stored as `null` when not finite
pub mod nullable {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Write NaN as `null`
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    /// Read `null` back as NaN
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
