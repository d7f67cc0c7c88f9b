// ============================================================================
// Packed Storage
// Per-component columns held as floats or as quantized discretization codes
// ============================================================================
//
// Quantized columns store `index + MIN + 1` for discretization index
// `index`; `MIN` of the width is the missing sentinel. A width is chosen so
// every index plus the sentinel fits:
//
//     len < 256    → i8
//     len < 65536  → i16
//     otherwise    → i32
// ============================================================================

use crate::config::FloatStorage;
use crate::error::{Result, UnitFieldError};
use crate::sets::Discretization;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Storage representation of one range component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StorageCode {
    Double,
    Float,
    Byte,
    Short,
    Int,
}

impl StorageCode {
    /// Narrowest quantized width for a discretization, or the floating
    /// fallback when there is none.
    pub fn for_discretization(
        discretization: Option<&Discretization>,
        fallback: FloatStorage,
    ) -> Self {
        match discretization {
            Some(d) if d.len() < 256 => StorageCode::Byte,
            Some(d) if d.len() < 65_536 => StorageCode::Short,
            Some(_) => StorageCode::Int,
            None => match fallback {
                FloatStorage::Double => StorageCode::Double,
                FloatStorage::Float => StorageCode::Float,
            },
        }
    }

    #[inline]
    pub fn is_quantized(self) -> bool {
        matches!(self, StorageCode::Byte | StorageCode::Short | StorageCode::Int)
    }

    /// Bytes per stored value
    #[inline]
    pub fn width(self) -> usize {
        match self {
            StorageCode::Double => 8,
            StorageCode::Float | StorageCode::Int => 4,
            StorageCode::Short => 2,
            StorageCode::Byte => 1,
        }
    }
}

impl fmt::Display for StorageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageCode::Double => "double",
            StorageCode::Float => "float",
            StorageCode::Byte => "byte",
            StorageCode::Short => "short",
            StorageCode::Int => "int",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Code Conversion
// ============================================================================

macro_rules! quantized {
    ($encode:ident, $decode:ident, $t:ty) => {
        #[inline]
        fn $encode(index: Option<usize>) -> Result<$t> {
            match index {
                None => Ok(<$t>::MIN),
                Some(i) => {
                    let code = i as i64 + <$t>::MIN as i64 + 1;
                    <$t>::try_from(code).map_err(|_| {
                        UnitFieldError::discretization(format!(
                            "index {i} does not fit {} storage",
                            stringify!($t)
                        ))
                    })
                }
            }
        }

        #[inline]
        fn $decode(code: $t) -> Option<usize> {
            (code != <$t>::MIN).then(|| (code as i64 - <$t>::MIN as i64 - 1) as usize)
        }
    };
}

quantized!(encode_i8, decode_i8, i8);
quantized!(encode_i16, decode_i16, i16);
quantized!(encode_i32, decode_i32, i32);

fn require(discretization: Option<&Discretization>) -> Result<&Discretization> {
    discretization
        .ok_or_else(|| UnitFieldError::discretization("quantized column without a discretization"))
}

fn decode_value(index: Option<usize>, discretization: &Discretization) -> Result<f64> {
    match index {
        None => Ok(f64::NAN),
        Some(i) => discretization.value_at(i),
    }
}

// ============================================================================
// Packed Column
// ============================================================================

/// One range component's values in their storage representation.
#[derive(Debug, Clone, PartialEq)]
pub enum PackedColumn {
    Double(Vec<f64>),
    Float(Vec<f32>),
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
}

impl PackedColumn {
    /// A column of `len` missing values.
    pub fn missing(code: StorageCode, len: usize) -> Self {
        match code {
            StorageCode::Double => PackedColumn::Double(vec![f64::NAN; len]),
            StorageCode::Float => PackedColumn::Float(vec![f32::NAN; len]),
            StorageCode::Byte => PackedColumn::Byte(vec![i8::MIN; len]),
            StorageCode::Short => PackedColumn::Short(vec![i16::MIN; len]),
            StorageCode::Int => PackedColumn::Int(vec![i32::MIN; len]),
        }
    }

    #[inline]
    pub fn code(&self) -> StorageCode {
        match self {
            PackedColumn::Double(_) => StorageCode::Double,
            PackedColumn::Float(_) => StorageCode::Float,
            PackedColumn::Byte(_) => StorageCode::Byte,
            PackedColumn::Short(_) => StorageCode::Short,
            PackedColumn::Int(_) => StorageCode::Int,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PackedColumn::Double(v) => v.len(),
            PackedColumn::Float(v) => v.len(),
            PackedColumn::Byte(v) => v.len(),
            PackedColumn::Short(v) => v.len(),
            PackedColumn::Int(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pack doubles into `code` storage.
    ///
    /// # Errors
    /// `Discretization` when a quantized column has no discretization or
    /// a value falls outside it.
    pub fn pack(
        code: StorageCode,
        values: &[f64],
        discretization: Option<&Discretization>,
    ) -> Result<Self> {
        Ok(match code {
            StorageCode::Double => PackedColumn::Double(values.to_vec()),
            StorageCode::Float => PackedColumn::Float(values.iter().map(|v| *v as f32).collect()),
            StorageCode::Byte => {
                let d = require(discretization)?;
                PackedColumn::Byte(
                    values
                        .iter()
                        .map(|v| encode_i8(d.index_of(*v)?))
                        .collect::<Result<_>>()?,
                )
            }
            StorageCode::Short => {
                let d = require(discretization)?;
                PackedColumn::Short(
                    values
                        .iter()
                        .map(|v| encode_i16(d.index_of(*v)?))
                        .collect::<Result<_>>()?,
                )
            }
            StorageCode::Int => {
                let d = require(discretization)?;
                PackedColumn::Int(
                    values
                        .iter()
                        .map(|v| encode_i32(d.index_of(*v)?))
                        .collect::<Result<_>>()?,
                )
            }
        })
    }

    /// Pack single-precision values; float columns keep them unchanged.
    pub fn pack_floats(
        code: StorageCode,
        values: &[f32],
        discretization: Option<&Discretization>,
    ) -> Result<Self> {
        match code {
            StorageCode::Float => Ok(PackedColumn::Float(values.to_vec())),
            _ => {
                let wide: Vec<f64> = values.iter().map(|v| f64::from(*v)).collect();
                Self::pack(code, &wide, discretization)
            }
        }
    }

    /// Unpack to doubles; the sentinel becomes NaN.
    pub fn unpack(&self, discretization: Option<&Discretization>) -> Result<Vec<f64>> {
        match self {
            PackedColumn::Double(v) => Ok(v.clone()),
            PackedColumn::Float(v) => Ok(v.iter().map(|x| f64::from(*x)).collect()),
            PackedColumn::Byte(v) => {
                let d = require(discretization)?;
                v.iter().map(|c| decode_value(decode_i8(*c), d)).collect()
            }
            PackedColumn::Short(v) => {
                let d = require(discretization)?;
                v.iter().map(|c| decode_value(decode_i16(*c), d)).collect()
            }
            PackedColumn::Int(v) => {
                let d = require(discretization)?;
                v.iter().map(|c| decode_value(decode_i32(*c), d)).collect()
            }
        }
    }

    /// Unpack to single precision.
    pub fn unpack_floats(&self, discretization: Option<&Discretization>) -> Result<Vec<f32>> {
        match self {
            PackedColumn::Float(v) => Ok(v.clone()),
            other => Ok(other.unpack(discretization)?.into_iter().map(|v| v as f32).collect()),
        }
    }

    /// One value, unpacked.
    pub fn get(&self, index: usize, discretization: Option<&Discretization>) -> Result<f64> {
        if index >= self.len() {
            return Err(UnitFieldError::shape(format!(
                "sample {index} outside column of length {}",
                self.len()
            )));
        }
        match self {
            PackedColumn::Double(v) => Ok(v[index]),
            PackedColumn::Float(v) => Ok(f64::from(v[index])),
            PackedColumn::Byte(v) => decode_value(decode_i8(v[index]), require(discretization)?),
            PackedColumn::Short(v) => decode_value(decode_i16(v[index]), require(discretization)?),
            PackedColumn::Int(v) => decode_value(decode_i32(v[index]), require(discretization)?),
        }
    }

    /// Pack one value in place.
    pub fn set(
        &mut self,
        index: usize,
        value: f64,
        discretization: Option<&Discretization>,
    ) -> Result<()> {
        if index >= self.len() {
            return Err(UnitFieldError::shape(format!(
                "sample {index} outside column of length {}",
                self.len()
            )));
        }
        match self {
            PackedColumn::Double(v) => v[index] = value,
            PackedColumn::Float(v) => v[index] = value as f32,
            PackedColumn::Byte(v) => {
                v[index] = encode_i8(require(discretization)?.index_of(value)?)?;
            }
            PackedColumn::Short(v) => {
                v[index] = encode_i16(require(discretization)?.index_of(value)?)?;
            }
            PackedColumn::Int(v) => {
                v[index] = encode_i32(require(discretization)?.index_of(value)?)?;
            }
        }
        Ok(())
    }

    pub fn is_missing_at(&self, index: usize) -> bool {
        match self {
            PackedColumn::Double(v) => v.get(index).map_or(true, |x| x.is_nan()),
            PackedColumn::Float(v) => v.get(index).map_or(true, |x| x.is_nan()),
            PackedColumn::Byte(v) => v.get(index).map_or(true, |c| *c == i8::MIN),
            PackedColumn::Short(v) => v.get(index).map_or(true, |c| *c == i16::MIN),
            PackedColumn::Int(v) => v.get(index).map_or(true, |c| *c == i32::MIN),
        }
    }

    /// True when any entry is present
    pub fn any_present(&self) -> bool {
        (0..self.len()).any(|i| !self.is_missing_at(i))
    }

    /// Copy stored codes from the given source rows; `None` rows are
    /// missing. No unpacking takes place.
    pub fn gather(&self, rows: &[Option<usize>]) -> Self {
        fn pick<T: Copy>(v: &[T], rows: &[Option<usize>], missing: T) -> Vec<T> {
            rows.iter()
                .map(|r| r.and_then(|i| v.get(i).copied()).unwrap_or(missing))
                .collect()
        }
        match self {
            PackedColumn::Double(v) => PackedColumn::Double(pick(v, rows, f64::NAN)),
            PackedColumn::Float(v) => PackedColumn::Float(pick(v, rows, f32::NAN)),
            PackedColumn::Byte(v) => PackedColumn::Byte(pick(v, rows, i8::MIN)),
            PackedColumn::Short(v) => PackedColumn::Short(pick(v, rows, i16::MIN)),
            PackedColumn::Int(v) => PackedColumn::Int(pick(v, rows, i32::MIN)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_width_selection() {
        let small = Discretization::linear(0.0, 199.0, 200).unwrap();
        let medium = Discretization::linear(0.0, 1.0, 40_000).unwrap();
        let large = Discretization::integer(70_000).unwrap();
        let edge = Discretization::integer(255).unwrap();
        let code = |d: Option<&Discretization>, fallback: FloatStorage| {
            StorageCode::for_discretization(d, fallback)
        };
        assert_eq!(code(Some(&small), FloatStorage::Double), StorageCode::Byte);
        assert_eq!(code(Some(&edge), FloatStorage::Double), StorageCode::Byte);
        assert_eq!(code(Some(&medium), FloatStorage::Double), StorageCode::Short);
        assert_eq!(code(Some(&large), FloatStorage::Double), StorageCode::Int);
        assert_eq!(code(None, FloatStorage::Float), StorageCode::Float);
    }

    #[test]
    fn test_sentinel_round_trip() {
        let d = Discretization::integer(255).unwrap();
        let packed =
            PackedColumn::pack(StorageCode::Byte, &[0.0, f64::NAN, 254.0], Some(&d)).unwrap();
        assert_eq!(packed, PackedColumn::Byte(vec![-127, i8::MIN, 127]));
        let back = packed.unpack(Some(&d)).unwrap();
        assert_eq!(back[0], 0.0);
        assert!(back[1].is_nan());
        assert_eq!(back[2], 254.0);
        assert!(packed.is_missing_at(1));
        assert!(packed.any_present());
    }

    #[test]
    fn test_out_of_range_fails() {
        let d = Discretization::linear(0.0, 10.0, 11).unwrap();
        assert!(matches!(
            PackedColumn::pack(StorageCode::Byte, &[12.0], Some(&d)),
            Err(UnitFieldError::Discretization(_))
        ));
        assert!(PackedColumn::pack(StorageCode::Short, &[1.0], None).is_err());
        assert!(PackedColumn::Short(vec![100]).unpack(Some(&d)).is_err());
    }

    #[test]
    fn test_gather_and_set() {
        let d = Discretization::integer(10).unwrap();
        let mut col = PackedColumn::pack(StorageCode::Byte, &[1.0, 2.0, 3.0], Some(&d)).unwrap();
        let picked = col.gather(&[Some(2), None, Some(0)]);
        assert_eq!(picked.unpack(Some(&d)).unwrap()[0], 3.0);
        assert!(picked.is_missing_at(1));
        col.set(1, 9.0, Some(&d)).unwrap();
        assert_eq!(col.get(1, Some(&d)).unwrap(), 9.0);
        assert!(col.set(3, 1.0, Some(&d)).is_err());
        let empty = PackedColumn::missing(StorageCode::Int, 4).unpack(Some(&d)).unwrap();
        assert!(empty.iter().all(|v| v.is_nan()));
    }

    proptest! {
        #[test]
        fn prop_quantized_round_trip(
            index in 0usize..40_000,
            first in -1e3f64..1e3,
            span in 1.0f64..1e4,
        ) {
            let d = Discretization::linear(first, first + span, 40_000).unwrap();
            let value = d.value_at(index).unwrap();
            let values = [value, value + 0.3 * d.step()];
            let packed = PackedColumn::pack(StorageCode::Short, &values, Some(&d)).unwrap();
            let back = packed.unpack(Some(&d)).unwrap();
            prop_assert!((back[0] - value).abs() <= 1e-9 * span.max(1.0));
            prop_assert!((back[1] - value).abs() <= d.step() * 0.5 + 1e-9 * span);
        }
    }
}
