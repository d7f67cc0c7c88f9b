// ============================================================================
// Serialized Forms
// Plain representations used to copy types across a process boundary
// ============================================================================
//
// Deserialized RealTypes are resolved through the global registry, so
// nominal equality survives the copy.

use super::math_type::{MathType, RealTupleType};
use super::scalar::{RealType, TextType, TypeRegistry};
use crate::coords::CoordinateSystem;
use crate::error::UnitFieldError;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Deserialize)]
pub struct RealTypeRepr {
    name: String,
    unit: Option<Unit>,
    interval: bool,
}

impl From<RealType> for RealTypeRepr {
    fn from(t: RealType) -> Self {
        Self {
            name: t.name().to_string(),
            unit: t.default_unit().cloned(),
            interval: t.is_interval(),
        }
    }
}

impl TryFrom<RealTypeRepr> for RealType {
    type Error = UnitFieldError;

    fn try_from(r: RealTypeRepr) -> Result<Self, Self::Error> {
        TypeRegistry::global().get_or_create_real(&r.name, r.unit, r.interval)
    }
}

#[derive(Serialize, Deserialize)]
pub struct RealTupleTypeRepr {
    components: Vec<RealType>,
    coordinate_system: Option<CoordinateSystem>,
    vector: bool,
}

impl From<RealTupleType> for RealTupleTypeRepr {
    fn from(t: RealTupleType) -> Self {
        Self {
            components: t.components().to_vec(),
            coordinate_system: t.coordinate_system().map(|cs| cs.as_ref().clone()),
            vector: t.is_vector(),
        }
    }
}

impl TryFrom<RealTupleTypeRepr> for RealTupleType {
    type Error = UnitFieldError;

    fn try_from(r: RealTupleTypeRepr) -> Result<Self, Self::Error> {
        let tuple = if r.vector {
            RealTupleType::vector(r.components)?
        } else {
            RealTupleType::new(r.components)?
        };
        match r.coordinate_system {
            Some(cs) => tuple.with_coordinate_system(Arc::new(cs)),
            None => Ok(tuple),
        }
    }
}

#[derive(Serialize, Deserialize)]
pub enum MathTypeRepr {
    Real(RealType),
    Text(TextType),
    RealTuple(RealTupleType),
    Tuple(Vec<MathType>),
    Function { domain: RealTupleType, range: Box<MathType> },
    Set(RealTupleType),
}

impl From<MathType> for MathTypeRepr {
    fn from(t: MathType) -> Self {
        match t {
            MathType::Real(r) => MathTypeRepr::Real(r),
            MathType::Text(t) => MathTypeRepr::Text(t),
            MathType::RealTuple(t) => MathTypeRepr::RealTuple(t),
            MathType::Tuple(t) => MathTypeRepr::Tuple(t.components().to_vec()),
            MathType::Function(f) => MathTypeRepr::Function {
                domain: f.domain().clone(),
                range: Box::new(f.range().clone()),
            },
            MathType::Set(s) => MathTypeRepr::Set(s.domain().clone()),
        }
    }
}

impl TryFrom<MathTypeRepr> for MathType {
    type Error = UnitFieldError;

    fn try_from(r: MathTypeRepr) -> Result<Self, Self::Error> {
        match r {
            MathTypeRepr::Real(r) => Ok(MathType::Real(r)),
            MathTypeRepr::Text(t) => Ok(MathType::Text(t)),
            MathTypeRepr::RealTuple(t) => Ok(MathType::RealTuple(t)),
            MathTypeRepr::Tuple(parts) => MathType::tuple(parts),
            MathTypeRepr::Function { domain, range } => {
                MathType::function(MathType::RealTuple(domain), *range)
            }
            MathTypeRepr::Set(domain) => MathType::set(MathType::RealTuple(domain)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::catalog;

    #[test]
    fn test_type_survives_json_copy() {
        let t = RealType::named("SerdeTemperature", Some(catalog::kelvin())).unwrap();
        let f = MathType::function(
            MathType::Real(RealType::named("SerdeTime", None).unwrap()),
            MathType::Real(t.clone()),
        )
        .unwrap();
        let json = serde_json::to_string(&f).unwrap();
        let back: MathType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, f);
        let range = back.as_function().unwrap().range().as_real().unwrap().clone();
        assert_eq!(range.default_unit(), Some(&catalog::kelvin()));
    }
}
