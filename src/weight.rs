//! Relation weight types and values.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::matrix::Semiring;

/// The value type a relation stores, fixed when the relation is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeightType {
    #[default]
    Bool,
    Int64,
    UInt64,
    Float64,
}

impl WeightType {
    /// The weight `add` stores when the caller gives none: the semiring one.
    pub fn default_weight(self) -> Weight {
        match self {
            WeightType::Bool => Weight::Bool(bool::one()),
            WeightType::Int64 => Weight::Int64(i64::one()),
            WeightType::UInt64 => Weight::UInt64(u64::one()),
            WeightType::Float64 => Weight::Float64(f64::one()),
        }
    }

    /// Stable numeric code used by the registry archive
    pub fn code(self) -> u8 {
        match self {
            WeightType::Bool => 0,
            WeightType::Int64 => 1,
            WeightType::UInt64 => 2,
            WeightType::Float64 => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(WeightType::Bool),
            1 => Some(WeightType::Int64),
            2 => Some(WeightType::UInt64),
            3 => Some(WeightType::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for WeightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeightType::Bool => "Bool",
            WeightType::Int64 => "Int64",
            WeightType::UInt64 => "UInt64",
            WeightType::Float64 => "Float64",
        };
        f.write_str(name)
    }
}

/// A single stored weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Weight {
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
}

impl Weight {
    pub fn weight_type(&self) -> WeightType {
        match self {
            Weight::Bool(_) => WeightType::Bool,
            Weight::Int64(_) => WeightType::Int64,
            Weight::UInt64(_) => WeightType::UInt64,
            Weight::Float64(_) => WeightType::Float64,
        }
    }

    /// Convert to `expected` when no information is lost.
    ///
    /// Integers move between `Int64` and `UInt64` when the value fits, and
    /// into `Float64` when it is exactly representable (|v| <= 2^53).
    /// `Bool` and `Float64` weights only match their own type.
    pub fn coerce(self, relation: &str, expected: WeightType) -> Result<Weight> {
        const EXACT_F64: u64 = 1 << 53;

        let converted = match (self, expected) {
            (w, t) if w.weight_type() == t => Some(w),
            (Weight::Int64(v), WeightType::UInt64) => u64::try_from(v).ok().map(Weight::UInt64),
            (Weight::UInt64(v), WeightType::Int64) => i64::try_from(v).ok().map(Weight::Int64),
            (Weight::Int64(v), WeightType::Float64) if v.unsigned_abs() <= EXACT_F64 => {
                Some(Weight::Float64(v as f64))
            }
            (Weight::UInt64(v), WeightType::Float64) if v <= EXACT_F64 => {
                Some(Weight::Float64(v as f64))
            }
            _ => None,
        };
        converted.ok_or_else(|| GraphError::WeightType {
            relation: relation.to_string(),
            expected,
            found: self.weight_type(),
        })
    }

    /// Type error unless this weight can be stored in a `expected` relation
    pub fn check(&self, relation: &str, expected: WeightType) -> Result<()> {
        self.coerce(relation, expected).map(|_| ())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Weight::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Weight::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Weight::UInt64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Weight::Float64(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric view for algorithm consumers (`true` is 1.0)
    pub fn to_f64(&self) -> f64 {
        match *self {
            Weight::Bool(b) => f64::from(u8::from(b)),
            Weight::Int64(v) => v as f64,
            Weight::UInt64(v) => v as f64,
            Weight::Float64(v) => v,
        }
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Bool(b) => write!(f, "{}", b),
            Weight::Int64(v) => write!(f, "{}", v),
            Weight::UInt64(v) => write!(f, "{}", v),
            Weight::Float64(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Weight {
    fn from(b: bool) -> Self {
        Weight::Bool(b)
    }
}

impl From<i64> for Weight {
    fn from(v: i64) -> Self {
        Weight::Int64(v)
    }
}

impl From<i32> for Weight {
    fn from(v: i32) -> Self {
        Weight::Int64(i64::from(v))
    }
}

impl From<u64> for Weight {
    fn from(v: u64) -> Self {
        Weight::UInt64(v)
    }
}

impl From<f64> for Weight {
    fn from(v: f64) -> Self {
        Weight::Float64(v)
    }
}
