use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Result of an operation.
///
/// Integers are exact. They serialize as JSON numbers while they fit in 64
/// bits and as decimal strings beyond that, so a stored value always reads
/// back identical to what was written.
#[derive(Clone, Debug, PartialEq)]
pub enum MathValue {
    Integer(BigInt),
    Real(f64),
}

impl From<BigInt> for MathValue {
    fn from(value: BigInt) -> Self {
        MathValue::Integer(value)
    }
}

impl From<u64> for MathValue {
    fn from(value: u64) -> Self {
        MathValue::Integer(BigInt::from(value))
    }
}

impl From<i64> for MathValue {
    fn from(value: i64) -> Self {
        MathValue::Integer(BigInt::from(value))
    }
}

impl fmt::Display for MathValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathValue::Integer(n) => write!(f, "{}", n),
            MathValue::Real(v) => write!(f, "{}", v),
        }
    }
}

impl Serialize for MathValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MathValue::Integer(n) => {
                if let Some(v) = n.to_i64() {
                    serializer.serialize_i64(v)
                } else if let Some(v) = n.to_u64() {
                    serializer.serialize_u64(v)
                } else {
                    serializer.serialize_str(&n.to_string())
                }
            }
            MathValue::Real(v) => serializer.serialize_f64(*v),
        }
    }
}

struct MathValueVisitor;

impl Visitor<'_> for MathValueVisitor {
    type Value = MathValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a decimal integer string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MathValue, E> {
        Ok(MathValue::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MathValue, E> {
        Ok(MathValue::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MathValue, E> {
        Ok(MathValue::Real(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MathValue, E> {
        BigInt::from_str(v)
            .map(MathValue::Integer)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for MathValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MathValueVisitor)
    }
}
