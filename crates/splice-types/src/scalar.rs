use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::path::GenericPath;

/// Leaf value carried by generic tree nodes.
///
/// Scalars are restricted to the value space the schema describes for
/// leaves: booleans, integers, strings, the empty type, and
/// instance-identifiers (pre-encoded generic paths, used by context-routed
/// operations).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scalar {
    /// The schema "empty" type: presence is the value.
    Empty,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Str(String),
    /// A pre-encoded instance path.
    Path(GenericPath),
}

impl Scalar {
    /// Convert to the typed JSON representation.
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Empty => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Uint(u) => Value::from(*u),
            Scalar::Str(s) => Value::String(s.clone()),
            // Paths keep their structured form so the typed side can
            // deserialize them back into a GenericPath.
            Scalar::Path(p) => serde_json::to_value(p).unwrap_or(Value::Null),
        }
    }

    /// Interpret a typed JSON value as a scalar.
    pub fn from_json(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::Null => Ok(Scalar::Empty),
            Value::Bool(b) => Ok(Scalar::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Scalar::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Scalar::Uint(u))
                } else {
                    Err(TypeError::InvalidScalar(n.to_string()))
                }
            }
            Value::String(s) => Ok(Scalar::Str(s.clone())),
            Value::Array(_) => serde_json::from_value::<GenericPath>(value.clone())
                .map(Scalar::Path)
                .map_err(|e| TypeError::InvalidScalar(e.to_string())),
            Value::Object(_) => Err(TypeError::InvalidScalar(
                "object is not a scalar".to_string(),
            )),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Empty => f.write_str("(empty)"),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Uint(u) => write!(f, "{u}"),
            Scalar::Str(s) => f.write_str(s),
            Scalar::Path(p) => write!(f, "{p}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Int(i)
    }
}

impl From<u64> for Scalar {
    fn from(u: u64) -> Self {
        Scalar::Uint(u)
    }
}

impl From<GenericPath> for Scalar {
    fn from(p: GenericPath) -> Self {
        Scalar::Path(p)
    }
}
