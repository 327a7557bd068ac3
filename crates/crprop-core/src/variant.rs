//! [`Variant`]: tagged value stored in a candidate's property bag.

use std::fmt;

use crate::error::VariantError;
use crate::vector::Vector3d;

/// A heterogeneous property value.
///
/// Accessors are fallible and never convert between types: asking a
/// `Float` for an integer is a [`VariantError`] naming both types.
#[derive(Clone, Debug, PartialEq)]
pub enum Variant {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Double-precision float.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Three-vector.
    Vector3(Vector3d),
    /// Nested sequence of values.
    Sequence(Vec<Variant>),
}

impl Variant {
    /// Name of the stored type, as used in [`VariantError`].
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Vector3(_) => "vector3",
            Self::Sequence(_) => "sequence",
        }
    }

    fn mismatch(&self, requested: &'static str) -> VariantError {
        VariantError {
            requested,
            actual: self.type_name(),
        }
    }

    /// The stored boolean.
    pub fn as_bool(&self) -> Result<bool, VariantError> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    /// The stored signed integer.
    pub fn as_int(&self) -> Result<i64, VariantError> {
        match self {
            Self::Int(i) => Ok(*i),
            other => Err(other.mismatch("int")),
        }
    }

    /// The stored unsigned integer.
    pub fn as_uint(&self) -> Result<u64, VariantError> {
        match self {
            Self::UInt(u) => Ok(*u),
            other => Err(other.mismatch("uint")),
        }
    }

    /// The stored float.
    pub fn as_float(&self) -> Result<f64, VariantError> {
        match self {
            Self::Float(f) => Ok(*f),
            other => Err(other.mismatch("float")),
        }
    }

    /// The stored string.
    pub fn as_str(&self) -> Result<&str, VariantError> {
        match self {
            Self::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    /// The stored vector.
    pub fn as_vector3(&self) -> Result<&Vector3d, VariantError> {
        match self {
            Self::Vector3(v) => Ok(v),
            other => Err(other.mismatch("vector3")),
        }
    }

    /// The stored sequence.
    pub fn as_sequence(&self) -> Result<&[Variant], VariantError> {
        match self {
            Self::Sequence(items) => Ok(items),
            other => Err(other.mismatch("sequence")),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Vector3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Self::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Variant {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Variant {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vector3d> for Variant {
    fn from(v: Vector3d) -> Self {
        Self::Vector3(v)
    }
}

impl From<Vec<Variant>> for Variant {
    fn from(v: Vec<Variant>) -> Self {
        Self::Sequence(v)
    }
}
