//! Primitive wire types shared by every generated binding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Closed set of primitive types an endpoint value or argument can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Void,
    Bool,
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float,
    Double,
    /// Variable-length string; has no fixed wire size.
    Str,
}

impl DataType {
    /// Every registered type, in registry order.
    pub const ALL: [DataType; 13] = [
        DataType::Void,
        DataType::Bool,
        DataType::UInt8,
        DataType::Int8,
        DataType::UInt16,
        DataType::Int16,
        DataType::UInt32,
        DataType::Int32,
        DataType::UInt64,
        DataType::Int64,
        DataType::Float,
        DataType::Double,
        DataType::Str,
    ];

    /// Canonical (lowercase) name as written in a spec.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Void => "void",
            DataType::Bool => "bool",
            DataType::UInt8 => "uint8",
            DataType::Int8 => "int8",
            DataType::UInt16 => "uint16",
            DataType::Int16 => "int16",
            DataType::UInt32 => "uint32",
            DataType::Int32 => "int32",
            DataType::UInt64 => "uint64",
            DataType::Int64 => "int64",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Str => "string",
        }
    }

    /// Size on the wire in bytes. `Void` and `Str` are unsized and report 0.
    pub fn size(self) -> usize {
        match self {
            DataType::Void | DataType::Str => 0,
            DataType::Bool | DataType::UInt8 | DataType::Int8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float => 4,
            DataType::UInt64 | DataType::Int64 | DataType::Double => 8,
        }
    }

    /// C spelling used by firmware and host headers.
    pub fn c_name(self) -> &'static str {
        match self {
            DataType::Void => "void",
            DataType::Bool => "bool",
            DataType::UInt8 => "uint8_t",
            DataType::Int8 => "int8_t",
            DataType::UInt16 => "uint16_t",
            DataType::Int16 => "int16_t",
            DataType::UInt32 => "uint32_t",
            DataType::Int32 => "int32_t",
            DataType::UInt64 => "uint64_t",
            DataType::Int64 => "int64_t",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Str => "char",
        }
    }

    pub fn is_sized(self) -> bool {
        self.size() > 0
    }

    /// Look up a type by name, case-insensitively. `str` is accepted for `string`.
    pub fn from_name(name: &str) -> Option<DataType> {
        let lower = name.trim().to_ascii_lowercase();
        if lower == "str" {
            return Some(DataType::Str);
        }
        DataType::ALL.iter().copied().find(|dt| dt.name() == lower)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a name is not in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDataType(pub String);

impl fmt::Display for UnknownDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown data type '{}'", self.0)
    }
}

impl std::error::Error for UnknownDataType {}

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::from_name(s).ok_or_else(|| UnknownDataType(s.to_string()))
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
