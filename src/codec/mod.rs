//! Typed codecs between host values and [`WireValue`] trees.
//!
//! Every API type implements [`WireType`]. Encoding and decoding both take a
//! [`CodecPath`] so a failure deep inside a record or map names the exact
//! position that was wrong (`user.create(args).other_config["k"]`).

use std::collections::HashMap;
use std::hash::Hash;

use thiserror::Error;

use crate::value::WireValue;

mod record;
mod reference;
mod time;

pub use record::{RecordReader, RecordWriter};
pub use reference::{Class, NULL_REF, Ref};
pub use time::{Timestamp, format_timestamp, parse_timestamp};

/// A located encoding or decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: expected {expected}, found {actual}{}", detail(.message))]
pub struct CodecError {
    /// Dotted trace to the offending position.
    pub path: String,
    /// The type the codec was working on.
    pub expected: &'static str,
    /// What was actually found (a wire shape, `missing`, or a host description).
    pub actual: String,
    /// Extra detail, possibly empty.
    pub message: String,
}

fn detail(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!(" ({message})")
    }
}

impl CodecError {
    pub(crate) fn new(
        path: &CodecPath,
        expected: &'static str,
        actual: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.as_str().to_string(),
            expected,
            actual: actual.into(),
            message: message.into(),
        }
    }

    pub(crate) fn shape(path: &CodecPath, expected: &'static str, found: &WireValue) -> Self {
        Self::new(path, expected, found.shape(), "")
    }
}

/// Position of a value inside a call, used to locate codec errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecPath(String);

impl CodecPath {
    /// A free-standing root, e.g. for ad-hoc decoding in tests.
    pub fn root(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Root for a positional argument: `method(label)`.
    pub fn argument(method: &str, label: &str) -> Self {
        Self(format!("{method}({label})"))
    }

    /// Root for a method result: `method -> result`.
    pub fn result(method: &str) -> Self {
        Self(format!("{method} -> result"))
    }

    /// A named record field below this position.
    pub fn field(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }

    /// A sequence element below this position.
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{index}]", self.0))
    }

    /// A map entry below this position.
    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{key:?}]", self.0))
    }

    /// Borrow the rendered path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for CodecPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A host type with a wire representation.
pub trait WireType: Sized {
    /// Name used in codec errors.
    const TYPE_NAME: &'static str;

    /// Encode `self` into a wire value.
    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError>;

    /// Decode a wire value, rejecting anything of the wrong shape.
    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError>;

    /// The API class named by this type, for reference types.
    fn reference_class() -> Option<&'static str> {
        None
    }
}

/// Types usable as map keys. XML-RPC struct member names are strings, so
/// keys convert to and from their string spelling.
pub trait WireKey: Sized + Eq + Hash {
    /// Render the key as a struct member name.
    fn to_key(&self) -> String;

    /// Parse a struct member name.
    fn from_key(key: &str, path: &CodecPath) -> Result<Self, CodecError>;
}

impl WireType for () {
    const TYPE_NAME: &'static str = "void";

    fn encode(&self, _path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(WireValue::void())
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        if value.is_void() {
            Ok(())
        } else {
            Err(CodecError::shape(path, Self::TYPE_NAME, value))
        }
    }
}

impl WireType for String {
    const TYPE_NAME: &'static str = "string";

    fn encode(&self, _path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(WireValue::String(self.clone()))
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        match value {
            WireValue::String(s) => Ok(s.clone()),
            other => Err(CodecError::shape(path, Self::TYPE_NAME, other)),
        }
    }
}

impl WireType for i64 {
    const TYPE_NAME: &'static str = "int";

    fn encode(&self, _path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(WireValue::Int(*self))
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        match value {
            WireValue::Int(v) => Ok(*v),
            // Older servers send 64-bit integers as decimal strings.
            WireValue::String(s) => s.trim().parse::<i64>().map_err(|_| {
                CodecError::new(path, Self::TYPE_NAME, "string", format!("not a decimal integer: {s:?}"))
            }),
            other => Err(CodecError::shape(path, Self::TYPE_NAME, other)),
        }
    }
}

impl WireType for f64 {
    const TYPE_NAME: &'static str = "float";

    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError> {
        if !self.is_finite() {
            return Err(CodecError::new(
                path,
                Self::TYPE_NAME,
                self.to_string(),
                "XML-RPC cannot carry non-finite doubles",
            ));
        }
        Ok(WireValue::Double(*self))
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let (shape, v) = match value {
            WireValue::Double(v) => ("double", *v),
            WireValue::Int(v) => return Ok(*v as f64),
            WireValue::String(s) => (
                "string",
                s.trim().parse::<f64>().map_err(|_| {
                    CodecError::new(path, Self::TYPE_NAME, "string", format!("not a float: {s:?}"))
                })?,
            ),
            other => return Err(CodecError::shape(path, Self::TYPE_NAME, other)),
        };
        if !v.is_finite() {
            return Err(CodecError::new(
                path,
                Self::TYPE_NAME,
                shape,
                format!("{v} is not a finite double"),
            ));
        }
        Ok(v)
    }
}

impl WireType for bool {
    const TYPE_NAME: &'static str = "bool";

    fn encode(&self, _path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(WireValue::Bool(*self))
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        match value {
            WireValue::Bool(v) => Ok(*v),
            other => Err(CodecError::shape(path, Self::TYPE_NAME, other)),
        }
    }
}

/// Opaque binary payload carried as `<base64>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blob(pub Vec<u8>);

impl WireType for Blob {
    const TYPE_NAME: &'static str = "base64";

    fn encode(&self, _path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(WireValue::Base64(self.0.clone()))
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        match value {
            WireValue::Base64(bytes) => Ok(Blob(bytes.clone())),
            other => Err(CodecError::shape(path, Self::TYPE_NAME, other)),
        }
    }
}

/// An untyped passthrough, for results whose schema type is "any".
impl WireType for WireValue {
    const TYPE_NAME: &'static str = "value";

    fn encode(&self, _path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(self.clone())
    }

    fn decode(value: &WireValue, _path: &CodecPath) -> Result<Self, CodecError> {
        Ok(value.clone())
    }
}

impl<T: WireType> WireType for Vec<T> {
    const TYPE_NAME: &'static str = "array";

    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError> {
        self.iter()
            .enumerate()
            .map(|(i, item)| item.encode(&path.index(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(WireValue::Array)
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        match value {
            WireValue::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| T::decode(item, &path.index(i)))
                .collect(),
            other => Err(CodecError::shape(path, Self::TYPE_NAME, other)),
        }
    }
}

impl<K: WireKey, V: WireType> WireType for HashMap<K, V> {
    const TYPE_NAME: &'static str = "map";

    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError> {
        let mut members = Vec::with_capacity(self.len());
        for (key, value) in self {
            let name = key.to_key();
            let encoded = value.encode(&path.key(&name))?;
            members.push((name, encoded));
        }
        Ok(WireValue::Struct(members))
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let WireValue::Struct(members) = value else {
            return Err(CodecError::shape(path, Self::TYPE_NAME, value));
        };
        let mut out = HashMap::with_capacity(members.len());
        for (name, member) in members {
            let entry_path = path.key(name);
            let key = K::from_key(name, &entry_path)?;
            let decoded = V::decode(member, &entry_path)?;
            out.insert(key, decoded);
        }
        Ok(out)
    }
}

impl WireKey for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str, _path: &CodecPath) -> Result<Self, CodecError> {
        Ok(key.to_string())
    }
}

impl WireKey for i64 {
    fn to_key(&self) -> String {
        self.to_string()
    }

    fn from_key(key: &str, path: &CodecPath) -> Result<Self, CodecError> {
        key.parse().map_err(|_| {
            CodecError::new(path, "int", "string", format!("map key is not an integer: {key:?}"))
        })
    }
}

/// Declare a closed XenAPI enumeration with its wire literals.
///
/// The generated type implements [`WireType`] and [`WireKey`]; unknown
/// literals decode to a [`CodecError`].
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $lit:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every variant, in schema order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            /// The wire literal for this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $lit, )+
                }
            }

            /// Look up a variant by its wire literal.
            pub fn from_wire(literal: &str) -> Option<Self> {
                match literal {
                    $( $lit => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $crate::codec::WireType for $name {
            const TYPE_NAME: &'static str = stringify!($name);

            fn encode(
                &self,
                _path: &$crate::codec::CodecPath,
            ) -> Result<$crate::value::WireValue, $crate::codec::CodecError> {
                Ok($crate::value::WireValue::String(self.as_str().to_string()))
            }

            fn decode(
                value: &$crate::value::WireValue,
                path: &$crate::codec::CodecPath,
            ) -> Result<Self, $crate::codec::CodecError> {
                match value {
                    $crate::value::WireValue::String(s) => {
                        <Self as $crate::codec::WireKey>::from_key(s, path)
                    }
                    other => Err($crate::codec::CodecError::shape(
                        path,
                        stringify!($name),
                        other,
                    )),
                }
            }
        }

        impl $crate::codec::WireKey for $name {
            fn to_key(&self) -> String {
                self.as_str().to_string()
            }

            fn from_key(
                key: &str,
                path: &$crate::codec::CodecPath,
            ) -> Result<Self, $crate::codec::CodecError> {
                Self::from_wire(key).ok_or_else(|| {
                    $crate::codec::CodecError::new(
                        path,
                        stringify!($name),
                        "string",
                        format!("unknown literal {key:?}"),
                    )
                })
            }
        }
    };
}

pub(crate) use wire_enum;
