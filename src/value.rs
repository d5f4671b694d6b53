use core::fmt;

/// A dynamically-typed XML-RPC value as it travels on the wire.
///
/// `Struct` keeps its members in wire order; duplicate names are preserved
/// as received and resolved by the typed codecs (last one wins).
#[derive(Clone, PartialEq)]
pub enum WireValue {
    /// `<nil/>`.
    Nil,
    /// `<i4>`, `<int>` or `<i8>`.
    Int(i64),
    /// `<double>`.
    Double(f64),
    /// `<boolean>`.
    Bool(bool),
    /// `<string>` or an untyped `<value>`.
    String(String),
    /// `<dateTime.iso8601>`; the lexical form is kept verbatim.
    DateTime(String),
    /// `<base64>`, already decoded.
    Base64(Vec<u8>),
    /// `<array>`.
    Array(Vec<WireValue>),
    /// `<struct>`.
    Struct(Vec<(String, WireValue)>),
}

impl WireValue {
    /// The value XenAPI returns for `void` methods: an empty string.
    pub fn void() -> Self {
        WireValue::String(String::new())
    }

    /// Short name of the wire shape, used in codec errors.
    pub fn shape(&self) -> &'static str {
        match self {
            WireValue::Nil => "nil",
            WireValue::Int(_) => "int",
            WireValue::Double(_) => "double",
            WireValue::Bool(_) => "boolean",
            WireValue::String(_) => "string",
            WireValue::DateTime(_) => "dateTime.iso8601",
            WireValue::Base64(_) => "base64",
            WireValue::Array(_) => "array",
            WireValue::Struct(_) => "struct",
        }
    }

    /// Borrow the contents of a `String` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a struct member by name (last occurrence wins).
    pub fn member(&self, name: &str) -> Option<&WireValue> {
        match self {
            WireValue::Struct(members) => members
                .iter()
                .rev()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// True for the empty string and for `nil`.
    pub fn is_void(&self) -> bool {
        matches!(self, WireValue::Nil) || matches!(self, WireValue::String(s) if s.is_empty())
    }
}

impl fmt::Debug for WireValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireValue::Nil => f.write_str("Nil"),
            WireValue::Int(v) => write!(f, "Int({v})"),
            WireValue::Double(v) => write!(f, "Double({v})"),
            WireValue::Bool(v) => write!(f, "Bool({v})"),
            WireValue::String(v) => write!(f, "String({v:?})"),
            WireValue::DateTime(v) => write!(f, "DateTime({v})"),
            WireValue::Base64(v) => write!(f, "Base64(len={})", v.len()),
            WireValue::Array(items) => f.debug_list().entries(items).finish(),
            WireValue::Struct(members) => f
                .debug_map()
                .entries(members.iter().map(|(k, v)| (k, v)))
                .finish(),
        }
    }
}

impl From<&str> for WireValue {
    fn from(value: &str) -> Self {
        WireValue::String(value.to_string())
    }
}

impl From<String> for WireValue {
    fn from(value: String) -> Self {
        WireValue::String(value)
    }
}

impl From<i64> for WireValue {
    fn from(value: i64) -> Self {
        WireValue::Int(value)
    }
}

impl From<bool> for WireValue {
    fn from(value: bool) -> Self {
        WireValue::Bool(value)
    }
}
