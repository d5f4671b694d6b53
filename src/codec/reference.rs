use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use crate::codec::{CodecError, CodecPath, WireKey, WireType};
use crate::value::WireValue;

/// The literal the server uses for "no such object".
pub const NULL_REF: &str = "OpaqueRef:NULL";

/// An API object class, used to tag references at the type level.
pub trait Class: 'static {
    /// The class name as it appears in wire method names (`SDN_controller`).
    const NAME: &'static str;
}

/// A reference to a server-side object of class `C`.
///
/// References to different classes are distinct types even though both are
/// plain strings on the wire. Equality is string equality.
pub struct Ref<C: Class> {
    raw: String,
    _class: PhantomData<fn() -> C>,
}

impl<C: Class> Ref<C> {
    /// Wrap a raw reference string without validation.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            _class: PhantomData,
        }
    }

    /// Wrap a raw reference, returning `None` for the null sentinel or an
    /// empty string.
    pub fn parse(raw: &str) -> Option<Self> {
        if is_null(raw) {
            None
        } else {
            Some(Self::new(raw))
        }
    }

    /// The opaque reference string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Consume the reference and return its string.
    pub fn into_string(self) -> String {
        self.raw
    }
}

fn is_null(raw: &str) -> bool {
    raw.is_empty() || raw == NULL_REF
}

fn validate<C: Class>(raw: &str, path: &CodecPath) -> Result<(), CodecError> {
    if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CodecError::new(
            path,
            "reference",
            "string",
            format!("malformed {} reference {raw:?}", C::NAME),
        ));
    }
    Ok(())
}

impl<C: Class> Clone for Ref<C> {
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<C: Class> PartialEq for Ref<C> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<C: Class> Eq for Ref<C> {}

impl<C: Class> Hash for Ref<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<C: Class> fmt::Debug for Ref<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref<{}>({})", C::NAME, self.raw)
    }
}

impl<C: Class> fmt::Display for Ref<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<C: Class> WireType for Ref<C> {
    const TYPE_NAME: &'static str = "reference";

    fn encode(&self, _path: &CodecPath) -> Result<WireValue, CodecError> {
        Ok(WireValue::String(self.raw.clone()))
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let WireValue::String(raw) = value else {
            return Err(CodecError::shape(path, Self::TYPE_NAME, value));
        };
        if is_null(raw) {
            return Err(CodecError::new(
                path,
                Self::TYPE_NAME,
                "null reference",
                format!("a {} reference is required here", C::NAME),
            ));
        }
        validate::<C>(raw, path)?;
        Ok(Self::new(raw.as_str()))
    }

    fn reference_class() -> Option<&'static str> {
        Some(C::NAME)
    }
}

/// Optional references map `None` to the null sentinel.
impl<C: Class> WireType for Option<Ref<C>> {
    const TYPE_NAME: &'static str = "reference";

    fn encode(&self, _path: &CodecPath) -> Result<WireValue, CodecError> {
        let raw = self.as_ref().map_or(NULL_REF, |r| r.as_str());
        Ok(WireValue::String(raw.to_string()))
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let WireValue::String(raw) = value else {
            return Err(CodecError::shape(path, Self::TYPE_NAME, value));
        };
        if is_null(raw) {
            return Ok(None);
        }
        validate::<C>(raw, path)?;
        Ok(Some(Ref::new(raw.as_str())))
    }

    fn reference_class() -> Option<&'static str> {
        Some(C::NAME)
    }
}

impl<C: Class> WireKey for Ref<C> {
    fn to_key(&self) -> String {
        self.raw.clone()
    }

    fn from_key(key: &str, path: &CodecPath) -> Result<Self, CodecError> {
        Self::decode(&WireValue::String(key.to_string()), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;
    impl Class for Widget {
        const NAME: &'static str = "widget";
    }

    type WidgetRef = Ref<Widget>;

    #[test]
    fn null_sentinel_is_absence() {
        let path = CodecPath::root("w");
        let null = WireValue::from(NULL_REF);

        assert!(WidgetRef::decode(&null, &path).is_err());
        assert!(WidgetRef::decode(&WireValue::from(""), &path).is_err());
        assert_eq!(Option::<WidgetRef>::decode(&null, &path), Ok(None));
        assert_eq!(None::<WidgetRef>.encode(&path), Ok(null));
        assert!(WidgetRef::parse(NULL_REF).is_none());
    }

    #[test]
    fn references_round_trip_and_compare_by_string() {
        let path = CodecPath::root("w");
        let r = WidgetRef::new("OpaqueRef:1234");
        let wire = r.encode(&path).expect("encode");
        assert_eq!(WidgetRef::decode(&wire, &path), Ok(r.clone()));
        assert_eq!(r, WidgetRef::new("OpaqueRef:1234"));
        assert_eq!(WidgetRef::reference_class(), Some("widget"));
    }

    #[test]
    fn malformed_reference_is_rejected() {
        let path = CodecPath::root("w");
        let err = WidgetRef::decode(&WireValue::from("OpaqueRef: 12"), &path).expect_err("space");
        assert!(err.message.contains("widget"));
    }
}
