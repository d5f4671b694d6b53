use crate::codec::{CodecError, CodecPath, WireType};
use crate::value::WireValue;

/// Field-by-field reader over a wire `struct`.
///
/// Keys the record does not ask for are ignored, so newer servers can add
/// fields without breaking older clients.
pub struct RecordReader<'a> {
    members: &'a [(String, WireValue)],
    path: &'a CodecPath,
}

impl<'a> RecordReader<'a> {
    /// Start reading `value` as a record of type `record`.
    pub fn new(
        value: &'a WireValue,
        path: &'a CodecPath,
        record: &'static str,
    ) -> Result<Self, CodecError> {
        match value {
            WireValue::Struct(members) => Ok(Self { members, path }),
            other => Err(CodecError::shape(path, record, other)),
        }
    }

    fn lookup(&self, key: &str) -> Option<&'a WireValue> {
        self.members
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }

    /// Decode a field that must be present.
    pub fn required<T: WireType>(&self, key: &str) -> Result<T, CodecError> {
        let path = self.path.field(key);
        match self.lookup(key) {
            Some(value) => T::decode(value, &path),
            None => Err(CodecError::new(&path, T::TYPE_NAME, "missing", "required field")),
        }
    }

    /// Decode a field that older servers may omit.
    pub fn optional<T: WireType>(&self, key: &str) -> Result<Option<T>, CodecError> {
        self.lookup(key)
            .map(|value| T::decode(value, &self.path.field(key)))
            .transpose()
    }

    /// Decode a field that older servers may omit, falling back to `T::default()`.
    pub fn or_default<T: WireType + Default>(&self, key: &str) -> Result<T, CodecError> {
        Ok(self.optional(key)?.unwrap_or_default())
    }
}

/// Builder for a wire `struct`, preserving field order.
pub struct RecordWriter<'a> {
    members: Vec<(String, WireValue)>,
    path: &'a CodecPath,
}

impl<'a> RecordWriter<'a> {
    /// Start a record at `path`.
    pub fn new(path: &'a CodecPath) -> Self {
        Self {
            members: Vec::new(),
            path,
        }
    }

    /// Append one field.
    pub fn field<T: WireType>(mut self, key: &str, value: &T) -> Result<Self, CodecError> {
        let encoded = value.encode(&self.path.field(key))?;
        self.members.push((key.to_string(), encoded));
        Ok(self)
    }

    /// Finish the record.
    pub fn finish(self) -> WireValue {
        WireValue::Struct(self.members)
    }
}
