use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

use crate::codec::{CodecError, CodecPath, WireType};
use crate::value::WireValue;

/// Date-times on this API are whole seconds in UTC.
pub type Timestamp = DateTime<Utc>;

const COMPACT_LEN: usize = "YYYYMMDDTHH:MM:SSZ".len();
const DASHED_LEN: usize = "YYYY-MM-DDTHH:MM:SSZ".len();

/// Render a timestamp in the canonical `YYYYMMDDTHH:MM:SSZ` shape.
///
/// Sub-second precision is dropped; the wire cannot carry it.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format("%Y%m%dT%H:%M:%SZ").to_string()
}

/// Parse either `YYYYMMDDTHH:MM:SSZ` or `YYYY-MM-DDTHH:MM:SSZ`.
///
/// Any other shape (fractional seconds, offsets, missing `Z`) is rejected.
pub fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let bytes = text.as_bytes();
    let (date, rest) = match bytes.len() {
        COMPACT_LEN => {
            let (date, rest) = bytes.split_at(8);
            (
                [digits(&date[0..4])?, digits(&date[4..6])?, digits(&date[6..8])?],
                rest,
            )
        }
        DASHED_LEN => {
            let (date, rest) = bytes.split_at(10);
            if date[4] != b'-' || date[7] != b'-' {
                return None;
            }
            (
                [digits(&date[0..4])?, digits(&date[5..7])?, digits(&date[8..10])?],
                rest,
            )
        }
        _ => return None,
    };

    // rest is "THH:MM:SSZ"
    if rest.len() != 10 || rest[0] != b'T' || rest[3] != b':' || rest[6] != b':' || rest[9] != b'Z'
    {
        return None;
    }
    let hour = digits(&rest[1..3])?;
    let minute = digits(&rest[4..6])?;
    let second = digits(&rest[7..9])?;

    let naive = NaiveDate::from_ymd_opt(date[0] as i32, date[1], date[2])?
        .and_hms_opt(hour, minute, second)?;
    Some(naive.and_utc())
}

fn digits(field: &[u8]) -> Option<u32> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    field
        .iter()
        .try_fold(0u32, |acc, b| acc.checked_mul(10)?.checked_add(u32::from(b - b'0')))
}

impl WireType for Timestamp {
    const TYPE_NAME: &'static str = "datetime";

    fn encode(&self, path: &CodecPath) -> Result<WireValue, CodecError> {
        if !(0..=9999).contains(&self.year()) {
            return Err(CodecError::new(
                path,
                Self::TYPE_NAME,
                "datetime",
                format!("year {} does not fit YYYYMMDDTHH:MM:SSZ", self.year()),
            ));
        }
        let whole = self.with_nanosecond(0).unwrap_or(*self);
        Ok(WireValue::DateTime(format_timestamp(&whole)))
    }

    fn decode(value: &WireValue, path: &CodecPath) -> Result<Self, CodecError> {
        let (shape, text) = match value {
            WireValue::DateTime(text) => ("dateTime.iso8601", text),
            WireValue::String(text) => ("string", text),
            other => return Err(CodecError::shape(path, Self::TYPE_NAME, other)),
        };
        parse_timestamp(text).ok_or_else(|| {
            CodecError::new(
                path,
                Self::TYPE_NAME,
                shape,
                format!("{text:?} is not of the form YYYYMMDDTHH:MM:SSZ"),
            )
        })
    }
}
