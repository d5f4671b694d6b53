use crate::value::WireValue;

/// Argument labels whose values never appear in dumps.
const SECRET_LABELS: &[&str] = &["pwd", "old_pwd", "new_pwd"];

pub(crate) fn enabled() -> bool {
    std::env::var("XENAPI_DEBUG")
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

pub(crate) fn is_secret(label: &str) -> bool {
    SECRET_LABELS.contains(&label)
}

/// Copy of `params` with password arguments blanked.
pub(crate) fn redact(labels: &[&'static str], params: &[WireValue]) -> Vec<WireValue> {
    labels
        .iter()
        .zip(params)
        .map(|(label, value)| {
            if is_secret(label) {
                WireValue::from("<redacted>")
            } else {
                value.clone()
            }
        })
        .collect()
}

pub(crate) fn dump_xml(label: &str, method: &str, body: &[u8]) {
    if !enabled() {
        return;
    }
    let text = String::from_utf8_lossy(body);
    let out = format!("{label} {method} ({} bytes):\n{}", body.len(), text.trim_end());

    #[cfg(feature = "tracing")]
    tracing::trace!("{out}");

    #[cfg(not(feature = "tracing"))]
    eprintln!("{out}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passwords_are_blanked() {
        let labels = ["uname", "pwd", "version", "originator"];
        let params = vec![
            WireValue::from("root"),
            WireValue::from("hunter2"),
            WireValue::from("1.0"),
            WireValue::from("xenapi-rs"),
        ];
        let shown = redact(&labels, &params);
        assert_eq!(shown[0], WireValue::from("root"));
        assert_eq!(shown[1], WireValue::from("<redacted>"));
        assert_eq!(shown[3], WireValue::from("xenapi-rs"));
    }
}
