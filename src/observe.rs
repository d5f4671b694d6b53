use std::time::Duration;

use crate::error::Error;

pub(crate) fn record_ok(mode: &'static str, method: &str, elapsed: Duration) {
    let _ = (mode, method, elapsed);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("xenapi_calls_total", "mode" => mode, "outcome" => "ok").increment(1);
        metrics::histogram!("xenapi_call_seconds", "mode" => mode).record(elapsed.as_secs_f64());
    }

    #[cfg(feature = "tracing")]
    {
        tracing::debug!(
            mode,
            method,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "xenapi call ok"
        );
    }
}

pub(crate) fn record_err(mode: &'static str, method: &str, elapsed: Duration, err: &Error) {
    let _ = (mode, method, elapsed, err);

    #[cfg(feature = "metrics")]
    {
        metrics::counter!("xenapi_calls_total", "mode" => mode, "outcome" => "err").increment(1);
        metrics::counter!(
            "xenapi_call_errors_total",
            "mode" => mode,
            "kind" => err.kind()
        )
        .increment(1);
        metrics::histogram!("xenapi_call_seconds", "mode" => mode).record(elapsed.as_secs_f64());
    }

    #[cfg(feature = "tracing")]
    {
        tracing::warn!(
            mode,
            method,
            kind = err.kind(),
            error = %err,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "xenapi call failed"
        );
    }
}

/// A pool redirect was followed.
pub(crate) fn record_redirect(method: &str, location: &str) {
    let _ = (method, location);

    #[cfg(feature = "metrics")]
    metrics::counter!("xenapi_redirects_total").increment(1);

    #[cfg(feature = "tracing")]
    tracing::info!(method, location, "following pool redirect");
}
