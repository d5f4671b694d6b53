//! Waiting on server-side tasks.
//!
//! The `Async.` form of a call returns a task reference immediately. These
//! helpers turn the generic `task.*` primitives into a typed result; the
//! polling loops themselves live on the blocking and async sessions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::api::enums::TaskStatusType;
use crate::api::task::TaskRef;
use crate::codec::{CodecError, CodecPath, WireType};
use crate::value::WireValue;
use crate::xmlrpc;

/// How often to poll a task and for how long.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second status check.
    pub initial_interval: Duration,
    /// Upper bound for the delay between checks.
    pub max_interval: Duration,
    /// Multiplier applied to the delay after each check.
    pub backoff_factor: f64,
    /// Give up after this long. `None` waits indefinitely.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(5),
            backoff_factor: 2.0,
            deadline: None,
        }
    }
}

impl PollPolicy {
    /// A fixed-interval policy.
    pub fn fixed(interval: Duration) -> Self {
        Self {
            initial_interval: interval,
            max_interval: interval,
            backoff_factor: 1.0,
            deadline: None,
        }
    }

    /// Give up after `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Delay schedule for one wait.
#[derive(Debug)]
pub(crate) struct Poller {
    policy: PollPolicy,
    started: Instant,
    next: Duration,
}

impl Poller {
    pub(crate) fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            started: Instant::now(),
            next: policy.initial_interval,
        }
    }

    /// The delay before the next check, or `None` once the deadline passed.
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        let mut delay = self.next;
        if let Some(deadline) = self.policy.deadline {
            let remaining = deadline.checked_sub(self.started.elapsed())?;
            if remaining.is_zero() {
                return None;
            }
            delay = delay.min(remaining);
        }

        let factor = if self.policy.backoff_factor.is_finite() && self.policy.backoff_factor >= 1.0 {
            self.policy.backoff_factor
        } else {
            1.0
        };
        let cap = self.policy.max_interval.max(self.policy.initial_interval);
        self.next = Duration::try_from_secs_f64(self.next.as_secs_f64() * factor)
            .unwrap_or(cap)
            .min(cap);
        Some(delay)
    }
}

/// Lets another thread or task stop a local wait.
///
/// Cancelling only stops the waiter; the server task keeps running unless
/// `task.cancel` is called as well.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not yet raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag was raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to do after reading a task's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NextStep {
    Wait,
    FetchResult,
    FetchErrorInfo,
    Cancelled,
}

pub(crate) fn next_step(status: TaskStatusType) -> NextStep {
    match status {
        TaskStatusType::Pending | TaskStatusType::Cancelling => NextStep::Wait,
        TaskStatusType::Success => NextStep::FetchResult,
        TaskStatusType::Failure => NextStep::FetchErrorInfo,
        TaskStatusType::Cancelled => NextStep::Cancelled,
    }
}

const RESULT_PATH: &str = "task.get_result";

/// Parse the `result` field of a finished task.
///
/// The server stores the XML-RPC `<value>` of the originating call's result
/// as text; an empty string is a void result.
pub fn parse_task_result(raw: &str) -> Result<WireValue, CodecError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(WireValue::void());
    }
    if !trimmed.starts_with('<') {
        return Ok(WireValue::String(raw.to_string()));
    }
    xmlrpc::parse_value_fragment(trimmed).map_err(|e| {
        CodecError::new(
            &CodecPath::result(RESULT_PATH),
            "value",
            "string",
            format!("task result is not an XML-RPC value: {}", e.message),
        )
    })
}

/// Decode a finished task's result as the originating method's return type.
///
/// `result_type` is the task's `type` field; for reference results it must
/// name the class `T` refers to.
pub(crate) fn decode_task_result<T: WireType>(
    task: &TaskRef,
    result_type: Option<&str>,
    raw: &str,
) -> Result<T, CodecError> {
    let path = CodecPath::result(RESULT_PATH);
    if let (Some(expected), Some(actual)) = (T::reference_class(), result_type) {
        let actual = actual.trim();
        if !is_untyped(actual) && !actual.eq_ignore_ascii_case(expected) {
            return Err(CodecError::new(
                &path,
                T::TYPE_NAME,
                actual.to_string(),
                format!("task {task} produced a {actual} reference, not {expected}"),
            ));
        }
    }
    let value = parse_task_result(raw)?;
    T::decode(&value, &path)
}

fn is_untyped(result_type: &str) -> bool {
    result_type.is_empty() || result_type == "<none/>"
}
