//! Developer logging ("level 6") for per-operation bench lines.
//!
//! Lines go to the `pagelite::dev6` log target at TRACE and, when a test has
//! enabled it, into a thread-local sink so assertions don't race on the
//! global logger.

use std::cell::RefCell;

thread_local! {
    static TL_SINK: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Disables the thread-local sink on drop.
pub struct DevSinkGuard;
impl Drop for DevSinkGuard {
    fn drop(&mut self) {
        TL_SINK.with(|s| *s.borrow_mut() = None);
    }
}

pub fn enable_thread_sink() -> DevSinkGuard {
    TL_SINK.with(|s| *s.borrow_mut() = Some(Vec::new()));
    DevSinkGuard
}

pub fn write_str(msg: &str) {
    TL_SINK.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(msg.to_owned());
        }
    });
}

/// Drain the captured lines for the current thread. Empty if the sink is off.
pub fn drain() -> Vec<String> {
    TL_SINK.with(|s| match s.borrow_mut().as_mut() {
        Some(buf) => std::mem::take(buf),
        None => Vec::new(),
    })
}

/// One JSON bench line: `{"bench":"page","op":..,"source":..,"duration_ms":..,"result_count":..}`.
#[must_use]
pub fn bench_line(op: &str, source: &str, duration_ms: u64, result_count: u64) -> String {
    serde_json::json!({
        "bench": "page",
        "op": op,
        "source": source,
        "duration_ms": duration_ms,
        "result_count": result_count,
    })
    .to_string()
}

#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        $crate::utils::devlog::write_str(&__s);
        log::log!(target: "pagelite::dev6", log::Level::Trace, "{}", __s);
    }};
}
