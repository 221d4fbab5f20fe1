//! Guarded calls into instrumentation sinks
//!
//! Hooks are observational. A panicking hook is logged and ignored; a hook
//! running past the budget is logged but still allowed to finish.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::warn;

/// Run one instrumentation hook, containing panics and timing it.
pub(crate) fn observe(budget: Duration, hook: &'static str, call: impl FnOnce()) {
    let started = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(call));
    let elapsed = started.elapsed();

    if outcome.is_err() {
        warn!(hook, "Instrumentation hook panicked");
    }
    if elapsed > budget {
        warn!(
            hook,
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = budget.as_millis() as u64,
            "Instrumentation hook exceeded its budget"
        );
    }
}
