//! Circulation metrics.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `library_checkouts_total{code}` - Checkout decisions by result code label
//! - `library_returns_total{result}` - Returns by result (`on_time`, `late`, `rejected`)
//! - `library_fines_cents_total` - Fines charged on return, in cents
//!
//! Runtime metrics (`store.commands.total`, `store.effects.executed{type}`,
//! `store.reducer.duration_seconds`) are recorded by the store itself.

use crate::error::ReturnError;
use crate::types::{CheckoutCode, Money};
use metrics::{describe_counter, describe_histogram};

/// Initialize and register all circulation metrics descriptions.
///
/// Call once at startup, before anything is recorded.
pub fn register_library_metrics() {
    describe_counter!(
        "library_checkouts_total",
        "Checkout decisions by result code (success, renewed, warnings, rejections)"
    );
    describe_counter!(
        "library_returns_total",
        "Book returns by result (on_time, late, rejected)"
    );
    describe_counter!(
        "library_fines_cents_total",
        "Total overdue fines charged on return, in cents"
    );

    describe_counter!("store.commands.total", "Actions sent to the store");
    describe_counter!("store.effects.executed", "Effects started by the store, by type");
    describe_histogram!(
        "store.reducer.duration_seconds",
        "Time spent inside the reducer per action"
    );

    tracing::info!("Library metrics registered");
}

/// Record a checkout decision.
pub fn record_checkout(code: CheckoutCode) {
    metrics::counter!("library_checkouts_total", "code" => code.label()).increment(1);
}

/// Record the result of a return.
pub fn record_return(result: &Result<Money, ReturnError>) {
    let label = match result {
        Ok(fine) if fine.is_zero() => "on_time",
        Ok(fine) => {
            metrics::counter!("library_fines_cents_total").increment(fine.cents());
            "late"
        }
        Err(_) => "rejected",
    };
    metrics::counter!("library_returns_total", "result" => label).increment(1);
}
