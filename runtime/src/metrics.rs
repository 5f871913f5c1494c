//! Metric names recorded by the Store.
//!
//! The runtime only records through the `metrics` facade. Installing an
//! exporter is left to the binary; without one every call is a no-op.

use metrics::{Unit, describe_counter, describe_histogram};

/// Actions processed by `Store::send`
pub const COMMANDS_TOTAL: &str = "store.commands.total";

/// Actions rejected because the store is shutting down
pub const REJECTED_ACTIONS: &str = "store.shutdown.rejected_actions";

/// Time spent inside the reducer per action
pub const REDUCER_DURATION: &str = "store.reducer.duration_seconds";

/// Effects returned per action
pub const EFFECTS_COUNT: &str = "store.effects.count";

/// Effects executed, labelled by `type`
pub const EFFECTS_EXECUTED: &str = "store.effects.executed";

/// Register descriptions for every Store metric with the installed recorder.
///
/// Call once after installing an exporter.
pub fn describe_store_metrics() {
    describe_counter!(COMMANDS_TOTAL, Unit::Count, "Actions processed by the store");
    describe_counter!(
        REJECTED_ACTIONS,
        Unit::Count,
        "Actions rejected during shutdown"
    );
    describe_histogram!(
        REDUCER_DURATION,
        Unit::Seconds,
        "Reducer execution time per action"
    );
    describe_histogram!(EFFECTS_COUNT, Unit::Count, "Effects returned per action");
    describe_counter!(
        EFFECTS_EXECUTED,
        Unit::Count,
        "Effects executed, by effect type"
    );
}
