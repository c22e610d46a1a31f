//! `lectio-tracking` — analysis job lifecycle tracking.
//!
//! Server-side analysis jobs run for a while; the dashboard learns about
//! completion by polling their status. [`PollRegistry`] owns that polling:
//! at most one live poll per job id, a fixed tick cadence, exactly-once
//! delivery of the terminal report, and guaranteed cancellation on explicit
//! stop, on bulk teardown, and on drop.

pub mod registry;

pub use registry::{PollConfig, PollError, PollOutcome, PollRegistry, DEFAULT_POLL_INTERVAL};
