//! Reserved identifiers and engine-wide tuning values.
//!
//! Game-specific numbers (rewards, penalties, message thresholds) live in
//! the game definitions; only values the engine itself depends on belong
//! here.

// Reserved identifiers -----------------------------------------------------
pub const UNSORTED_ZONE_ID: &str = "unsorted";
pub const UNSORTED_ZONE_LABEL: &str = "Unsorted";

// Logging ------------------------------------------------------------------
pub(crate) const LOG_TARGET_SESSION: &str = "drillkit::session";
pub(crate) const LOG_TARGET_SCORING: &str = "drillkit::scoring";

// Session tuning -----------------------------------------------------------
/// Upper bound on intents pulled from a source in one `drive` call.
pub const DEFAULT_DRIVE_STEP_LIMIT: usize = 512;
/// Percentages are reported on a 0..=100 scale.
pub(crate) const PERCENT_SCALE: i64 = 100;
