//! Shared primitive types used across the entire simulation.

/// Working days in a simulated week (Mon..Fri).
pub const DAYS_IN_WORK_WEEK: usize = 5;

/// Attendance buckets: 0 through 5 days attended.
pub const ATTENDANCE_BUCKETS: usize = DAYS_IN_WORK_WEEK + 1;

/// Short labels for the working days, indexed Mon..Fri.
pub const WEEKDAY_NAMES: [&str; DAYS_IN_WORK_WEEK] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

/// Key into the policy table, e.g. "6) Exactly 3 days/week".
pub type ScenarioName = String;

/// The canonical run identifier.
pub type RunId = String;

/// Round to two decimal places for presentation.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
