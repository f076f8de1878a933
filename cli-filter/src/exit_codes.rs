//! Status codes returned to the scheduler by the submission hooks.

/// Submission may proceed.
pub const SUCCESS: i32 = 0;
/// Submission is refused, or the filter itself failed.
pub const ERROR: i32 = 1;
