//! Stable exit codes for planloop CLI commands.

/// Command succeeded; for `planloop run`, the goal was reached.
pub const OK: i32 = 0;
/// Command failed due to invalid input/config or an internal error.
pub const INVALID: i32 = 1;
/// `planloop run` reached the attempt cap without success.
pub const EXHAUSTED: i32 = 2;
/// `planloop run` stopped because the oracle returned unusable output on
/// consecutive attempts.
pub const PLANNER_UNUSABLE: i32 = 3;
