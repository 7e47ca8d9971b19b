//! Pure, deterministic lifecycle logic.
//!
//! Nothing in this tree performs I/O. Given the same oracle text, registry,
//! and limits, every function here produces the same output.

pub mod decision;
pub mod extract;
pub mod plan;
pub mod reflector;
pub mod run_log;
pub mod simulator;
pub mod types;
pub mod validator;
