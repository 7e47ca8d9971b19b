//! Feedback-driven plan lifecycle engine.
//!
//! This crate turns a goal into validated, executed tool invocations through a
//! closed loop: an external oracle proposes a plan, the engine validates it
//! against the tool registry, simulates and executes what passes, and reflects
//! the outcome into feedback that shapes the next proposal. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (payload extraction, validation,
//!   simulation, decision rules). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (subprocess oracles and tools,
//!   configuration, attempt artifacts). Isolated to enable scripted fakes in
//!   tests.
//!
//! Orchestration modules ([`execute`], [`attempt`], [`lifecycle`]) coordinate
//! core logic with I/O to implement the replanning loop behind the CLI.

pub mod attempt;
pub mod core;
pub mod execute;
pub mod exit_codes;
pub mod io;
pub mod lifecycle;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tool;
