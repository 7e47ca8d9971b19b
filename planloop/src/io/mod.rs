//! Side-effectful boundary: subprocesses, the filesystem, and the oracle.
//!
//! Everything in here is kept behind small typed surfaces so the pure logic
//! in [`crate::core`] can be driven by fakes in tests.

pub mod config;
pub mod oracle;
pub mod process;
pub mod prompt;
pub mod run_dir;
pub mod tools;
