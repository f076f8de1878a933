//! Submission-time resource policy for a batch scheduler's command-line filter.
//!
//! Given a user's submission options and the cluster's partition state, the
//! filter fills in unset resource options with partition-derived defaults and
//! rejects option combinations a partition's accounting rules do not allow.
//! The architecture keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (tokenizing, key/value lists, sizes,
//!   report parsing). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config files, environment, query
//!   processes). Isolated behind traits so tests can substitute fakes.
//!
//! Orchestration modules ([`cluster`], [`policy`], [`hooks`]) combine the two to
//! implement the scheduler's submission hooks.

pub mod cluster;
pub mod core;
pub mod exit_codes;
pub mod hooks;
pub mod io;
pub mod logging;
pub mod policy;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
