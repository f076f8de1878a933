//! Deterministic, pure logic shared by the filter.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod gres;
pub mod kvlist;
pub mod options;
pub mod partition;
pub mod tokenize;
pub mod types;
pub mod units;
