//! Deterministic, pure logic shared by the console.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod calc;
pub mod command;
pub mod game;
pub mod history;
pub mod parse;
pub mod reconcile;
pub mod theme;
pub mod ticking;
pub mod types;
