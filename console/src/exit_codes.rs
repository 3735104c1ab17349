//! Stable exit codes for console CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config, unreadable store, or any other error.
pub const INVALID: i32 = 1;
/// `console contact` or `console uplink` found the submission lock active.
pub const LOCKED: i32 = 2;
/// `console contact` could not deliver the message.
pub const UNDELIVERED: i32 = 3;
