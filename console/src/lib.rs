//! Terminal-style console for a personal site.
//!
//! The crate keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (parsing, history, calc,
//!   reconciliation, ticking tasks, the runner mini-game). No I/O.
//! - **[`io`]**: Side-effecting collaborators (storage backends, clocks,
//!   config files, hosts that render the shell).
//!
//! [`store`] replicates small keys across every backend with read-repair,
//! [`shell`] is the interactive session, and [`visitor`] / [`contact`]
//! build the page's boot check and gated contact form on top of the store.

pub mod contact;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod shell;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod visitor;
