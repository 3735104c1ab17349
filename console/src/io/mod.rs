//! Side-effecting collaborators: storage backends, clocks, config, hosts.

pub mod backend;
pub mod clock;
pub mod config;
pub mod host;
pub mod outbox;
pub mod terminal;
