//! CLI subcommands

pub mod apps;
pub mod search;
pub mod settings;
pub mod snapshot;
pub mod watch;
