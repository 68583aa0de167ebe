//! Hook trace analytics CLI library.
//!
//! This crate provides the `ht` command-line interface over the derivations in
//! `ht-core` and the `SQLite` store in `ht-db`.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
