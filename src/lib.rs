//! websearch library
//!
//! Declarative, pushdown-aware search over the Google Programmable Search JSON API.
//! The `websearch` binary is a thin host over [`search::SearchEngine`].

pub mod cli;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod search;
