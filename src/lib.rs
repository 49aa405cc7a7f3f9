//! jsonscope: terminal browser for colorized, searchable JSON files.

pub mod catalog;
mod cli;
pub mod colorize;
pub mod colors;
pub mod document;
pub mod error;
pub mod logging;
pub mod markup;
pub mod search;
pub mod tui;

pub use cli::{run, DynError};
