#![doc = "Common types shared across the miniplc0 compiler workspace."]

pub mod config;
pub mod error;
pub mod span;

pub use config::*;
pub use error::*;
pub use span::*;
