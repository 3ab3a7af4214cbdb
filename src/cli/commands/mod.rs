//! CLI command handlers

mod mark_breached;

pub use mark_breached::cmd_mark_breached;
