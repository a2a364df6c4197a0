//! Bot handlers module
//!
//! - Command handlers for /start, /help and /agenda
//! - Message handlers for option replies and structured actions
//! - The closed action set the extraction layer may send

pub mod actions;
pub mod commands;
pub mod messages;

pub use actions::{dispatch, handle_option, handle_text, Action};
pub use commands::{handle_command, Command};
pub use messages::handle_message;
