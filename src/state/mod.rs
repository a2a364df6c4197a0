//! State management module
//!
//! Application context and short-lived per-user session state

pub mod context;
pub mod storage;

pub use context::{AppContext, AwaitingReply, SessionContext};
pub use storage::{InMemorySessionStore, SessionStore, StateStorage};
