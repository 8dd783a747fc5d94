pub mod config;
pub mod conversation;
pub mod error;
pub mod message;
pub mod record;
pub mod session;
pub mod translation;
pub mod vocabulary;

// Re-export common error type
pub use error::{EnBuddyError, Result};
