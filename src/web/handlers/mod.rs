//! Route handler modules for the tolk REST API.

pub mod conversations;
pub mod dictionary;
pub mod health;
pub mod messages;
pub mod notes;
pub mod profile;
pub mod prompts;
pub mod settings;
pub mod speech;
