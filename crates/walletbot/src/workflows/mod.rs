//! Conversation, session, and community lending workflows.

pub mod conversation;
pub mod lending;
pub mod sessions;
