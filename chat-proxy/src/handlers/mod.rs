//! HTTP handlers for the chat proxy.

pub mod chat;
pub mod health;
