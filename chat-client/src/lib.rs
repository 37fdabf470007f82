pub mod attachments;
pub mod config;
pub mod flow;
pub mod ledger;
pub mod render;
pub mod segmenter;
pub mod services;
pub mod session;
pub mod terminal;
