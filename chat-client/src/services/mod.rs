pub mod proxy_client;

pub use proxy_client::{ClientError, CompletionClient, ProxyClient};
