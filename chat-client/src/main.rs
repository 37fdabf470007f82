use chat_client::config::get_configuration;
use chat_client::ledger::{FileStore, ResetTask, SharedLedger, UsageLedger, UsageLimits};
use chat_client::services::ProxyClient;
use chat_client::session::ChatSession;
use chat_client::terminal::Terminal;
use dotenvy::dotenv;
use service_core::observability::init_cli_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let configuration = get_configuration().map_err(|e| {
        eprintln!("Failed to read configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_cli_tracing(&configuration.log_level);

    let store = Arc::new(FileStore::new(&configuration.usage.storage_dir));
    let limits = UsageLimits {
        requests_per_minute: configuration.usage.requests_limit,
        tokens_per_day: configuration.usage.tokens_limit,
    };
    let ledger = SharedLedger::new(UsageLedger::load(store, limits));
    let reset_task = ResetTask::spawn(
        ledger.clone(),
        Duration::from_secs(configuration.usage.reset_interval_secs.max(1)),
    );

    let client = ProxyClient::new(configuration.proxy.clone()).map_err(|e| {
        tracing::error!("Failed to build proxy client: {}", e);
        anyhow::anyhow!("Startup error: {}", e)
    })?;
    tracing::info!(proxy = %client.base_url(), "Chat client starting");

    let session = ChatSession::new(Arc::new(client), ledger)
        .keep_history(configuration.session.keep_history);

    let mut terminal = Terminal::new(
        session,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    );
    let result = terminal.run().await;

    reset_task.shutdown().await;
    result
}
