//! Common helpers for workflow tests.

use chat_client::ledger::{KeyValueStore, MemoryStore, UsageLimits};
use chat_client::session::ChatSession;
use chat_proxy::services::providers::mock::MockCompletionProvider;
use std::sync::Arc;
use workflow_tests::ProxyHarness;

/// Reply containing two code blocks with prose around them.
pub const TWO_BLOCK_REPLY: &str = "Open the editor with Alt+F11.\n```vba\nSub Hello()\n    MsgBox \"Hi\"\nEnd Sub\n```\nThen add a button:\n```\nActiveSheet.Buttons.Add 10, 10, 80, 20\n```\nSave as .xlsm.";

/// Start a proxy answering `reply` with no proxy-side rate limit.
pub async fn proxy_replying(reply: &str) -> ProxyHarness {
    ProxyHarness::start(MockCompletionProvider::with_reply(reply), 0)
        .await
        .expect("Failed to start chat-proxy")
}

pub fn session(harness: &ProxyHarness, limits: UsageLimits) -> (ChatSession, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let dyn_store: Arc<dyn KeyValueStore> = store.clone();
    let session = harness
        .session(dyn_store, limits)
        .expect("Failed to build chat session");
    (session, store)
}
