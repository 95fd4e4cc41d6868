#![allow(dead_code)]

use paper_trader::infrastructure::{MemoryStore, Store};
use paper_trader::services::PositionLedger;
use std::sync::Arc;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn memory_ledger() -> (Arc<MemoryStore>, Arc<PositionLedger>) {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(PositionLedger::new(Arc::clone(&store) as Arc<dyn Store>));
    (store, ledger)
}

/// Minimal token page with a labelled market cap.
pub fn token_page(symbol: &str, mcap: &str) -> String {
    format!(
        r#"<html><head><title>Token ({symbol}) - pump</title></head>
<body>
  <div class="stats">
    <div class="stat"><span>Market cap</span><span>{mcap}</span></div>
    <div class="stat"><span>Volume</span><span>$1.1K</span></div>
  </div>
</body></html>"#
    )
}

/// Page that has not rendered its numbers yet.
pub fn loading_page(symbol: &str) -> String {
    format!(
        r#"<html><head><title>Token ({symbol})</title></head><body><div>Loading...</div></body></html>"#
    )
}
