pub mod indexer;
pub mod pagination;

pub use indexer::{decode_claim_logs, IndexedLog, IndexerClient, LogQuery};
pub use pagination::{collect_pages, Collected, Page};
