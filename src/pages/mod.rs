//! Page table and collection summaries

mod summary;
mod table;

pub use summary::{collection_json, data_summaries, page_summaries, DataSummary, PageSummary};
pub use table::{page_and_dir, PageData, PageEntry, PageTable, DEFAULT_TEMPLATE, INDEX_ROUTE};
