pub mod error;
pub mod fetcher;
pub mod normalize;

pub use error::FeedError;
pub use fetcher::{dedup_batch, filter_max_age, FeedFetcher, FetcherConfig};
pub use normalize::{
    article_id, clean_html, content_hash, normalize_entry, normalize_title, RawEntry,
};
