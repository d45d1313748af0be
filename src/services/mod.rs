pub mod cache;
pub mod extractor;
pub mod fetcher;
pub mod pipeline;

pub use cache::{CacheCleanupTask, CacheManager, CacheSettings, FileCacheStore, StoreError};
pub use extractor::{ExtractionError, ExtractionStrategy, ImageExtractor};
pub use fetcher::{FetchError, HttpPageFetcher, PageFetcher, RawContent};
pub use pipeline::{BookImageResponse, BookImageService, FailureReason, RequestError, RequestOptions};
