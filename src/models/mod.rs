pub mod extraction;
pub mod target_url;
pub mod validation;

pub use extraction::{CacheBackend, ExtractionResult, Provenance};
pub use target_url::TargetUrl;
pub use validation::{HostValidator, ValidationError};
