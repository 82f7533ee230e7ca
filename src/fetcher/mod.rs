pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

pub use client::{DEFAULT_USER_AGENT, FETCH_TIMEOUT, PageFetcher};
pub use errors::{FetchError, FetchFailure};
pub use types::{Charset, PageResponse};
