//! Source side of the tender pipeline: fetch listing pages, map them into
//! raw tenders, normalize, and hand batches to the queue dispatcher.

pub mod adapter;
pub mod error;
pub mod etenders;
pub mod fetch;
pub mod pagination;
pub mod pipeline;

pub use adapter::{AdaptedPage, SourceAdapter};
pub use error::FetchError;
pub use etenders::ETendersAdapter;
pub use fetch::{HttpPageFetcher, PageFetcher};
pub use pagination::PageCursor;
pub use pipeline::{Pipeline, PipelineLimits, RunOutcome, RunSummary};
