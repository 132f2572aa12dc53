pub mod artist;
pub mod batch;
pub mod catalog;
pub mod counter;
pub mod descriptor;
pub mod dispatch;
pub mod downloader;
pub mod metadata;
pub mod registry;

pub use artist::{ArtistExpander, ArtistExpansion};
pub use batch::{BatchReport, BatchRunner, RetryGranularity, RetryPolicy};
pub use catalog::{CatalogApi, TokenSource};
pub use counter::RunCounter;
pub use descriptor::{classify, Descriptor, MediaType};
pub use dispatch::{DispatchRouter, MediaDownloader, Outcome};
pub use downloader::ProcessDownloader;
pub use registry::{Task, TaskRegistry, TaskStatus};
