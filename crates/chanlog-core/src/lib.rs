pub mod aggregate;
pub mod discovery;
pub mod error;
pub mod export;
pub mod job;
pub mod manager;
pub mod models;
pub mod pager;
pub mod pipeline;
pub mod reference;
pub mod snowflake;
pub mod throttle;
pub mod traits;
pub mod window;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use aggregate::Aggregator;
pub use error::AppError;
pub use job::{ExportRequest, JobConfig, JobState, JobStatus};
pub use manager::JobManager;
pub use models::{ChannelInfo, ChannelKind, ExportFormat, ExportResult, MessageRecord, ThreadRecord};
pub use pipeline::{ExportEvent, ExportReporter, NoopReporter, TracingReporter};
pub use reference::ChannelReference;
pub use throttle::Pacing;
pub use traits::{ApiResponse, ApiTransport};
pub use window::DateWindow;
