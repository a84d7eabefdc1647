pub mod batch;
pub mod batch_buffer;
pub mod stats;

pub use batch::{Batch, BatchConfig, BulkEntry, FlushTrigger};
pub use batch_buffer::BatchBuffer;
pub use stats::{BufferStats, BufferStatsSnapshot};
