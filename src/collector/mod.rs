pub mod lines;

pub use lines::{CollectorError, LineCollector, LineReader, open_input};
