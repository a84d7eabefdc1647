#![deny(warnings, rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Millisecond durations and byte sizes stay inside u64
    clippy::cast_precision_loss,      // Jitter math on millisecond values
    clippy::cast_sign_loss,           // Jitter factor is never negative
    clippy::missing_errors_doc,       // Error enums document their own variants
    clippy::module_name_repetitions,  // e.g. BatchBuffer in the buffer module
    clippy::must_use_candidate        // Builders and accessors are obvious at the call site
)]

pub mod app;
pub mod buffer;
pub mod builder;
pub mod collector;
pub mod domain;
pub mod parser;
pub mod reliability;
pub mod sender;

pub use app::{AdapterSettings, Config, LogesAdapter};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
