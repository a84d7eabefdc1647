pub mod fields;
pub mod newline;

pub use fields::{FieldParser, FieldsOutcome, ParseError, ParsedFields, ParsedLine};
pub use newline::{decode_newlines, escape_newlines};
