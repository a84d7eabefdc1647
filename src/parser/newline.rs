//! Conversion between real newlines and the two-character `\n` escape that
//! applications write when they log JSON on a single line.

/// Replaces every real newline with a literal backslash-n.
pub fn escape_newlines(s: &str) -> String {
    s.replace('\n', "\\n")
}

/// Replaces every literal backslash-n with a real newline.
pub fn decode_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}
