//! Normalization of caller-supplied submit parameters
//!
//! TTL and read counts are clamped into the configured bounds, never
//! rejected. Display metadata is capped in characters.

use ciphare_core::config::LimitsConfig;

pub const DEFAULT_FILE_NAME: &str = "unknown";
pub const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// Clamp a requested TTL (seconds) into `[min_ttl_secs, max_ttl_secs]`.
/// `None` means the configured default, which is itself clamped.
pub fn clamp_ttl(requested: Option<i64>, limits: &LimitsConfig) -> u64 {
    let min = i64::try_from(limits.min_ttl_secs).unwrap_or(i64::MAX);
    let max = i64::try_from(limits.max_ttl_secs).unwrap_or(i64::MAX).max(min);
    let default = i64::try_from(limits.default_ttl_secs).unwrap_or(min);
    requested.unwrap_or(default).clamp(min, max).unsigned_abs()
}

/// Clamp a requested read count into `[min_reads, max_reads]`.
pub fn clamp_reads(requested: Option<i64>, limits: &LimitsConfig) -> u32 {
    let min = i64::from(limits.min_reads);
    let max = i64::from(limits.max_reads).max(min);
    let default = i64::from(limits.default_reads);
    let clamped = requested.unwrap_or(default).clamp(min, max);
    u32::try_from(clamped).unwrap_or(limits.max_reads)
}

/// First `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}

/// File name for storage: default when blank, capped otherwise.
pub fn file_name(requested: Option<&str>, limits: &LimitsConfig) -> String {
    display_field(requested, DEFAULT_FILE_NAME, limits.max_file_name_len)
}

/// MIME type for storage: default when blank, capped otherwise.
pub fn file_type(requested: Option<&str>, limits: &LimitsConfig) -> String {
    display_field(requested, DEFAULT_FILE_TYPE, limits.max_file_type_len)
}

fn display_field(requested: Option<&str>, default: &str, max_chars: usize) -> String {
    match requested.map(str::trim) {
        Some(s) if !s.is_empty() => truncate_chars(s, max_chars),
        _ => default.to_string(),
    }
}
