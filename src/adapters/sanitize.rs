//! Log sanitization for patient PII.
//!
//! Booking and queue logs routinely mention patient identifiers. This
//! module scrubs formatted log lines before they reach the sink:
//! - UUIDs (patient and booking ids)
//! - SSN-like numbers
//! - Medical record numbers (MRNs)
//! - Email addresses
//! - Phone numbers
//!
//! Sanitizing strings is a fallback layer; the first line of protection is
//! keeping sensitive values out of log calls entirely.
//!
//! Inputs are size-capped (default 16 KiB, `VITALQUEUE_SANITIZE_MAX_BYTES`
//! to override) so a runaway log line cannot make redaction expensive.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PII_PATTERNS: OnceLock<PiiPatterns> = OnceLock::new();

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

const MAX_BYTES_ENV: &str = "VITALQUEUE_SANITIZE_MAX_BYTES";

struct PiiPattern {
    regex: Regex,
    replacement: &'static str,
}

struct PiiPatterns {
    set: RegexSet,
    patterns: Vec<PiiPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var(MAX_BYTES_ENV)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn get_patterns() -> &'static PiiPatterns {
    PII_PATTERNS.get_or_init(|| {
        let rules: Vec<(&'static str, &'static str)> = vec![
            // UUID patterns (patient, provider, booking ids)
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-UUID]",
            ),
            // SSN-like patterns (xxx-xx-xxxx)
            (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
            // MRN patterns (common formats)
            (r"\bMRN[:\s]?\d{6,10}\b", "[REDACTED-MRN]"),
            // Email patterns (bounded labels; case-insensitive)
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            // Phone patterns
            (
                r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
                "[REDACTED-PHONE]",
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| PiiPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        PiiPatterns { set, patterns }
    })
}

/// Sanitize a string by replacing PII patterns.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    // Fast path: one set scan decides whether any replacement is needed.
    if !patterns.set.is_match(prefix) {
        let mut out = prefix.to_string();
        if truncated {
            out.push_str(" [TRUNCATED]");
        }
        return out;
    }

    let matched: Vec<usize> = patterns.set.matches(prefix).into_iter().collect();
    let mut result = prefix.to_string();
    for idx in matched {
        let pattern = &patterns.patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .to_string();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check whether a string contains potential PII.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().set.is_match(prefix)
}

/// A `tracing_subscriber` writer wrapper that sanitizes formatted log
/// output before it is written to the underlying sink, keeping redaction
/// centralized instead of at every callsite.
#[derive(Debug)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M> Clone for SanitizingMakeWriter<M>
where
    M: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let line_str = String::from_utf8_lossy(&line);
            let sanitized = sanitize(&line_str);
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A formatter emitting an enormous line with no newline must not
        // buffer without bound; flush it lossily and move on.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if hard_cap > 0 && self.buffer.len() > hard_cap {
            let s = String::from_utf8_lossy(&self.buffer).to_string();
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n[TRUNCATED]\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let s = String::from_utf8_lossy(&self.buffer);
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }

        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_uuid() {
        let input = "booked for patient 550e8400-e29b-41d4-a716-446655440000 at 10:00";
        let out = sanitize(input);
        assert!(out.contains("[REDACTED-UUID]"));
        assert!(!out.contains("550e8400"));
    }

    #[test]
    fn test_sanitize_ssn() {
        assert_eq!(sanitize("ssn 123-45-6789 on file"), "ssn [REDACTED-SSN] on file");
    }

    #[test]
    fn test_sanitize_mrn() {
        let out = sanitize("chart MRN:12345678 updated");
        assert!(out.contains("[REDACTED-MRN]"));
    }

    #[test]
    fn test_sanitize_email() {
        let out = sanitize("patient contact jane.doe@example.org");
        assert!(out.contains("[REDACTED-EMAIL]"));
        assert!(!out.contains("jane.doe"));
    }

    #[test]
    fn test_sanitize_phone() {
        let out = sanitize("callback (555) 867-5309 requested");
        assert!(out.contains("[REDACTED-PHONE]"));
    }

    #[test]
    fn test_clean_text_unchanged() {
        let input = "queue position 3, eta 30 min";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_contains_pii() {
        assert!(contains_pii("id 550e8400-e29b-41d4-a716-446655440000"));
        assert!(!contains_pii("position 2 of 7"));
    }

    #[test]
    fn test_oversized_input_truncated() {
        let big = "a".repeat(DEFAULT_SANITIZE_MAX_BYTES * 2);
        let out = sanitize_with_limit(&big, DEFAULT_SANITIZE_MAX_BYTES);
        assert!(out.ends_with(" [TRUNCATED]"));
        assert!(out.len() <= DEFAULT_SANITIZE_MAX_BYTES + " [TRUNCATED]".len());
    }

    #[test]
    fn test_writer_sanitizes_lines() {
        let mut sink: Vec<u8> = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut sink);
            use std::io::Write;
            writer
                .write_all(b"patient 550e8400-e29b-41d4-a716-446655440000 queued\n")
                .expect("Should write");
            writer.flush().expect("Should flush");
        }
        let out = String::from_utf8(sink).expect("Should be UTF-8");
        assert!(out.contains("[REDACTED-UUID]"));
    }
}
