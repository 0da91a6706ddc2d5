// ABOUTME: Database name sanitization for engine-safe identifiers
// ABOUTME: Replaces unsafe characters and shortens over-length names around a unique counter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Turns an arbitrary requested name (typically a test name such as
//! `orders/create (happy path)#3`) into a valid database identifier.
//!
//! Names that fit are returned as-is after character cleanup, so short names are
//! deterministic and not guaranteed unique; the engine rejects a duplicate at
//! `CREATE DATABASE` time. Over-length names are cut to a prefix and a suffix around
//! `-<n>-`, where `n` comes from a counter that never repeats, so two shortened names
//! never collide.

use pgfixture_core::constants::identifiers::{
    MAX_IDENTIFIER_LEN, REMOVED_CHARS, REPLACED_CHARS, SHORTENED_PREFIX_WIDTH,
    SHORTENED_SEPARATOR, SHORTENED_SUFFIX_WIDTH,
};
use std::sync::atomic::{AtomicU64, Ordering};

// Shared by every sanitizer in the process so shortened names never repeat
static SHORTENED: AtomicU64 = AtomicU64::new(0);

/// Sanitizes requested names, drawing shortened-name counters from a process-wide sequence
#[derive(Debug, Clone, Copy)]
pub struct NameSanitizer {
    counter: &'static AtomicU64,
}

impl NameSanitizer {
    /// Create a sanitizer on the process-wide counter
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: &SHORTENED,
        }
    }

    #[cfg(test)]
    const fn with_counter(counter: &'static AtomicU64) -> Self {
        Self { counter }
    }

    /// Produce an identifier of at most 63 bytes for `requested`
    #[must_use]
    pub fn sanitize(&self, requested: &str) -> String {
        let cleaned = clean(requested);
        if cleaned.len() <= MAX_IDENTIFIER_LEN {
            return cleaned;
        }

        let uid = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        shorten(&cleaned, uid)
    }

    /// How many names have been shortened in this process so far
    #[must_use]
    pub fn shortened_count(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for NameSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace `/` and `#` with `_` and drop `(` and `)`
#[must_use]
pub fn clean(requested: &str) -> String {
    requested
        .chars()
        .filter(|c| !REMOVED_CHARS.contains(c))
        .map(|c| if REPLACED_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Keep `29 - d/2` leading and `30 - d/2` trailing bytes around `-uid-`, where `d` is
/// the number of digits in `uid`
///
/// Widths are in bytes because the engine limit is in bytes; cuts that would split a
/// multi-byte character move inward to the nearest character boundary.
fn shorten(cleaned: &str, uid: u64) -> String {
    let uid = uid.to_string();
    let half = uid.len() / 2;
    let head_width = SHORTENED_PREFIX_WIDTH.saturating_sub(half);
    let tail_width = SHORTENED_SUFFIX_WIDTH.saturating_sub(half);

    let mut head_end = head_width.min(cleaned.len());
    while !cleaned.is_char_boundary(head_end) {
        head_end -= 1;
    }
    let mut tail_start = cleaned.len().saturating_sub(tail_width);
    while !cleaned.is_char_boundary(tail_start) {
        tail_start += 1;
    }

    let mut name = String::with_capacity(MAX_IDENTIFIER_LEN);
    name.push_str(&cleaned[..head_end]);
    name.push(SHORTENED_SEPARATOR);
    name.push_str(&uid);
    name.push(SHORTENED_SEPARATOR);
    name.push_str(&cleaned[tail_start..]);
    name
}
