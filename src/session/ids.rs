use std::sync::atomic::{AtomicU64, Ordering};

use crate::foundation::core::now_ms;
use crate::foundation::error::{AutopostError, AutopostResult};

/// Prefix of preview artifacts.
pub const PREVIEW_PREFIX: &str = "prev_";
/// Prefix of committed artifacts.
pub const POST_PREFIX: &str = "post_";
/// Suffix of sidecar and commit records.
pub const META_SUFFIX: &str = ".meta.json";

/// Hands out strictly increasing millisecond stamps.
///
/// Two allocations in the same millisecond get consecutive values, so names derived from them
/// never collide within one allocator.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicU64,
}

impl IdAllocator {
    /// New allocator.
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Next stamp: the current time, or one past the previous stamp if the clock has not moved.
    pub fn next_ms(&self) -> u64 {
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now_ms().max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// `prev_<ms>`
pub fn preview_stem(ms: u64) -> String {
    format!("{PREVIEW_PREFIX}{ms}")
}

/// `post_<ms>` for the preview `prev_<ms>`.
pub fn post_stem(preview_stem: &str) -> String {
    let ms = preview_stem
        .strip_prefix(PREVIEW_PREFIX)
        .unwrap_or(preview_stem);
    format!("{POST_PREFIX}{ms}")
}

/// Map a committed file name back to the preview name it was copied from.
pub fn committed_name(preview_file: &str) -> String {
    match preview_file.strip_prefix(PREVIEW_PREFIX) {
        Some(rest) => format!("{POST_PREFIX}{rest}"),
        None => preview_file.to_string(),
    }
}

/// Normalize a preview id or preview URL to `prev_<digits>`.
///
/// Accepts `prev_123`, bare `123`, and file names or URLs such as
/// `/static/generated/prev_123.jpg` or `prev_123_f2.webp`. Anything else is rejected, which also
/// keeps path separators out of the names used on disk.
pub fn normalize_preview_id(input: &str) -> AutopostResult<String> {
    let bad = || {
        AutopostError::validation(
            "bad_preview_id",
            format!("'{input}' is not a preview id or preview url"),
        )
    };
    let last = input
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let name = last.split('.').next().unwrap_or_default();
    let rest = name.strip_prefix(PREVIEW_PREFIX).unwrap_or(name);
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (digits, tail) = rest.split_at(digits_end);
    if digits.is_empty() || !(tail.is_empty() || tail.starts_with('_')) {
        return Err(bad());
    }
    Ok(format!("{PREVIEW_PREFIX}{digits}"))
}

/// `true` if `file_name` belongs to the artifact set named `stem`.
pub fn belongs_to(file_name: &str, stem: &str) -> bool {
    file_name
        .strip_prefix(stem)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('_'))
}
