//! Slug derivation for post identifiers.
//!
//! # Invariants
//! - Output only contains `[a-z0-9_-]`.
//! - Output never starts or ends with `-` and never contains `--` or `__`.
//! - `slugify(slugify(x)) == slugify(x)`.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_-]+").expect("valid slug charset regex"));
static HYPHEN_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid hyphen regex"));
static UNDERSCORE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_{2,}").expect("valid underscore regex"));

/// Derives a URL-safe identifier from free text.
///
/// Rules, in order: lower-case, whitespace runs become `-`, characters
/// outside `[a-z0-9_-]` are removed, `-`/`_` runs collapse to one, and
/// leading/trailing hyphens are trimmed.
pub fn slugify(text: &str) -> String {
    let lowered = text.to_lowercase();
    let hyphenated = WHITESPACE_RE.replace_all(&lowered, "-");
    let filtered = DISALLOWED_RE.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUN_RE.replace_all(&filtered, "-");
    let collapsed = UNDERSCORE_RUN_RE.replace_all(&collapsed, "_");
    collapsed.trim_matches('-').to_string()
}

/// Returns whether `value` is already in canonical slug form.
pub fn is_canonical_slug(value: &str) -> bool {
    !value.is_empty() && slugify(value) == value
}
