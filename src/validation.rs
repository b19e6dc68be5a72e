// SPDX-License-Identifier: MIT
//! Syntax checks for identifiers and repository source locators.
//!
//! Pure and synchronous. These run before any store mutation or network call
//! so malformed input fails fast instead of surfacing as a remote 4xx.

use once_cell::sync::Lazy;
use regex::Regex;

/// Canonical UUID textual form: 8-4-4-4-12 hex groups, case-insensitive.
/// Deliberately stricter than `uuid::Uuid::parse_str`, which also accepts
/// the dashless and URN forms the indexing service rejects.
static UUID_FORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("regex: canonical uuid")
});

/// True iff `s` is a canonical-form UUID string.
pub fn is_valid_uuid(s: &str) -> bool {
    UUID_FORM.is_match(s)
}

/// True iff `s` looks like a usable repository source locator: an http(s)
/// URL, a `git@` remote, an absolute POSIX path, or a Windows drive path.
pub fn is_valid_repo_url(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    if s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("git@")
        || s.starts_with('/')
    {
        return true;
    }
    // Windows drive prefix, e.g. `C:\repos\api`.
    let b = s.as_bytes();
    b.len() >= 3 && b[0].is_ascii_alphabetic() && b[1] == b':' && b[2] == b'\\'
}
