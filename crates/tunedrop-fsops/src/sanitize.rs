//! Download name sanitisation and `Content-Disposition` rendering.
//!
//! # Design
//! - Every helper is pure and total; an empty result is a valid output that
//!   callers replace with a generated name.
//! - Non-ASCII input is dropped rather than transliterated so header values stay
//!   within the quoted-string grammar.

/// Maximum length, in characters, of a sanitised name.
pub const MAX_FILENAME_LEN: usize = 150;

const ILLEGAL: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Longest suffix treated as a file extension by [`sanitize_file_name`].
const MAX_EXTENSION_LEN: usize = 10;

/// Strip characters unsafe in file names and header values.
///
/// Illegal characters are removed first, the result is cut to
/// [`MAX_FILENAME_LEN`] characters, anything outside printable ASCII is dropped
/// and surrounding whitespace is trimmed.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|ch| !ILLEGAL.contains(ch))
        .take(MAX_FILENAME_LEN)
        .filter(|ch| ch.is_ascii() && !ch.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Sanitise `raw`, returning `fallback` when nothing survives.
#[must_use]
pub fn sanitize_or(raw: &str, fallback: &str) -> String {
    let cleaned = sanitize(raw);
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

/// Sanitise a file name while keeping its extension intact.
///
/// The stem absorbs any truncation so the result never exceeds
/// [`MAX_FILENAME_LEN`]. Returns an empty string when the stem is empty.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let Some((stem, extension)) = split_extension(name) else {
        return sanitize(name);
    };
    let budget = MAX_FILENAME_LEN.saturating_sub(extension.len() + 1);
    let stem: String = sanitize(stem).chars().take(budget).collect();
    let stem = stem.trim_end();
    if stem.is_empty() {
        return String::new();
    }
    format!("{stem}.{extension}")
}

/// Sanitise a collection title for use as an archive file stem.
///
/// Whitespace runs collapse into a single `_`.
#[must_use]
pub fn archive_stem(title: &str) -> String {
    sanitize(title)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Percent-encode a name for the RFC 5987 `filename*` parameter.
#[must_use]
pub fn encode_filename(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

/// Render an `attachment` disposition carrying both filename parameters.
#[must_use]
pub fn content_disposition(name: &str) -> String {
    format!(
        "attachment; filename=\"{name}\"; filename*=UTF-8''{}",
        encode_filename(name)
    )
}

fn split_extension(name: &str) -> Option<(&str, &str)> {
    let (stem, extension) = name.rsplit_once('.')?;
    let valid = !extension.is_empty()
        && extension.len() <= MAX_EXTENSION_LEN
        && extension.chars().all(|ch| ch.is_ascii_alphanumeric());
    valid.then_some((stem, extension))
}
