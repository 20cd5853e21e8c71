//! Centralized filename parsing: ordering prefixes, slugs and display titles.
//!
//! Every document and folder name follows the same pattern: an optional
//! ordering prefix followed by a name. Three shapes are recognised:
//!
//! - `2024-01-15-hello-world` → dated entry (sorted newest-first)
//! - `01-installation`, `2. Setup`, `10 Appendix` → numbered entry (sorted ascending)
//! - `about` → plain entry (sorted alphabetically after the prefixed ones)
//!
//! The prefix never reaches a URL. [`slugify`] strips it and normalises what
//! is left, and it is the only slug function in the crate: the scanner, the
//! forward URL builder and the reverse resolver all go through it, so the slug
//! extracted for a file and the URL segment generated for the same name can
//! never diverge.
//!
//! ## Display Titles
//!
//! Dashes and underscores in the name portion become spaces and each word is
//! capitalised:
//! - `01-installation.md` → "Installation"
//! - `2024-01-15-hello-world.md` → "Hello World"
//! - `Command_Line.md` → "Command Line"

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::time::SystemTime;

/// File extensions recognised as documents (compared case-insensitively).
pub const MARKUP_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Stem slugs that make a file the index page of its folder.
const INDEX_SLUGS: &[&str] = &["index", "readme"];

/// Leading prefix of an entry name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix<'a> {
    /// `YYYY-MM-DD-rest` with a valid calendar date.
    Date { date: NaiveDate, rest: &'a str },
    /// Digits followed by `-`, `.` or a space.
    Number { number: u64, rest: &'a str },
    Plain,
}

/// Ordering key extracted from a name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum OrderKey {
    Number(u64),
    Date(NaiveDate),
}

/// Result of [`extract_metadata`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_key: Option<OrderKey>,
    /// URL-safe slug of the name, prefix stripped.
    pub slug: String,
    /// Last modification time, carried for display only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Classify the leading prefix of `name` (extension already removed).
///
/// The first matching rule wins: a date prefix, then a numeric prefix,
/// otherwise plain.
pub fn classify(name: &str) -> Prefix<'_> {
    parse_date_prefix(name)
        .or_else(|| parse_number_prefix(name))
        .unwrap_or(Prefix::Plain)
}

fn parse_date_prefix(name: &str) -> Option<Prefix<'_>> {
    let head = name.get(..11)?.as_bytes();
    let digits = |range: std::ops::Range<usize>| head[range].iter().all(u8::is_ascii_digit);
    if !(digits(0..4)
        && head[4] == b'-'
        && digits(5..7)
        && head[7] == b'-'
        && digits(8..10)
        && head[10] == b'-')
    {
        return None;
    }
    let date = NaiveDate::parse_from_str(&name[..10], "%Y-%m-%d").ok()?;
    Some(Prefix::Date {
        date,
        rest: &name[11..],
    })
}

fn parse_number_prefix(name: &str) -> Option<Prefix<'_>> {
    let digits = name.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let separator = *name.as_bytes().get(digits)?;
    if !matches!(separator, b'-' | b'.' | b' ') {
        return None;
    }
    let number = name[..digits].parse::<u64>().ok()?;
    Some(Prefix::Number {
        number,
        rest: name[digits + 1..].trim_start(),
    })
}

/// Extract the ordering key and slug from a file or folder name.
///
/// Total and pure: never fails, never touches the filesystem. The slug is
/// always `slugify` of the extension-less name, so it matches the URL segment
/// [`crate::urls::url_for`] generates for the same entry.
pub fn extract_metadata(file_name: &str, modified: Option<SystemTime>) -> EntryMetadata {
    let stem = strip_markup_extension(file_name);
    let order_key = match classify(stem) {
        Prefix::Date { date, .. } => Some(OrderKey::Date(date)),
        Prefix::Number { number, .. } => Some(OrderKey::Number(number)),
        Prefix::Plain => None,
    };
    EntryMetadata {
        order_key,
        slug: slugify(stem),
        modified: modified.map(DateTime::<Utc>::from),
    }
}

/// Convert one path segment into its URL slug.
///
/// Strips date/number prefixes, transliterates to ASCII, lowercases, turns
/// whitespace and underscore runs into a single hyphen and drops everything
/// outside `[a-z0-9-]`. Stripping and normalising repeat until the result is
/// stable, so `slugify(slugify(x)) == slugify(x)` for every input.
pub fn slugify(segment: &str) -> String {
    let mut current = normalize(strip_prefixes(segment));
    loop {
        let next = normalize(strip_prefixes(&current));
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Strip leading prefixes while something meaningful remains after them.
///
/// `001-` alone keeps its number (`001`) rather than collapsing to nothing.
fn strip_prefixes(mut name: &str) -> &str {
    loop {
        let rest = match classify(name) {
            Prefix::Date { rest, .. } | Prefix::Number { rest, .. } => rest,
            Prefix::Plain => return name,
        };
        if !rest.chars().any(char::is_alphanumeric) {
            return name;
        }
        name = rest;
    }
}

fn normalize(name: &str) -> String {
    let ascii = deunicode::deunicode(name);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_hyphen = false;
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '-' || c == '_' || c.is_whitespace() {
            pending_hyphen = true;
        }
    }
    slug
}

/// Human-readable title derived from a name: prefix stripped, separators
/// turned into spaces, words capitalised.
pub fn display_title(name: &str) -> String {
    let stem = strip_markup_extension(name);
    let words: Vec<String> = strip_prefixes(stem)
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect();
    if words.is_empty() {
        stem.to_string()
    } else {
        words.join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Remove a trailing markup extension (`.md`, `.markdown`), if present.
pub fn strip_markup_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && is_markup_extension(ext) => stem,
        _ => name,
    }
}

/// Whether `name` carries a recognised markup extension.
pub fn is_markup_file_name(name: &str) -> bool {
    strip_markup_extension(name).len() != name.len()
}

pub fn is_markup_extension(ext: &str) -> bool {
    MARKUP_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(ext))
}

/// Whether a slug names an index page (`index` or `readme`).
pub fn is_index_slug(slug: &str) -> bool {
    INDEX_SLUGS.contains(&slug)
}

/// Whether a document file name is an index page of its folder.
///
/// Compared on the prefix-stripped slug, so `README.md`, `Index.markdown`
/// and `00-index.md` all qualify.
pub fn is_index_name(file_name: &str) -> bool {
    is_markup_file_name(file_name) && is_index_slug(&slugify(strip_markup_extension(file_name)))
}
