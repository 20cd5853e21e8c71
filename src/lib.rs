//! # Simple Docs
//!
//! A documentation site generator for a folder of markdown files. Your
//! filesystem is the data source: folders become sections, documents become
//! pages, and file names decide both the order and the URL of every page.
//!
//! # Architecture
//!
//! ```text
//! content/ ──scan──▶ Site ──render──▶ RenderedPage* ──validate──▶ BrokenLink*
//!                     │                                              │
//!                     └──────────────── build / serve ◀───────────────┘
//! ```
//!
//! - **Scan** walks the content directory into an immutable [`scan::Site`]:
//!   a tree of folders and documents plus the flattened reading order.
//! - **Render** turns each document into HTML and records every internal link
//!   with the line and syntax it was written as.
//! - **Validate** checks those links against the set of URLs the scan
//!   produced and suggests close matches for the ones that miss.
//! - **Build** writes `<url>/index.html` files; **serve** does the same work
//!   per request without writing anything.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`naming`] | Date and number prefixes, slugs, display titles |
//! | [`listing`] | The directory listing shared by the scanner and the URL resolver |
//! | [`urls`] | `url_for` (path → URL) and `resolve_url` (URL → source file) |
//! | [`scan`] | Content tree, sibling ordering, page sequence |
//! | [`links`] | Wikilink parsing, link targets, validation and suggestions |
//! | [`render`] | Markdown to HTML with link provenance |
//! | [`generate`] | Page templates (Maud), `check` and `build` |
//! | [`serve`] | Live preview server |
//! | [`config`] | `config.toml` loading, validation and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Naming Function
//!
//! The scanner, the forward resolver, and the reverse resolver all derive
//! slugs through [`naming::slugify`], and the scanner and reverse resolver
//! read directories through [`listing::list_dir`]. A URL produced for a page
//! therefore always resolves back to that same page.
//!
//! ## Scan Is Pure
//!
//! [`scan::scan`] reads the filesystem and returns a fresh [`scan::Site`].
//! Nothing is cached between calls, so concurrent preview requests never see
//! each other's half-built trees.
//!
//! ## Validate Before Writing
//!
//! `build` renders and validates every page before touching the output
//! directory. A strict build with a broken link leaves the previous output
//! untouched.

pub mod config;
pub mod generate;
pub mod links;
pub mod listing;
pub mod naming;
pub mod output;
pub mod render;
pub mod scan;
pub mod serve;
pub mod urls;

#[cfg(test)]
pub(crate) mod test_helpers;
