//! Canonical URLs: content path → URL, and URL → source file.
//!
//! The forward direction ([`url_for`]) is pure string work and is the single
//! source of truth for every address on the site; nothing stores a URL.
//!
//! The reverse direction ([`resolve_url`]) reads real directories. The
//! preview server needs it because the tree may change between two requests,
//! so there is no precomputed map to consult. Candidates are tried in order:
//!
//! 1. **Literal**: `<url>.md` exists as written (`/guides/setup/` →
//!    `guides/setup.md`).
//! 2. **Folder index**: each URL segment matches a directory by slug and
//!    the last directory has an index page (`/guides/advanced/` →
//!    `guides/10-advanced/README.md`).
//! 3. **Slug match**: all but the last segment match directories and a
//!    document in the last one has the final segment as its slug
//!    (`/posts/hello-world/` → `posts/2024-01-15-hello-world.md`).
//!
//! For every node a scan produces, `resolve_url(url_for(path))` lands back
//! on that node's file. The scanner refuses trees where two entries share a
//! URL, so the order above never has to break a tie between real pages.

use crate::listing::{self, ContentFilter};
use crate::naming::{MARKUP_EXTENSIONS, is_index_slug, slugify, strip_markup_extension};
use std::path::{Path, PathBuf};

/// Canonical URL of a content path (`guides/01-installation.md` →
/// `/guides/installation/`).
///
/// Each segment is slugified on its own; trailing `index`/`readme` segments
/// are dropped so a folder and its index page share one address. The result
/// always starts and ends with `/`, and `url_for(url_for(p)) == url_for(p)`.
pub fn url_for(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let last = segments.len().saturating_sub(1);

    let mut slugs: Vec<String> = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if i == last {
                slugify(strip_markup_extension(segment))
            } else {
                slugify(segment)
            }
        })
        .filter(|slug| !slug.is_empty())
        .collect();

    while slugs.last().is_some_and(|slug| is_index_slug(slug)) {
        slugs.pop();
    }

    if slugs.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", slugs.join("/"))
    }
}

/// Find the source file a URL addresses, or `None` if nothing matches.
///
/// `url` must already be percent-decoded. A miss is a normal outcome: the
/// caller decides between a 404 and an auto-generated folder index.
pub fn resolve_url(root: &Path, url: &str, filter: &ContentFilter) -> Option<PathBuf> {
    let segments = url_segments(url)?;
    literal_match(root, &segments, filter)
        .or_else(|| index_match(root, &segments, filter))
        .or_else(|| slug_match(root, &segments, filter))
}

/// Split a URL path into segments, rejecting anything that could escape the
/// content root.
fn url_segments(url: &str) -> Option<Vec<&str>> {
    let segments: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
    if segments
        .iter()
        .any(|s| *s == "." || *s == ".." || s.contains('\\'))
    {
        return None;
    }
    Some(segments)
}

fn literal_match(root: &Path, segments: &[&str], filter: &ContentFilter) -> Option<PathBuf> {
    let (last, parents) = segments.split_last()?;

    let mut dir = root.to_path_buf();
    for segment in parents {
        let entries = listing::list_dir(&dir, filter).ok()?;
        let next = entries
            .into_iter()
            .find(|e| e.is_dir() && e.name == *segment)?;
        dir = next.path;
    }

    let entries = listing::list_dir(&dir, filter).ok()?;
    MARKUP_EXTENSIONS.iter().find_map(|ext| {
        let file_name = format!("{last}.{ext}");
        entries
            .iter()
            .find(|e| e.is_document() && e.name == file_name)
            .map(|e| e.path.clone())
    })
}

fn index_match(root: &Path, segments: &[&str], filter: &ContentFilter) -> Option<PathBuf> {
    walk_dirs(root, segments, filter, &|dir: &Path| {
        let entries = listing::list_dir(dir, filter).ok()?;
        listing::find_index(&entries).map(|e| e.path.clone())
    })
}

fn slug_match(root: &Path, segments: &[&str], filter: &ContentFilter) -> Option<PathBuf> {
    let (last, parents) = segments.split_last()?;
    walk_dirs(root, parents, filter, &|dir: &Path| {
        let entries = listing::list_dir(dir, filter).ok()?;
        entries
            .iter()
            .find(|e| e.is_document() && slugify(strip_markup_extension(&e.name)) == *last)
            .map(|e| e.path.clone())
    })
}

/// Depth-first descent through directories whose slug matches each segment.
///
/// Every equally-slugged directory is tried in name order, so an asset-only
/// `Guides/` cannot hide the `guides/` that holds the documents.
fn walk_dirs<F>(dir: &Path, segments: &[&str], filter: &ContentFilter, visit: &F) -> Option<PathBuf>
where
    F: Fn(&Path) -> Option<PathBuf>,
{
    let Some((first, rest)) = segments.split_first() else {
        return visit(dir);
    };
    let entries = listing::list_dir(dir, filter).ok()?;
    entries
        .iter()
        .filter(|e| e.is_dir() && slugify(&e.name) == *first)
        .find_map(|e| walk_dirs(&e.path, rest, filter, visit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_tree;

    fn resolve(root: &Path, url: &str) -> Option<PathBuf> {
        resolve_url(root, url, &ContentFilter::default())
    }

    // =========================================================================
    // url_for
    // =========================================================================

    #[test]
    fn root_index_is_slash() {
        assert_eq!(url_for("index.md"), "/");
        assert_eq!(url_for("README.md"), "/");
        assert_eq!(url_for(""), "/");
    }

    #[test]
    fn plain_file() {
        assert_eq!(url_for("about.md"), "/about/");
    }

    #[test]
    fn numbered_file_in_folder() {
        assert_eq!(
            url_for("guides/01-installation.md"),
            "/guides/installation/"
        );
    }

    #[test]
    fn dated_file() {
        assert_eq!(
            url_for("posts/2024-01-15-hello-world.md"),
            "/posts/hello-world/"
        );
    }

    #[test]
    fn folder_and_its_index_share_url() {
        assert_eq!(url_for("guides/10-advanced"), "/guides/advanced/");
        assert_eq!(url_for("guides/10-advanced/README.md"), "/guides/advanced/");
        assert_eq!(url_for("guides/10-advanced/00-index.md"), "/guides/advanced/");
    }

    #[test]
    fn nested_index_folders_collapse() {
        assert_eq!(url_for("index/index.md"), "/");
    }

    #[test]
    fn messy_names() {
        assert_eq!(
            url_for("Reference Docs/Command_Line.md"),
            "/reference-docs/command-line/"
        );
        assert_eq!(url_for("/leading/slash.md"), "/leading/slash/");
    }

    #[test]
    fn only_last_segment_loses_extension() {
        assert_eq!(url_for("notes.md/page.md"), "/notesmd/page/");
    }

    #[test]
    fn url_for_is_idempotent() {
        let paths = [
            "index.md",
            "about.md",
            "guides/01-installation.md",
            "posts/2024-01-15-hello-world.md",
            "index/index.md",
            "Reference Docs/01_Command_Line.md",
            "a/b/README.markdown",
            "notes.md/page.md",
        ];
        for path in paths {
            let once = url_for(path);
            assert_eq!(url_for(&once), once, "{path}");
        }
    }

    // =========================================================================
    // resolve_url
    // =========================================================================

    #[test]
    fn resolves_literal_file() {
        let tmp = write_tree(&[("about.md", "# About")]);
        assert_eq!(resolve(tmp.path(), "/about/"), Some(tmp.path().join("about.md")));
    }

    #[test]
    fn resolves_root_index() {
        let tmp = write_tree(&[("index.md", "# Home"), ("about.md", "")]);
        assert_eq!(resolve(tmp.path(), "/"), Some(tmp.path().join("index.md")));
    }

    #[test]
    fn resolves_folder_readme() {
        let tmp = write_tree(&[("guides/10-advanced/README.md", "")]);
        assert_eq!(
            resolve(tmp.path(), "/guides/advanced/"),
            Some(tmp.path().join("guides/10-advanced/README.md"))
        );
    }

    #[test]
    fn resolves_dated_file() {
        let tmp = write_tree(&[("posts/2024-01-15-hello-world.md", "")]);
        assert_eq!(
            resolve(tmp.path(), "/posts/hello-world/"),
            Some(tmp.path().join("posts/2024-01-15-hello-world.md"))
        );
    }

    #[test]
    fn resolves_renamed_folder_and_file() {
        let tmp = write_tree(&[("Reference Docs/Command_Line.md", "")]);
        assert_eq!(
            resolve(tmp.path(), "/reference-docs/command-line/"),
            Some(tmp.path().join("Reference Docs/Command_Line.md"))
        );
    }

    #[test]
    fn folder_without_index_is_not_found() {
        let tmp = write_tree(&[("guides/01-installation.md", "")]);
        assert_eq!(resolve(tmp.path(), "/guides/"), None);
    }

    #[test]
    fn unknown_url_is_not_found() {
        let tmp = write_tree(&[("about.md", "")]);
        assert_eq!(resolve(tmp.path(), "/missing/"), None);
        assert_eq!(resolve(tmp.path(), "/about/extra/"), None);
    }

    #[test]
    fn traversal_is_rejected() {
        let tmp = write_tree(&[("docs/about.md", "")]);
        assert_eq!(resolve(&tmp.path().join("docs"), "/../docs/about/"), None);
    }

    #[test]
    fn hidden_entries_are_invisible() {
        let tmp = write_tree(&[(".drafts/secret.md", "")]);
        assert_eq!(resolve(tmp.path(), "/.drafts/secret/"), None);
        assert_eq!(resolve(tmp.path(), "/drafts/secret/"), None);
    }

    #[test]
    fn asset_folder_does_not_hide_document_folder() {
        // "Guides" sorts before "guides_" and slugifies the same
        let tmp = write_tree(&[("Guides/logo.png", ""), ("guides_/02-intro.md", "")]);
        assert_eq!(
            resolve(tmp.path(), "/guides/intro/"),
            Some(tmp.path().join("guides_/02-intro.md"))
        );
    }

    #[test]
    fn non_canonical_literal_still_resolves() {
        let tmp = write_tree(&[("posts/2024-01-15-hello-world.md", "")]);
        assert_eq!(
            resolve(tmp.path(), "/posts/2024-01-15-hello-world/"),
            Some(tmp.path().join("posts/2024-01-15-hello-world.md"))
        );
    }
}
