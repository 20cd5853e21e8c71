//! Markdown body rendering.
//!
//! Turns one document into an HTML fragment and records every internal link
//! it emits, with the line and syntax it was authored as, so link validation
//! can point back at the source.
//!
//! Rendering steps:
//!
//! 1. Wikilinks outside code are expanded in the source text to `<a class="wikilink">`
//!    elements. Tokens never span lines, so line numbers are unchanged.
//! 2. The result goes through `pulldown-cmark`. Links whose destination is a
//!    source document (`01-installation.md`) are rewritten to the page URL.
//! 3. The first level-one heading becomes the page title.

use crate::links::{self, PageLink};
use crate::urls::url_for;
use maud::html;
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd, html as md_html};
use std::path::{Path, PathBuf};

/// One rendered document body.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// Document path relative to the content root.
    pub path: String,
    pub url: String,
    pub source_file: PathBuf,
    /// Text of the first `#` heading, if any.
    pub title: Option<String>,
    /// Body HTML, without page chrome.
    pub html: String,
    /// Internal links in source order.
    pub links: Vec<PageLink>,
}

pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_FOOTNOTES
}

/// Render the markdown `source` of the document at `page_path`.
pub fn render_markdown(source: &str, page_path: &str, source_file: &Path) -> RenderedPage {
    // Each link is keyed by its byte offset in the expanded text
    let mut links: Vec<(usize, PageLink)> = Vec::new();
    let expanded = expand_wikilinks(source, page_path, &mut links);

    let mut events = Vec::new();
    let mut title: Option<String> = None;
    let mut capturing_title = false;
    let mut open_link: Option<usize> = None;

    for (event, range) in Parser::new_ext(&expanded, parser_options()).into_offset_iter() {
        let event = match event {
            Event::Start(Tag::Heading { level: HeadingLevel::H1, .. }) if title.is_none() => {
                capturing_title = true;
                title = Some(String::new());
                event
            }
            Event::End(TagEnd::Heading(HeadingLevel::H1)) if capturing_title => {
                capturing_title = false;
                event
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title: link_title,
                id,
            }) => {
                let dest_url = match links::resolve_markdown_href(&dest_url, page_path) {
                    Some(url) => CowStr::from(url),
                    None => dest_url,
                };
                if links::is_internal_href(&dest_url) {
                    links.push((
                        range.start,
                        PageLink {
                            url: dest_url.to_string(),
                            text: String::new(),
                            original: expanded[range.clone()].to_string(),
                            line: line_of(&expanded, range.start),
                        },
                    ));
                    open_link = Some(links.len() - 1);
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title: link_title,
                    id,
                })
            }
            Event::End(TagEnd::Link) => {
                open_link = None;
                event
            }
            Event::Text(ref text) | Event::Code(ref text) => {
                if capturing_title {
                    if let Some(t) = title.as_mut() {
                        t.push_str(text);
                    }
                }
                if let Some((_, link)) = open_link.and_then(|i| links.get_mut(i)) {
                    link.text.push_str(text);
                }
                event
            }
            other => other,
        };
        events.push(event);
    }

    let mut html = String::new();
    md_html::push_html(&mut html, events.into_iter());

    links.sort_by_key(|(offset, _)| *offset);

    RenderedPage {
        path: page_path.to_string(),
        url: url_for(page_path),
        source_file: source_file.to_path_buf(),
        title: title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        html,
        links: links.into_iter().map(|(_, link)| link).collect(),
    }
}

/// Replace wikilink tokens with anchors and record where each came from.
fn expand_wikilinks(source: &str, page_path: &str, links: &mut Vec<(usize, PageLink)>) -> String {
    let mut out = String::with_capacity(source.len());
    let mut last = 0;
    for link in links::parse_wikilinks(source) {
        let url = links::resolve_target(&link.target, page_path);
        out.push_str(&source[last..link.span.start]);
        let offset = out.len();
        out.push_str(&html! { a class="wikilink" href=(url) { (link.text()) } }.into_string());
        links.push((
            offset,
            PageLink {
                url,
                text: link.text().to_string(),
                original: source[link.span.clone()].to_string(),
                line: link.line,
            },
        ));
        last = link.span.end;
    }
    out.push_str(&source[last..]);
    out
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}
