//! HTML helpers shared by the site fetchers.

use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{HarvestError, Result};

/// Block tags most article bodies are made of.
pub const CONTENT_TAGS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol"];

/// [`CONTENT_TAGS`] plus `div`, for layouts that nest paragraphs in divs.
pub const CONTENT_TAGS_WITH_DIV: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "div"];

const STRUCTURED_BLOCKS: &[&str] = &["div", "p", "h1", "h2", "h3", "h4", "h5", "h6", "br"];

/// Compile a CSS selector, reporting bad selectors as parse errors.
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HarvestError::parse(format!("bad selector {css:?}: {e:?}")))
}

/// First element matching `css`.
pub fn select_first<'a>(doc: &'a Html, css: &str) -> Result<Option<ElementRef<'a>>> {
    Ok(doc.select(&selector(css)?).next())
}

/// First element matching `css` below `el`.
pub fn select_first_in<'a>(el: ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>> {
    Ok(el.select(&selector(css)?).next())
}

/// Whitespace-collapsed text of an element.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first `css` match, if present and non-blank.
pub fn select_text(doc: &Html, css: &str) -> Result<Option<String>> {
    Ok(select_first(doc, css)?
        .map(text_of)
        .filter(|t| !t.is_empty()))
}

/// Like [`select_text`], but a missing element is a parse error.
pub fn require_text(doc: &Html, css: &str) -> Result<String> {
    select_text(doc, css)?.ok_or_else(|| HarvestError::parse(format!("no element matches {css:?}")))
}

/// Texts of every `css` match, blanks dropped.
pub fn select_all_text(doc: &Html, css: &str) -> Result<Vec<String>> {
    Ok(doc
        .select(&selector(css)?)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect())
}

/// `content` of `<meta {attr}="{value}">`.
pub fn meta_content(doc: &Html, attr: &str, value: &str) -> Result<Option<String>> {
    Ok(select_first(doc, &format!("meta[{attr}=\"{value}\"]"))?
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty()))
}

/// The document `<title>`.
pub fn page_title(doc: &Html) -> Result<Option<String>> {
    select_text(doc, "title")
}

/// Join non-blank items with ", "; `None` when nothing is left.
pub fn join_names<I, S>(items: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let names: Vec<String> = items
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!names.is_empty()).then(|| names.join(", "))
}

/// Convert an HTML fragment to Markdown.
pub fn html_to_markdown(html: &str) -> Result<String> {
    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg", "button"])
        .build();
    converter
        .convert(html)
        .map(|md| md.trim().to_string())
        .map_err(|e| HarvestError::parse(format!("markdown conversion failed: {e}")))
}

/// Markdown of every `tags` element inside `container`, joined by `separator`.
///
/// An element nested inside another collected element is skipped so its text
/// is not emitted twice.
pub fn blocks_to_markdown(container: ElementRef<'_>, tags: &[&str], separator: &str) -> Result<String> {
    let mut blocks = Vec::new();
    for node in container.descendants().skip(1) {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        if !tags.contains(&el.value().name()) {
            continue;
        }
        let nested = el
            .ancestors()
            .take_while(|a| a.id() != container.id())
            .filter_map(ElementRef::wrap)
            .any(|a| tags.contains(&a.value().name()));
        if nested {
            continue;
        }
        let md = html_to_markdown(&el.html())?;
        if !md.is_empty() {
            blocks.push(md);
        }
    }
    Ok(sanitize_mojibake(&blocks.join(separator)))
}

/// Plain text of `container` with links kept as `[text](href)` and one blank
/// line between blocks.
pub fn structured_text(container: ElementRef<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();
    walk_structured(container, &mut parts);
    parts
        .concat()
        .trim()
        .split('\n')
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn walk_structured(node: ElementRef<'_>, parts: &mut Vec<String>) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => {
                let stripped = text.trim();
                if !stripped.is_empty() {
                    parts.push(format!("{stripped} "));
                }
            }
            Node::Element(el) => match el.name() {
                "script" | "style" => {}
                "a" => {
                    let href = el.attr("href").unwrap_or_default();
                    if !href.is_empty() {
                        let label: String = ElementRef::wrap(child)
                            .map(|a| a.text().map(str::trim).collect())
                            .unwrap_or_default();
                        parts.push(format!("[{label}]({href})"));
                    }
                }
                name if STRUCTURED_BLOCKS.contains(&name) => {
                    if parts.last().is_some_and(|p| p != "\n") {
                        parts.push("\n".to_string());
                    }
                    if let Some(block) = ElementRef::wrap(child) {
                        walk_structured(block, parts);
                    }
                    if name != "div" {
                        parts.push("\n".to_string());
                    }
                }
                _ => {
                    if let Some(inner) = ElementRef::wrap(child) {
                        walk_structured(inner, parts);
                    }
                }
            },
            _ => {}
        }
    }
}

/// Repair UTF-8 text that was decoded as Windows-1252 somewhere upstream.
pub fn sanitize_mojibake(text: &str) -> String {
    const TABLE: &[(&str, &str)] = &[
        ("â€™", "'"),
        ("â€˜", "'"),
        ("â€œ", "\""),
        ("â€\u{9d}", "\""),
        ("â€”", "—"),
        ("â€“", "–"),
        ("â€¦", "…"),
        ("Â\u{a0}", " "),
        ("Â ", " "),
    ];
    TABLE
        .iter()
        .fold(text.to_string(), |acc, (bad, good)| acc.replace(bad, good))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_helpers() {
        let doc = Html::parse_document(
            r#"<html><head><title> A  Title </title>
            <meta property="article:published_time" content="2023-02-01T10:00:00Z"></head>
            <body><h1>  Hello
            world </h1><span class="a">x</span><span class="a"> </span><span class="a">y</span></body></html>"#,
        );
        assert_eq!(page_title(&doc).unwrap().as_deref(), Some("A Title"));
        assert_eq!(require_text(&doc, "h1").unwrap(), "Hello world");
        assert!(require_text(&doc, "h2").is_err());
        assert_eq!(select_all_text(&doc, "span.a").unwrap(), vec!["x", "y"]);
        assert_eq!(
            meta_content(&doc, "property", "article:published_time").unwrap().as_deref(),
            Some("2023-02-01T10:00:00Z")
        );
        assert!(selector("div[").is_err());
    }

    #[test]
    fn test_join_names() {
        assert_eq!(join_names(["Ada", " ", "Grace "]).as_deref(), Some("Ada, Grace"));
        assert_eq!(join_names(Vec::<String>::new()), None);
    }

    #[test]
    fn test_blocks_to_markdown_skips_nested_blocks() {
        let doc = Html::parse_document(
            r#"<div id="c"><h2>Intro</h2><p>Some <b>bold</b> text.</p>
            <ul><li><p>nested</p></li></ul><script>ignored()</script></div>"#,
        );
        let container = select_first(&doc, "#c").unwrap().unwrap();
        let md = blocks_to_markdown(container, CONTENT_TAGS, "\n\n").unwrap();
        assert!(md.starts_with("## Intro"));
        assert!(md.contains("Some **bold** text."));
        assert_eq!(md.matches("nested").count(), 1);
        assert!(!md.contains("ignored"));
    }

    #[test]
    fn test_structured_text_keeps_links_and_blocks() {
        let doc = Html::parse_document(
            r#"<div id="doc"><h1>Title</h1><p>First <a href="https://x.org">link</a> here</p>
            <div><p>Second</p></div></div>"#,
        );
        let container = select_first(&doc, "#doc").unwrap().unwrap();
        let text = structured_text(container);
        assert_eq!(text, "Title\n\nFirst [link](https://x.org)here\n\nSecond");
    }

    #[test]
    fn test_sanitize_mojibake() {
        assert_eq!(sanitize_mojibake("itâ€™s"), "it's");
        assert_eq!(sanitize_mojibake("â€œquotedâ€\u{9d}"), "\"quoted\"");
        assert_eq!(sanitize_mojibake("plain"), "plain");
    }
}
