//! Readability-style article extraction.
//!
//! Paragraphs vote for their parent and grandparent containers; the container
//! with the best link-adjusted score, joined by close-scoring siblings, is
//! rendered as plain text. Everything here
//! is synchronous: `scraper::Html` is not `Send` and must never be held across
//! an await point.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::ScrapedPage;

/// Subtrees that never contribute article text.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "noscript", "svg", "iframe",
    "template", "button", "select",
];

/// Subtrees dropped even from the whole-body fallback.
const RAW_TAGS: &[&str] = &["script", "style", "noscript", "template"];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "br", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "tr", "td", "th",
    "table", "article", "section", "main", "blockquote", "pre", "figcaption", "dt", "dd",
];

/// Tags that are never discarded on class/id hints alone.
const STRUCTURAL_TAGS: &[&str] = &["html", "body", "article", "main"];

const MIN_PARAGRAPH_CHARS: usize = 25;
const MIN_EXCERPT_CHARS: usize = 80;
const MAX_BYLINE_CHARS: usize = 100;
const HINT_WEIGHT: f64 = 25.0;
/// Siblings of the top container scoring at least this share of it are kept.
const SIBLING_SCORE_RATIO: f64 = 0.2;

static POSITIVE_HINT: OnceLock<Option<Regex>> = OnceLock::new();
static NEGATIVE_HINT: OnceLock<Option<Regex>> = OnceLock::new();

fn positive_hint() -> Option<&'static Regex> {
    POSITIVE_HINT
        .get_or_init(|| {
            Regex::new(r"(?i)article|body|content|entry|hentry|main|page|post|story|text|blog")
                .ok()
        })
        .as_ref()
}

fn negative_hint() -> Option<&'static Regex> {
    NEGATIVE_HINT
        .get_or_init(|| {
            Regex::new(
                r"(?i)\bads?\b|-ad-|banner|combx|comment|contact|footer|footnote|masthead|nav|outbrain|promo|related|share|shoutbox|sidebar|skyscraper|sponsor|shopping|widget",
            )
            .ok()
        })
        .as_ref()
}

/// Extract readable content from `html` fetched from `url`.
pub fn extract_article(html: &str, url: &str) -> ScrapedPage {
    let document = Html::parse_document(html);

    let title = meta_content(&document, r#"meta[property="og:title"]"#)
        .or_else(|| first_text(&document, "title"))
        .or_else(|| first_text(&document, "h1"))
        .unwrap_or_else(|| url.to_string());

    let byline = meta_content(&document, r#"meta[name="author"]"#)
        .or_else(|| first_text(&document, r#"[rel="author"]"#))
        .or_else(|| first_text(&document, ".byline, .author"))
        .filter(|b| b.chars().count() <= MAX_BYLINE_CHARS);

    let mut containers = top_candidates(&document);
    if containers.is_empty() {
        containers.extend(
            ["article", "main", r#"[role="main"]"#, "body"]
                .iter()
                .find_map(|css| select_first(&document, css)),
        );
    }

    let mut text = containers
        .iter()
        .map(|el| render_text(*el, true))
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if text.is_empty() {
        text = select_first(&document, "body")
            .map(|body| render_text(body, false))
            .unwrap_or_default();
    }

    let excerpt = meta_content(&document, r#"meta[name="description"]"#)
        .or_else(|| meta_content(&document, r#"meta[property="og:description"]"#))
        .or_else(|| containers.iter().copied().find_map(first_substantial_paragraph));

    ScrapedPage::new(url, title, byline, excerpt, text)
}

/// Pick the best scoring container plus sibling containers scoring close to
/// it, in document order. Empty when no paragraph qualified.
///
/// Candidates are kept in first-vote order so equal scores resolve to the
/// earlier node.
fn top_candidates<'a>(document: &'a Html) -> Vec<ElementRef<'a>> {
    let Ok(paragraphs) = Selector::parse("p, pre, td, blockquote") else {
        return Vec::new();
    };
    let mut candidates: Vec<(ElementRef<'a>, f64)> = Vec::new();
    let mut index = HashMap::new();

    for paragraph in document.select(&paragraphs) {
        if in_skipped_subtree(&paragraph) {
            continue;
        }

        let text = collapse_inline(&paragraph.text().collect::<String>());
        let chars = text.chars().count();
        if chars < MIN_PARAGRAPH_CHARS {
            continue;
        }

        let commas = text.matches(',').count() as f64;
        let score = 1.0 + commas + (chars / 100).min(3) as f64;

        let ancestors = paragraph.ancestors().filter_map(ElementRef::wrap).take(2);
        for (level, ancestor) in ancestors.enumerate() {
            let slot = *index.entry(ancestor.id()).or_insert_with(|| {
                candidates.push((ancestor, initial_score(&ancestor)));
                candidates.len() - 1
            });
            candidates[slot].1 += if level == 0 { score } else { score / 2.0 };
        }
    }

    for (el, score) in candidates.iter_mut() {
        *score *= 1.0 - link_density(el);
    }

    let mut best: Option<(ElementRef<'a>, f64)> = None;
    for &(el, score) in &candidates {
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((el, score));
        }
    }
    let Some((top, top_score)) = best else {
        return Vec::new();
    };
    let Some(parent) = top.parent() else {
        return vec![top];
    };

    let threshold = top_score * SIBLING_SCORE_RATIO;
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|sibling| {
            sibling.id() == top.id()
                || index.get(&sibling.id()).is_some_and(|&slot| {
                    let score = candidates[slot].1;
                    score > 0.0 && score >= threshold
                })
        })
        .collect()
}

fn initial_score(el: &ElementRef<'_>) -> f64 {
    let tag_score = match el.value().name() {
        "article" | "main" => 10.0,
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    tag_score + class_weight(el)
}

/// Class/id hint weight: positive for content-like names, negative for chrome.
fn class_weight(el: &ElementRef<'_>) -> f64 {
    let mut weight = 0.0;
    for value in [el.value().attr("class"), el.value().attr("id")]
        .into_iter()
        .flatten()
    {
        if negative_hint().is_some_and(|re| re.is_match(value)) {
            weight -= HINT_WEIGHT;
        }
        if positive_hint().is_some_and(|re| re.is_match(value)) {
            weight += HINT_WEIGHT;
        }
    }
    weight
}

/// Page chrome by name: negative hints with nothing positive to offset them.
fn is_unlikely(el: &ElementRef<'_>) -> bool {
    if STRUCTURAL_TAGS.contains(&el.value().name()) {
        return false;
    }
    let hinted = |re: Option<&'static Regex>| {
        [el.value().attr("class"), el.value().attr("id")]
            .into_iter()
            .flatten()
            .any(|value| re.is_some_and(|re| re.is_match(value)))
    };
    hinted(negative_hint()) && !hinted(positive_hint())
}

fn in_skipped_subtree(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| SKIP_TAGS.contains(&a.value().name()) || is_unlikely(&a))
}

fn link_density(el: &ElementRef<'_>) -> f64 {
    let total = el.text().map(|t| t.trim().chars().count()).sum::<usize>();
    if total == 0 {
        return 0.0;
    }
    let Ok(links) = Selector::parse("a") else {
        return 0.0;
    };
    let linked = el
        .select(&links)
        .flat_map(|a| a.text())
        .map(|t| t.trim().chars().count())
        .sum::<usize>();
    (linked as f64 / total as f64).min(1.0)
}

/// Render an element as plain text, one line per block.
///
/// `strict` drops page chrome (navigation, forms, hinted sidebars); otherwise
/// only raw code and style subtrees are dropped.
fn render_text(el: ElementRef<'_>, strict: bool) -> String {
    let mut buf = String::new();
    collect_text(el, &mut buf, strict);
    normalize_whitespace(&buf)
}

fn collect_text(el: ElementRef<'_>, buf: &mut String, strict: bool) {
    for child in el.children() {
        match child.value() {
            // Source line breaks are not structure; only blocks start lines
            Node::Text(text) => {
                buf.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }))
            }
            Node::Element(element) => {
                let tag = element.name();
                let skipped = if strict {
                    SKIP_TAGS.contains(&tag)
                } else {
                    RAW_TAGS.contains(&tag)
                };
                if skipped {
                    continue;
                }
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if strict && is_unlikely(&child_el) {
                    continue;
                }

                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    buf.push('\n');
                }
                collect_text(child_el, buf, strict);
                if block {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse runs of whitespace within lines and drop blank lines.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(collapse_inline)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_inline(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_substantial_paragraph(container: ElementRef<'_>) -> Option<String> {
    let paragraphs = Selector::parse("p").ok()?;
    container
        .select(&paragraphs)
        .filter(|p| !in_skipped_subtree(p))
        .map(|p| collapse_inline(&p.text().collect::<String>()))
        .find(|text| text.chars().count() >= MIN_EXCERPT_CHARS)
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let text = collapse_inline(&select_first(document, css)?.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

fn meta_content(document: &Html, css: &str) -> Option<String> {
    let content = select_first(document, css)?.value().attr("content")?;
    let content = collapse_inline(content);
    (!content.is_empty()).then_some(content)
}
