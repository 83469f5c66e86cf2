// File: ./src/render.rs
// Card text -> sanitized HTML fragment
use crate::client::Resolver;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// How many reference lookups may be in flight for one card.
const LOOKUP_WIDTH: usize = 4;

/// Everything else is stripped, not escaped.
const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "b", "em", "i", "u", "s", "del", "code", "pre", "a", "ul", "ol", "li",
    "blockquote", "h1", "h2", "h3", "h4", "h5", "h6",
];

const ALLOWED_LINK_ATTRS: &[&str] = &["href", "title", "target", "rel"];

pub struct Renderer {
    resolver: Arc<dyn Resolver>,
    link_base: String,
}

impl Renderer {
    pub fn new(resolver: Arc<dyn Resolver>, link_base_url: &str) -> Self {
        Self {
            resolver,
            link_base: link_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Always returns a displayable fragment. The pipeline is
    /// substitution -> markdown -> sanitize -> link hardening; if any of the
    /// sync stages panic the card degrades to its text, escaped.
    pub async fn render(&self, raw: &str) -> String {
        let substituted = self.substitute_references(raw).await;
        let rendered = catch_unwind(AssertUnwindSafe(|| {
            harden_links(&sanitize(&markdown_to_html(&substituted)))
        }));
        match rendered {
            Ok(html) => html,
            Err(_) => {
                tracing::warn!("card pipeline panicked, falling back to escaped text");
                ammonia::clean_text(raw)
            }
        }
    }

    /// Replace every `[[Name]]` with a markdown link to the resolved
    /// document, or with `*Name*` when the lookup comes back empty.
    async fn substitute_references(&self, text: &str) -> String {
        let tokens = scan_references(text);
        if tokens.is_empty() {
            return text.to_string();
        }

        // Lookups are independent; run a few at a time but keep source order.
        let resolved: Vec<Option<String>> = stream::iter(&tokens)
            .map(|token| self.resolver.resolve(&token.name))
            .buffered(LOOKUP_WIDTH)
            .collect()
            .await;

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (token, path) in tokens.iter().zip(resolved) {
            out.push_str(&text[cursor..token.start]);
            match path {
                Some(path) => {
                    out.push_str(&format!(
                        "[{}]({}/{})",
                        token.name,
                        self.link_base,
                        encode_path(&path)
                    ));
                }
                None => out.push_str(&format!("*{}*", token.name)),
            }
            cursor = token.end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}

struct RefToken {
    start: usize,
    end: usize,
    name: String,
}

fn scan_references(text: &str) -> Vec<RefToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while let Some(open) = text[i..].find("[[") {
        let start = i + open;
        let Some(close) = text[start + 2..].find("]]") else {
            break;
        };
        let end = start + 2 + close + 2;
        let name = text[start + 2..end - 2].trim();
        if name.is_empty() || name.contains('[') || name.contains(']') {
            i = start + 2;
            continue;
        }
        tokens.push(RefToken {
            start,
            end,
            name: name.to_string(),
        });
        i = end;
    }
    tokens
}

/// Form-style encoding (space becomes `+`), one path segment at a time so
/// the separating slashes survive.
fn encode_path(path: &str) -> String {
    path.trim_start_matches('/')
        .split('/')
        .map(|segment| form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("/")
}

fn markdown_to_html(markdown: &str) -> String {
    let mut options = comrak::Options::default();
    options.extension.strikethrough = true;
    options.extension.underline = true;
    options.render.hardbreaks = true;
    // Raw HTML flows through here; the sanitizer is the gate.
    options.render.r#unsafe = true;
    comrak::markdown_to_html(markdown, &options)
}

fn sanitize(html: &str) -> String {
    ammonia::Builder::new()
        .tags(ALLOWED_TAGS.iter().copied().collect::<HashSet<_>>())
        .tag_attributes(HashMap::from([(
            "a",
            ALLOWED_LINK_ATTRS.iter().copied().collect::<HashSet<_>>(),
        )]))
        .url_schemes(HashSet::from(["http", "https", "mailto"]))
        .link_rel(None)
        .clean(html)
        .to_string()
}

/// Force `rel="noopener noreferrer"` and `target="_blank"` onto every
/// http(s) anchor, overwriting whatever the author supplied. Other schemes
/// (mailto) keep the attributes sanitization let through.
fn harden_links(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(pos) = rest.find("<a") {
        let after = &rest[pos + 2..];
        let is_anchor = after.starts_with('>') || after.starts_with(|c: char| c.is_whitespace());
        if !is_anchor {
            out.push_str(&rest[..pos + 2]);
            rest = after;
            continue;
        }
        let Some(end) = tag_end(after) else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..pos]);
        out.push_str(&rewrite_anchor(&after[..end]));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Position of the tag-closing `>`, skipping any inside quoted values.
fn tag_end(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '>' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

fn rewrite_anchor(attrs: &str) -> String {
    let mut pairs = parse_attributes(attrs);
    let external = pairs
        .iter()
        .any(|(k, v)| k == "href" && (v.starts_with("http://") || v.starts_with("https://")));
    if external {
        pairs.retain(|(k, _)| k != "rel" && k != "target");
        pairs.push(("rel".to_string(), "noopener noreferrer".to_string()));
        pairs.push(("target".to_string(), "_blank".to_string()));
    }

    let mut tag = String::from("<a");
    for (name, value) in &pairs {
        tag.push(' ');
        tag.push_str(name);
        tag.push_str("=\"");
        tag.push_str(value);
        tag.push('"');
    }
    tag.push('>');
    tag
}

/// The sanitizer serializes attributes as lowercase `name="value"` pairs
/// with quotes escaped inside values, which is all this needs to handle.
fn parse_attributes(mut s: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    loop {
        s = s.trim_start();
        if s.is_empty() {
            break;
        }
        let name_end = s
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(s.len());
        if name_end == 0 {
            // stray `=`; never produced by the sanitizer, but don't spin on it
            s = &s[1..];
            continue;
        }
        let name = &s[..name_end];
        s = &s[name_end..];
        let mut value = String::new();
        if let Some(quoted) = s.strip_prefix("=\"") {
            match quoted.find('"') {
                Some(q) => {
                    value = quoted[..q].to_string();
                    s = &quoted[q + 1..];
                }
                None => {
                    value = quoted.to_string();
                    s = "";
                }
            }
        }
        if !name.is_empty() {
            pairs.push((name.to_lowercase(), value));
        }
    }
    pairs
}
