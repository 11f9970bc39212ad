//! Catalog document parsing.
//!
//! Subject files are HTML pages that carry their video mapping in one of
//! several shapes. The content is inspected structurally and decoded as
//! data; scripts are never run.
//!
//! Inspection order:
//! 1. a bare JSON document
//! 2. the first `<script>` assigning a `VIDEOS` object literal
//! 3. the first `<pre>`/`<code>` block holding JSON
//! 4. a generated `<h2>`/`<h3>`/`<a href=watch?v=…>` listing

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::models::{Catalog, PaperEntry, Video};
use crate::paths;

static SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("valid script regex"));
static PREFORMATTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<pre\b[^>]*>(.*?)</pre\s*>|<code\b[^>]*>(.*?)</code\s*>").expect("valid pre regex")
});
static VIDEOS_ASSIGN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bVIDEOS\s*=\s*\{").expect("valid assignment regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("valid entity regex"));
static LISTING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<h2\b[^>]*>(.*?)</h2\s*>|<h3\b[^>]*>(.*?)</h3\s*>|<a\b[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#,
    )
    .expect("valid listing regex")
});
static CHAPTER_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^chapter\s+(\d+)").expect("valid chapter regex"));

/// Decode a fetched subject document into a catalog.
pub fn parse_document(doc: &str) -> Option<Catalog> {
    parse_bare_json(doc)
        .or_else(|| parse_scripts(doc))
        .or_else(|| parse_preformatted(doc))
        .or_else(|| parse_listing(doc))
}

fn parse_bare_json(doc: &str) -> Option<Catalog> {
    let trimmed = doc.trim_start_matches('\u{feff}').trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    parse_json_mapping(trimmed, "document body")
}

fn parse_json_mapping(text: &str, origin: &str) -> Option<Catalog> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => Catalog::from_value(&value),
        Err(e) => {
            log::warn!("powerplay: {} is not valid JSON: {}", origin, e);
            None
        }
    }
}

// ---------------------------------------------------------------------------
// <script> assignments
// ---------------------------------------------------------------------------

fn parse_scripts(doc: &str) -> Option<Catalog> {
    for caps in SCRIPT.captures_iter(doc) {
        let body = caps.get(1).map_or("", |m| m.as_str());
        let Some(literal) = assigned_literal(body) else {
            continue;
        };
        return parse_json_mapping(&js_literal_to_json(literal), "VIDEOS literal");
    }
    None
}

/// The object literal on the right of the first `VIDEOS = {` in `script`.
fn assigned_literal(script: &str) -> Option<&str> {
    let m = VIDEOS_ASSIGN.find(script)?;
    balanced_literal(script, m.end() - 1)
}

/// Slice from the bracket at `open` through its matching close, skipping
/// strings and comments.
fn balanced_literal(src: &str, open: usize) -> Option<&str> {
    let bytes = src.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = src[i + 2..].find("*/")?;
                i += end + 4;
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&src[open..=i]);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Rewrite a JavaScript object literal as JSON.
///
/// Handles the shapes hand-edited data files use: comments, bare keys,
/// single-quoted and template strings without interpolation, trailing
/// commas.
pub(crate) fn js_literal_to_json(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let mut out = String::with_capacity(src.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' | '`' => i = copy_string(&chars, i, &mut out),
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
            }
            '}' | ']' => {
                drop_trailing_comma(&mut out);
                out.push(c);
                i += 1;
            }
            c if is_ident_start(c) && !out.ends_with(|p: char| p.is_ascii_digit() || p == '.') => {
                let start = i;
                while i < chars.len() && is_ident_part(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "true" | "false" | "null" => out.push_str(&word),
                    _ => {
                        out.push('"');
                        out.push_str(&word);
                        out.push('"');
                    }
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Copy the string literal starting at `start` as a JSON string. Returns
/// the index just past the closing quote.
fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    out.push('"');
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            match chars.get(i + 1) {
                Some('\'') => out.push('\''),
                Some('`') => out.push('`'),
                Some(&next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => {}
            }
            i += 2;
            continue;
        }
        if c == quote {
            i += 1;
            break;
        }
        match c {
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
        i += 1;
    }
    out.push('"');
    i
}

fn drop_trailing_comma(out: &mut String) {
    let len = out.trim_end().len();
    if out[..len].ends_with(',') {
        out.truncate(len - 1);
    }
}

// ---------------------------------------------------------------------------
// <pre>/<code> blocks
// ---------------------------------------------------------------------------

fn parse_preformatted(doc: &str) -> Option<Catalog> {
    let caps = PREFORMATTED.captures(doc)?;
    let inner = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let text = decode_entities(&TAG.replace_all(inner, ""));
    parse_json_mapping(text.trim(), "preformatted block")
}

/// Decode the named and numeric character references subject files use.
pub(crate) fn decode_entities(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "quot" => Some('"'),
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Generated listings
// ---------------------------------------------------------------------------

type Sections = Vec<(Option<String>, Vec<Video>)>;

/// A paper's sections plus the one links currently land in.
struct ListingPaper {
    label: String,
    sections: Sections,
    open: usize,
}

fn parse_listing(doc: &str) -> Option<Catalog> {
    let mut papers: Vec<ListingPaper> = Vec::new();
    let mut current: Option<usize> = None;

    for caps in LISTING.captures_iter(doc) {
        if let Some(h2) = caps.get(1) {
            let label = clean_text(h2.as_str());
            current = Some(match papers.iter().position(|p| p.label == label) {
                Some(idx) => idx,
                None => {
                    papers.push(ListingPaper { label, sections: Vec::new(), open: 0 });
                    papers.len() - 1
                }
            });
        } else if let Some(h3) = caps.get(2) {
            let Some(idx) = current else { continue };
            let label = chapter_label(&clean_text(h3.as_str()));
            let paper = &mut papers[idx];
            // Re-opened headings append in place; key order stays first-seen.
            paper.open = match paper.sections.iter().position(|(c, _)| c.as_deref() == Some(label.as_str())) {
                Some(pos) => pos,
                None => {
                    paper.sections.push((Some(label), Vec::new()));
                    paper.sections.len() - 1
                }
            };
        } else if let (Some(href), Some(text)) = (caps.get(3), caps.get(4)) {
            let Some(idx) = current else {
                log::debug!("powerplay: listing link outside any paper heading");
                continue;
            };
            let href = decode_entities(href.as_str());
            let Some(id) = paths::youtube_id(&href) else { continue };
            let mut video = Video::new(id);
            let title = clean_text(text.as_str());
            if !title.is_empty() {
                video = video.with_title(title);
            }
            let paper = &mut papers[idx];
            if paper.sections.is_empty() {
                paper.sections.push((None, Vec::new()));
                paper.open = 0;
            }
            if let Some((_, videos)) = paper.sections.get_mut(paper.open) {
                videos.push(video);
            }
        }
    }

    let catalog = Catalog::new(papers.into_iter().map(|p| (p.label, into_entry(p.sections))).collect());
    if catalog.video_count() == 0 { None } else { Some(catalog) }
}

fn into_entry(sections: Sections) -> PaperEntry {
    if sections.iter().all(|(label, _)| label.is_none()) {
        return PaperEntry::Flat(sections.into_iter().flat_map(|(_, v)| v).collect());
    }
    let mut chapters: Vec<(String, Vec<Video>)> = Vec::new();
    for (label, videos) in sections {
        let label = label.unwrap_or_else(|| "Misc".into());
        match chapters.iter_mut().find(|(c, _)| *c == label) {
            Some((_, existing)) => existing.extend(videos),
            None => chapters.push((label, videos)),
        }
    }
    PaperEntry::Chapters(chapters)
}

/// `"Chapter 3: Vectors"` → `"Chapter 3"`; anything else unchanged.
fn chapter_label(heading: &str) -> String {
    match CHAPTER_HEADING.captures(heading) {
        Some(caps) => format!("Chapter {}", &caps[1]),
        None => heading.to_string(),
    }
}

fn clean_text(html: &str) -> String {
    let text = decode_entities(&TAG.replace_all(html, ""));
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(c: &Catalog, paper: &str, chapter: Option<&str>) -> Vec<String> {
        c.videos_for(paper, chapter).into_iter().map(|v| v.id).collect()
    }

    #[test]
    fn bare_json_document() {
        let c = parse_document(r#" { "Paper 1": [{"id": "x"}, {"id": "y"}] } "#).unwrap();
        assert_eq!(ids(&c, "Paper 1", None), vec!["x", "y"]);
    }

    #[test]
    fn script_assignment_with_js_syntax() {
        let doc = r#"
            <html><head><script src="theme.js"></script></head><body>
            <script>
              // generated
              window.VIDEOS = {
                'Paper 1': {
                  "Chapter 3": [
                    { id: 'abc', title: 'It\'s "T1"', },
                  ],
                },
                /* flat */ "Paper 2": [{ id: "p2", subtitle: `Lesson 1` }],
              };
            </script></body></html>
        "#;
        let c = parse_document(doc).unwrap();
        let videos = c.videos_for("Paper 1", Some("Chapter 3"));
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "abc");
        assert_eq!(videos[0].title.as_deref(), Some("It's \"T1\""));
        assert_eq!(c.videos_for("Paper 2", None)[0].subtitle.as_deref(), Some("Lesson 1"));
    }

    #[test]
    fn script_braces_inside_strings_do_not_end_literal() {
        let doc = r#"<script>const VIDEOS = {"Paper 1": [{"id": "a", "title": "set {x} }"}]}; console.log(1);</script>"#;
        let c = parse_document(doc).unwrap();
        assert_eq!(c.videos_for("Paper 1", None)[0].list_title(), "set {x} }");
    }

    #[test]
    fn preformatted_block_with_entities() {
        let doc = r#"<body><h1>ICT</h1><pre class="data">{&quot;Paper 1&quot;: [{&quot;id&quot;: &quot;x&quot;, &quot;title&quot;: &quot;A &amp; B&quot;}]}</pre></body>"#;
        let c = parse_document(doc).unwrap();
        let videos = c.videos_for("Paper 1", None);
        assert_eq!(videos[0].title.as_deref(), Some("A & B"));
    }

    #[test]
    fn code_inside_pre_is_unwrapped() {
        let doc = r#"<pre><code>{"Paper 1": [{"id": "q"}]}</code></pre>"#;
        let c = parse_document(doc).unwrap();
        assert_eq!(ids(&c, "Paper 1", None), vec!["q"]);
    }

    #[test]
    fn generated_listing() {
        let doc = r#"
            <!-- AUTO GENERATED START -->
            <li><a href="https://www.youtube.com/watch?v=orphan">Orphan</a></li>
            <h2>Paper 1</h2>
            <h3>Chapter 1: ভৌতজগত ও পরিমাপ</h3>
            <ul>
              <li><a href="https://www.youtube.com/watch?v=aa1" target="_blank">Units &amp; Measures</a></li>
              <li><a href="https://example.com/not-a-video">Elsewhere</a></li>
            </ul>
            <h3>Chapter 2: ভেক্টর</h3>
            <ul><li><a href="https://www.youtube.com/watch?v=bb1">Vectors</a></li></ul>
            <h3>Misc</h3>
            <ul><li><a href="https://youtu.be/mm1">Extra</a></li></ul>
            <h2>Paper 2</h2>
            <ul><li><a href="https://www.youtube.com/watch?v=p2a">Flat</a></li></ul>
            <!-- AUTO GENERATED END -->
        "#;
        let c = parse_document(doc).unwrap();
        assert_eq!(ids(&c, "Paper 1", Some("Chapter 1")), vec!["aa1"]);
        assert_eq!(ids(&c, "Paper 1", Some("Chapter 2")), vec!["bb1"]);
        assert_eq!(ids(&c, "Paper 1", Some("Misc")), vec!["mm1"]);
        assert_eq!(ids(&c, "Paper 2", None), vec!["p2a"]);
        assert!(matches!(c.paper("Paper 2"), Some(PaperEntry::Flat(_))));
        assert_eq!(c.videos_for("Paper 1", Some("Chapter 1"))[0].title.as_deref(), Some("Units & Measures"));
    }

    #[test]
    fn reopened_chapter_keeps_its_position() {
        let doc = r#"
            <h2>Paper 1</h2>
            <h3>Chapter 1</h3>
            <ul><li><a href="https://youtu.be/c1a">A</a></li></ul>
            <h3>Chapter 2</h3>
            <ul><li><a href="https://youtu.be/c2a">B</a></li></ul>
            <h3>Chapter 1</h3>
            <ul><li><a href="https://youtu.be/c1b">C</a></li></ul>
        "#;
        let c = parse_document(doc).unwrap();
        assert_eq!(ids(&c, "Paper 1", Some("Chapter 1")), vec!["c1a", "c1b"]);
        assert_eq!(ids(&c, "Paper 1", None), vec!["c1a", "c1b", "c2a"]);
    }

    #[test]
    fn document_without_catalog_is_rejected() {
        assert!(parse_document("<html><body><p>Coming soon</p></body></html>").is_none());
        assert!(parse_document("<pre>not json</pre>").is_none());
    }

    #[test]
    fn js_literal_handles_numbers_and_keywords() {
        let json = js_literal_to_json("{a: 1.5e3, b: true, c: null, d: [1, 2,],}");
        let v: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["a"], 1500.0);
        assert_eq!(v["b"], true);
        assert!(v["c"].is_null());
        assert_eq!(v["d"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn entities_decode_numeric_forms() {
        assert_eq!(decode_entities("&#65;&#x42;&unknown;"), "AB&unknown;");
    }
}
