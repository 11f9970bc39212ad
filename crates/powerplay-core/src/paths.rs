//! Path and URL conventions.
//!
//! Pure functions mapping subjects, navigation states and videos to the
//! documents, fragments and external URLs they live at.

// ---------------------------------------------------------------------------
// Catalog documents
// ---------------------------------------------------------------------------

/// Candidate catalog documents for a subject, in the order they are tried.
pub fn catalog_candidates(subject: &str) -> [String; 2] {
    let file = subject.to_lowercase();
    [format!("subjects/{}.html", file), format!("{}.html", file)]
}

// ---------------------------------------------------------------------------
// External video host
// ---------------------------------------------------------------------------

pub const EMBED_PARAMS: &str = "?autoplay=1&rel=0&modestbranding=1&iv_load_policy=3&fs=1";

pub fn thumbnail_url(id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", id)
}

pub fn embed_url(id: &str) -> String {
    format!("https://www.youtube.com/embed/{}{}", id, EMBED_PARAMS)
}

/// Pull a video id out of a watch or short link.
///
/// `"https://www.youtube.com/watch?v=abc&t=1"` → `Some("abc")`,
/// `"https://youtu.be/abc?si=x"` → `Some("abc")`.
pub fn youtube_id(href: &str) -> Option<&str> {
    let tail = if let Some(pos) = href.find("v=") {
        &href[pos + 2..]
    } else if let Some(pos) = href.find("youtu.be/") {
        &href[pos + "youtu.be/".len()..]
    } else {
        return None;
    };
    let end = tail
        .find(|c: char| c == '&' || c == '?' || c == '#' || c.is_whitespace())
        .unwrap_or(tail.len());
    let id = &tail[..end];
    if id.is_empty() { None } else { Some(id) }
}

/// Hosts the offline cache never stores.
pub const PASSTHROUGH_HOSTS: &[&str] = &["youtube.com", "ytimg.com", "googleapis.com", "gstatic.com"];

/// Check if a path looks like an HTTP URL.
pub fn is_http_url(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Host part of an absolute URL, `None` for relative paths.
pub fn url_host(url: &str) -> Option<&str> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.rsplit('@').next()?;
    Some(host.split(':').next().unwrap_or(host))
}

// ---------------------------------------------------------------------------
// History fragments
// ---------------------------------------------------------------------------

pub const HOME_FRAGMENT: &str = "#home";
pub const PLAYER_FRAGMENT: &str = "#player";

pub fn papers_fragment(subject: &str) -> String {
    format!("#{}", encode_component(subject))
}

pub fn chapters_fragment(subject: &str, paper: &str) -> String {
    format!("#{}-{}", encode_component(subject), encode_component(paper))
}

/// Percent-encode everything except the `encodeURIComponent` safe set.
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
