//! `Link` header pagination, as served by the hub's listing endpoints.

use reqwest::header::{HeaderMap, LINK};

/// URL of the next page from a `Link` header carrying `rel="next"`.
///
/// Both `rel="next"` and `rel='next'` are accepted. A missing or malformed
/// header, or one that only names other relations, yields `None`.
pub fn next_page_url(headers: &HeaderMap) -> Option<String> {
    parse_link_header(headers.get(LINK)?.to_str().ok()?)
}

fn parse_link_header(value: &str) -> Option<String> {
    for part in value.split(',') {
        let mut sections = part.split(';');
        let target = sections.next().map(str::trim).unwrap_or_default();
        let Some(url) = target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
        else {
            continue;
        };
        for param in sections {
            if matches!(param.trim(), "rel=\"next\"" | "rel='next'" | "rel=next") {
                return Some(url.to_owned());
            }
        }
    }
    None
}
