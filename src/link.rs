//! `Link` and `Location` response header extraction.
//!
//! See [RFC 8288 §3](https://datatracker.ietf.org/doc/html/rfc8288#section-3).

use std::collections::HashMap;

/// Link relations keyed by `rel` value.
pub type Links = HashMap<String, String>;

/// Parses a `Link` header value into a relation → URI map.
///
/// Only quoted attribute values are recognised and only `rel` is kept. When several segments
/// share a `rel`, the last one wins. An absent or malformed header yields no links.
pub fn parse_links(header: Option<&str>) -> Links {
    let Some(header) = header else {
        return Links::new();
    };

    let mut links = Links::new();

    for segment in split_outside(header, ',') {
        let segment = segment.trim();

        if segment.is_empty() {
            continue;
        }

        let Some((uri, attrs)) = parse_segment(segment) else {
            log::debug!("Ignoring malformed Link header: {header}");
            return Links::new();
        };

        if let Some(rel) = attrs
            .into_iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case("rel"))
            .map(|(_, value)| value)
            .last()
        {
            links.insert(rel.to_owned(), uri.to_owned());
        }
    }

    links
}

/// Returns the `Location` header value unchanged.
pub fn extract_location(header: Option<&str>) -> Option<String> {
    header.map(str::to_owned)
}

/// `<uri>; key="value"; ...`
fn parse_segment(segment: &str) -> Option<(&str, Vec<(&str, &str)>)> {
    let rest = segment.strip_prefix('<')?;
    let (uri, rest) = rest.split_once('>')?;

    let mut attrs = Vec::new();

    for param in split_outside(rest, ';') {
        let param = param.trim();

        if param.is_empty() {
            continue;
        }

        let Some((key, value)) = param.split_once('=') else {
            continue;
        };

        // unquoted values are skipped
        let value = value.trim();
        if let Some(value) = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
        {
            attrs.push((key.trim(), value));
        }
    }

    Some((uri.trim(), attrs))
}

/// Splits on `sep` where it is not inside `<...>` or a quoted string.
fn split_outside(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut in_brackets = false;

    for (idx, c) in input.char_indices() {
        match c {
            '"' if !in_brackets => in_quotes = !in_quotes,
            '<' if !in_quotes => in_brackets = true,
            '>' if !in_quotes => in_brackets = false,
            c if c == sep && !in_quotes && !in_brackets => {
                parts.push(&input[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }

    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_links() {
        let links = parse_links(Some(
            r#"<https://ca.test/acme/new-authz>;rel="next", <https://ca.test/terms>; rel="terms-of-service""#,
        ));

        assert_eq!(links.len(), 2);
        assert_eq!(links["next"], "https://ca.test/acme/new-authz");
        assert_eq!(links["terms-of-service"], "https://ca.test/terms");
    }

    #[test]
    fn test_parse_links_last_wins() {
        let links = parse_links(Some(r#"<a>; rel="x", <b>; rel="x""#));
        assert_eq!(links.len(), 1);
        assert_eq!(links["x"], "b");
    }

    #[test]
    fn test_parse_links_quoted_separators() {
        let links = parse_links(Some(
            r#"<https://ca.test/a?x=1,2>; title="a, b; c"; rel="up""#,
        ));
        assert_eq!(links["up"], "https://ca.test/a?x=1,2");
    }

    #[test]
    fn test_parse_links_ignores_unquoted_and_relless() {
        let links = parse_links(Some(r#"<a>; rel=next, <b>; title="b", <c>; rel="c""#));
        assert_eq!(links.len(), 1);
        assert_eq!(links["c"], "c");
    }

    #[test]
    fn test_parse_links_malformed() {
        assert!(parse_links(None).is_empty());
        assert!(parse_links(Some("")).is_empty());
        assert!(parse_links(Some(r#"https://ca.test; rel="next""#)).is_empty());
        assert!(parse_links(Some(r#"<a>; rel="x", garbage"#)).is_empty());
        assert!(parse_links(Some(r#"<unterminated; rel="x""#)).is_empty());
    }

    #[test]
    fn test_extract_location() {
        assert_eq!(
            extract_location(Some("https://ca.test/acme/reg/1")).as_deref(),
            Some("https://ca.test/acme/reg/1")
        );
        assert_eq!(extract_location(None), None);
    }
}
