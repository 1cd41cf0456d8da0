#![forbid(unsafe_code)]

//! Entity escaping shared by canonical output and the fragment writer.
//!
//! - Text nodes: `&` → `&amp;`, `<` → `&lt;`, `>` → `&gt;`, `\r` → `&#xD;`
//! - Attribute values: `&`, `<`, `"`, plus `\t` → `&#x9;`, `\n` → `&#xA;`, `\r` → `&#xD;`
//! - PI data: `\r` → `&#xD;`
//!
//! Writing attribute whitespace as character references keeps values intact
//! through attribute-value normalization on re-parse.

/// Escape text node content.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape processing instruction data.
pub fn escape_pi(s: &str) -> String {
    s.replace('\r', "&#xD;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("Caf\u{e9} & t\u{e9}"), "Caf\u{e9} &amp; t\u{e9}");
        assert_eq!(escape_text("1 < 2 > 0"), "1 &lt; 2 &gt; 0");
        assert_eq!(escape_text("line\rend"), "line&#xD;end");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("#xmldsig-abc-keyinfo"), "#xmldsig-abc-keyinfo");
        assert_eq!(escape_attr("a&b\"c<d"), "a&amp;b&quot;c&lt;d");
        assert_eq!(escape_attr("a\tb\nc\rd"), "a&#x9;b&#xA;c&#xD;d");
    }

    #[test]
    fn test_escape_pi() {
        assert_eq!(escape_pi("a\r\nb"), "a&#xD;\nb");
    }
}
