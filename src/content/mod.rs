//! Site content: the announcement timeline, the launch countdown and everything rendered from them.
pub mod countdown;
pub mod feed;
pub mod pages;
pub mod sitemap;
pub mod timeline;

/// Escapes the five XML special characters. Valid for HTML text and attribute values too.
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for char in value.chars() {
        match char {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(char),
        }
    }

    escaped
}
