use once_cell::sync::Lazy;
use regex::Regex;

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static TAG_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<\s*(/?)\s*([A-Za-z][A-Za-z0-9]*)").expect("valid tag name regex"));

/// Tags that survive sanitizing; the set the rich-text notes editor emits.
const ALLOWED_TAGS: &[&str] = &[
    "p", "br", "strong", "b", "em", "i", "u", "s", "ol", "ul", "li", "blockquote", "pre",
    "code", "h1", "h2", "h3",
];

/// Removes every `<...>` tag, keeping the text between them untouched.
pub fn strip_markup(input: &str) -> String {
    TAG.replace_all(input, "").into_owned()
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Keeps allow-listed tags without their attributes, drops every other tag and
/// escapes all text in between.
pub fn sanitize_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    for tag in TAG.find_iter(input) {
        out.push_str(&escape_html(&input[cursor..tag.start()]));
        cursor = tag.end();
        let Some(caps) = TAG_NAME.captures(tag.as_str()) else {
            continue;
        };
        let closing = &caps[1];
        let name = caps[2].to_ascii_lowercase();
        if ALLOWED_TAGS.contains(&name.as_str()) {
            out.push('<');
            out.push_str(closing);
            out.push_str(&name);
            out.push('>');
        }
    }
    out.push_str(&escape_html(&input[cursor..]));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_removes_all_tags() {
        assert_eq!(
            strip_markup("<p>Hello <strong>there</strong></p><br/>"),
            "Hello there"
        );
        assert_eq!(strip_markup("a < b"), "a < b");
    }

    #[test]
    fn sanitize_keeps_allowed_tags_without_attributes() {
        let html = r#"<p class="ql-align-center" onclick="x()">Hi <b>you</b></p>"#;
        assert_eq!(sanitize_html(html), "<p>Hi <b>you</b></p>");
    }

    #[test]
    fn sanitize_drops_script_and_escapes_text() {
        let html = "<script>alert('x')</script><em>a & b</em>";
        assert_eq!(
            sanitize_html(html),
            "alert(&#39;x&#39;)<em>a &amp; b</em>"
        );
    }

    #[test]
    fn sanitize_escapes_stray_angle_brackets() {
        assert_eq!(sanitize_html("1 > 0"), "1 &gt; 0");
    }
}
