use regex::{Regex, RegexBuilder};

/// Case-insensitive literal matcher for a search term; `None` when the term is blank.
pub fn build_highlight_regex(term: &str) -> Option<Regex> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into consecutive `(is_match, segment)` pieces covering all of it.
pub fn segments<'a>(text: &'a str, regex: Option<&Regex>) -> Vec<(bool, &'a str)> {
    let Some(re) = regex else {
        return vec![(false, text)];
    };
    let mut out = Vec::new();
    let mut last = 0;
    for mat in re.find_iter(text) {
        if mat.start() > last {
            out.push((false, &text[last..mat.start()]));
        }
        out.push((true, mat.as_str()));
        last = mat.end();
    }
    if last < text.len() || out.is_empty() {
        out.push((false, &text[last..]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ignore_case_and_metacharacters() {
        let regex = build_highlight_regex("a.b").expect("regex");
        assert!(regex.is_match("xA.By"));
        assert!(!regex.is_match("axb"));
        assert!(build_highlight_regex("   ").is_none());
    }

    #[test]
    fn segments_cover_the_whole_text() {
        let regex = build_highlight_regex("ali").expect("regex");
        assert_eq!(
            segments("Ali and Alina", Some(&regex)),
            vec![(true, "Ali"), (false, " and "), (true, "Ali"), (false, "na")]
        );
        assert_eq!(segments("Bob", Some(&regex)), vec![(false, "Bob")]);
        assert_eq!(segments("Bob", None), vec![(false, "Bob")]);
    }
}
