//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in user input
///
/// Use this when building LIKE patterns from user input to prevent
/// unintended pattern matching.
///
/// # Example
///
/// ```
/// use gridscope_engine::utils::sql::escape_like_pattern;
///
/// let user_input = "100% match_test";
/// let pattern = format!("%{}%", escape_like_pattern(user_input));
/// assert_eq!(pattern, "%100\\% match\\_test%");
/// ```
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Wrap `s` in `quote`, doubling any embedded quote characters
///
/// Standard SQL quoting for both identifiers (`"`) and string literals (`'`).
pub fn quote_doubling(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        if c == quote {
            out.push(quote);
        }
        out.push(c);
    }
    out.push(quote);
    out
}

/// Wrap `s` in `quote`, backslash-escaping backslashes and the quote
pub fn quote_backslash(s: &str, quote: char) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        if c == '\\' || c == quote {
            out.push('\\');
        }
        out.push(c);
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern_no_special_chars() {
        assert_eq!(escape_like_pattern("hello"), "hello");
    }

    #[test]
    fn test_escape_like_pattern_percent() {
        assert_eq!(escape_like_pattern("100%"), "100\\%");
    }

    #[test]
    fn test_escape_like_pattern_underscore() {
        assert_eq!(escape_like_pattern("foo_bar"), "foo\\_bar");
    }

    #[test]
    fn test_escape_like_pattern_backslash() {
        assert_eq!(escape_like_pattern("path\\file"), "path\\\\file");
    }

    #[test]
    fn test_escape_like_pattern_multiple() {
        assert_eq!(escape_like_pattern("100%_\\test"), "100\\%\\_\\\\test");
    }

    #[test]
    fn test_quote_doubling() {
        assert_eq!(quote_doubling("name", '"'), "\"name\"");
        assert_eq!(quote_doubling("a\"b", '"'), "\"a\"\"b\"");
        assert_eq!(quote_doubling("O'Brien", '\''), "'O''Brien'");
        assert_eq!(quote_doubling("", '\''), "''");
    }

    #[test]
    fn test_quote_backslash() {
        assert_eq!(quote_backslash("a`b", '`'), "`a\\`b`");
        assert_eq!(quote_backslash("O'Brien", '\''), "'O\\'Brien'");
        assert_eq!(quote_backslash("c:\\dir", '\''), "'c:\\\\dir'");
    }
}
