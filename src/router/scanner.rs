//! Position-based scanning over command text. A [`Cursor`] is a plain byte
//! offset; scanning never mutates the scanner, it hands back a new cursor.

pub const DEFAULT_SKIP_CHARS: &str = " \t\r\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(usize);

impl Cursor {
    pub fn offset(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Scanner<'a> {
    text: &'a str,
    skip: &'a str,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str, skip: &'a str) -> Self {
        Self { text, skip }
    }

    fn is_skip(&self, c: char) -> bool {
        self.skip.contains(c)
    }

    /// First position at or after `at` that is not a skip character.
    pub fn skip(&self, at: Cursor) -> Cursor {
        let rest = &self.text[at.0..];
        let trimmed = rest.trim_start_matches(|c: char| self.is_skip(c));
        Cursor(self.text.len() - trimmed.len())
    }

    pub fn is_at_end(&self, at: Cursor) -> bool {
        self.skip(at).0 == self.text.len()
    }

    /// Next run of non-skip characters.
    pub fn scan_word(&self, at: Cursor) -> Option<(&'a str, Cursor)> {
        let start = self.skip(at).0;
        let rest = &self.text[start..];
        let len = rest.find(|c: char| self.is_skip(c)).unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        Some((&rest[..len], Cursor(start + len)))
    }

    /// Everything left, minus surrounding skip characters.
    pub fn scan_rest(&self, at: Cursor) -> Option<(&'a str, Cursor)> {
        let start = self.skip(at).0;
        let rest = self.text[start..].trim_end_matches(|c: char| self.is_skip(c));
        if rest.is_empty() {
            return None;
        }
        Some((rest, Cursor(self.text.len())))
    }
}

/// Owned argument stream handed to handlers, positioned just past the
/// matched command.
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    text: String,
    skip: String,
    cursor: Cursor,
}

impl Arguments {
    pub fn new(text: impl Into<String>, skip: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            skip: skip.into(),
            cursor: Cursor::default(),
        }
    }

    pub(crate) fn scanner(&self) -> Scanner<'_> {
        Scanner::new(&self.text, &self.skip)
    }

    /// The full command text, independent of the cursor.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn position(&self) -> Cursor {
        self.cursor
    }

    pub fn reset(&mut self, to: Cursor) {
        self.cursor = to;
    }

    pub fn scan_word(&mut self) -> Option<String> {
        let (word, next) = self.scanner().scan_word(self.cursor)?;
        let word = word.to_string();
        self.cursor = next;
        Some(word)
    }

    /// Consumes the next word only if it parses as an integer.
    pub fn scan_int(&mut self) -> Option<i64> {
        let (word, next) = self.scanner().scan_word(self.cursor)?;
        let value = word.parse().ok()?;
        self.cursor = next;
        Some(value)
    }

    pub fn scan_rest(&mut self) -> Option<String> {
        let (rest, next) = self.scanner().scan_rest(self.cursor)?;
        let rest = rest.to_string();
        self.cursor = next;
        Some(rest)
    }

    /// Unconsumed text without leading skip characters.
    pub fn rest(&self) -> &str {
        let at = self.scanner().skip(self.cursor);
        &self.text[at.offset()..]
    }

    pub fn is_at_end(&self) -> bool {
        self.scanner().is_at_end(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_word_skips_whitespace_and_newlines() {
        let scanner = Scanner::new(" \n /start  now", DEFAULT_SKIP_CHARS);
        let (word, next) = scanner.scan_word(Cursor::default()).unwrap();
        assert_eq!(word, "/start");
        assert_eq!(next.offset(), 9);
        let (word, _) = scanner.scan_word(next).unwrap();
        assert_eq!(word, "now");
    }

    #[test]
    fn test_failed_scan_leaves_cursor() {
        let mut args = Arguments::new("/add ten 3", DEFAULT_SKIP_CHARS);
        args.scan_word();
        let before = args.position();
        assert_eq!(args.scan_int(), None);
        assert_eq!(args.position(), before);
        assert_eq!(args.scan_word().as_deref(), Some("ten"));
        assert_eq!(args.scan_int(), Some(3));
        assert!(args.is_at_end());
    }

    #[test]
    fn test_at_end_ignores_trailing_skip_chars() {
        let mut args = Arguments::new("/start \n\t", DEFAULT_SKIP_CHARS);
        assert!(!args.is_at_end());
        args.scan_word();
        assert!(args.is_at_end());
        assert_eq!(args.rest(), "");
        assert_eq!(args.scan_word(), None);
    }

    #[test]
    fn test_rest_and_scan_rest() {
        let mut args = Arguments::new("/say   hello there  ", DEFAULT_SKIP_CHARS);
        args.scan_word();
        assert_eq!(args.rest(), "hello there  ");
        assert_eq!(args.scan_rest().as_deref(), Some("hello there"));
        assert!(args.is_at_end());
    }

    #[test]
    fn test_custom_skip_chars() {
        let scanner = Scanner::new("a,b", ",");
        let (first, next) = scanner.scan_word(Cursor::default()).unwrap();
        assert_eq!(first, "a");
        assert_eq!(scanner.scan_word(next).unwrap().0, "b");
    }

    #[test]
    fn test_empty_text() {
        let args = Arguments::new("", DEFAULT_SKIP_CHARS);
        assert!(args.is_at_end());
        assert_eq!(args.rest(), "");
    }
}
