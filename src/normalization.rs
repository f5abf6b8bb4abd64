use regex::Regex;

/// Canonicalizes raw email text before vectorization.
///
/// The output is lowercase, with URLs and digit runs replaced by placeholder
/// tokens, punctuation removed, and whitespace collapsed. The transform is
/// idempotent, so already-normalized text passes through unchanged.
#[derive(Debug)]
pub struct TextNormalizer {
    url_regex: Regex,
    digit_regex: Regex,
    whitespace_regex: Regex,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            url_regex: Regex::new(r"http\S+|www\S+").unwrap(),
            digit_regex: Regex::new(r"\d+").unwrap(),
            whitespace_regex: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Normalize arbitrary email text into its canonical form.
    ///
    /// Order matters: URLs are replaced before punctuation stripping so that
    /// scheme separators do not fragment the URL into stray tokens.
    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let no_urls = self.url_regex.replace_all(&lowered, " url ");
        let no_digits = self.digit_regex.replace_all(&no_urls, " number ");
        let no_punct: String = no_digits
            .chars()
            .filter(|c| !c.is_ascii_punctuation())
            .collect();
        let collapsed = self.whitespace_regex.replace_all(&no_punct, " ");
        collapsed.trim().to_string()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
