//! ニュース本文のトークナイズと正規化処理。
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use super::stop_words::is_stop_word;

/// トークンとして採用する最小文字数（`\w\w+` 相当）。
const MIN_TOKEN_CHARS: usize = 2;

fn normalize_text(input: &str) -> String {
    input.nfc().collect::<String>().to_lowercase()
}

/// 英語ニュース向けのトークナイザ。
///
/// NFC 正規化と小文字化の後、Unicode の単語境界で分割し、
/// 単語文字以外でさらに切り分ける。2 文字未満のトークンは捨てる。
#[derive(Debug, Clone)]
pub struct TokenPipeline {
    split_re: Regex,
    remove_stop_words: bool,
}

impl TokenPipeline {
    #[must_use]
    pub fn new(remove_stop_words: bool) -> Self {
        Self {
            split_re: Regex::new(r"[^\p{L}\p{N}_]+").expect("compile token split pattern"),
            remove_stop_words,
        }
    }

    #[must_use]
    pub fn removes_stop_words(&self) -> bool {
        self.remove_stop_words
    }

    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        normalize_text(text)
            .unicode_words()
            .flat_map(|word| self.split_re.split(word))
            .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
            .filter(|token| !(self.remove_stop_words && is_stop_word(token)))
            .map(ToString::to_string)
            .collect()
    }
}

impl Default for TokenPipeline {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_drops_short_tokens() {
        let pipeline = TokenPipeline::new(false);
        let tokens = pipeline.tokenize("NASA's Perseverance rover: a 25th sample!");
        assert_eq!(
            tokens,
            vec!["nasa", "perseverance", "rover", "25th", "sample"]
        );
    }

    #[test]
    fn removes_stop_words_when_enabled() {
        let pipeline = TokenPipeline::default();
        let tokens = pipeline.tokenize("The vaccine and the microchip");
        assert_eq!(tokens, vec!["vaccine", "microchip"]);
    }

    #[test]
    fn keeps_alphanumeric_tokens() {
        let pipeline = TokenPipeline::default();
        assert_eq!(pipeline.tokenize("5G towers"), vec!["5g", "towers"]);
    }

    #[test]
    fn blank_text_has_no_tokens() {
        let pipeline = TokenPipeline::default();
        assert!(pipeline.tokenize("   \n\t").is_empty());
    }
}
