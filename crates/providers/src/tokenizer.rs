//! Approximate token counting for backends without a local tokenizer.

/// Average characters per token for English text on BPE vocabularies.
pub const CHARS_PER_TOKEN: usize = 4;

/// Splits text into fixed-width character chunks and numbers them.
///
/// Good enough for deciding whether a prompt fits the context window.
/// Ids carry no meaning beyond their count.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicTokenizer {
    chars_per_token: usize,
}

impl Default for HeuristicTokenizer {
    fn default() -> Self {
        Self::new(CHARS_PER_TOKEN)
    }
}

impl HeuristicTokenizer {
    /// A width of zero is treated as one.
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    pub fn tokenize(&self, text: &str) -> Vec<u32> {
        (0..self.count(text))
            .map(|i| u32::try_from(i).unwrap_or(u32::MAX))
            .collect()
    }
}
