use std::sync::OnceLock;

/// A byte-pair-encoding estimator backed by a pretrained tokenizer, loaded
/// once per process lifetime. If construction fails (offline environment,
/// missing cache) every subsequent call degrades to the word-count fallback
/// for the remainder of the process — `tokens(P)` stays a pure, repeatable
/// function of its input within one run.
fn tokenizer() -> Option<&'static tokenizers::Tokenizer> {
    static TOKENIZER: OnceLock<Option<tokenizers::Tokenizer>> = OnceLock::new();
    TOKENIZER
        .get_or_init(|| {
            tokenizers::Tokenizer::from_pretrained("bert-base-cased", None)
                .map_err(|e| tracing::warn!(error = %e, "falling back to word-count token estimate"))
                .ok()
        })
        .as_ref()
}

/// Estimates the token count of `text`. Falls back to `ceil(1.3 * word_count)`
/// when no tokenizer is available. Deterministic within one process run.
pub fn estimate_tokens(text: &str) -> usize {
    if text.trim().is_empty() {
        return 0;
    }

    if let Some(tokenizer) = tokenizer() {
        if let Ok(encoding) = tokenizer.encode(text, false) {
            return encoding.get_ids().len();
        }
    }

    let word_count = text.split_whitespace().count();
    ((word_count as f64) * 1.3).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_zero_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("   "), 0);
    }

    #[test]
    fn estimate_is_deterministic() {
        let text = "Mountain pose is a standing posture that builds stability.";
        assert_eq!(estimate_tokens(text), estimate_tokens(text));
    }
}
