use common::types::{Category, Chunk, Document};
use regex::Regex;
use std::sync::OnceLock;

use crate::normalize::normalize;
use crate::tokens::estimate_tokens;

/// Token budget `T`, overlap `O`, hard minimum `m`, hard maximum `M` — see §4.1.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub target_tokens: usize,
    pub overlap_tokens: usize,
    pub min_tokens: usize,
    pub max_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_tokens: 512,
            overlap_tokens: 50,
            min_tokens: 100,
            max_tokens: 800,
        }
    }
}

fn sentence_terminator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]\s+").expect("static sentence regex is valid"))
}

fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_sentences(text: &str) -> Vec<String> {
    sentence_terminator()
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Last `overlap` whitespace-separated words of `text`, joined by a single space.
fn tail_overlap_words(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    let start = words.len().saturating_sub(overlap);
    words[start..].join(" ")
}

/// The accumulator loop of §4.1 step 3, generic over granularity (paragraphs
/// joined by `\n\n`, sentences joined by a single space).
fn accumulate(atoms: &[String], join_sep: &str, config: &ChunkerConfig) -> Vec<String> {
    let mut output = Vec::new();
    let mut current = String::new();

    for atom in atoms {
        let atom_tokens = estimate_tokens(atom);

        if atom_tokens > config.max_tokens {
            if !current.is_empty() {
                output.push(std::mem::take(&mut current));
            }
            let sentences = split_sentences(atom);
            if sentences.len() <= 1 {
                // No terminator to split on; emit the oversized atom whole
                // rather than recursing on the same input forever.
                output.push(atom.clone());
            } else {
                output.extend(accumulate(&sentences, " ", config));
            }
            continue;
        }

        let current_tokens = estimate_tokens(&current);
        if current_tokens + atom_tokens > config.target_tokens && !current.is_empty() {
            let overlap = tail_overlap_words(&current, config.overlap_tokens);
            output.push(std::mem::take(&mut current));
            current = if overlap.is_empty() {
                atom.clone()
            } else {
                format!("{overlap}{join_sep}{atom}")
            };
        } else if current.is_empty() {
            current = atom.clone();
        } else {
            current = format!("{current}{join_sep}{atom}");
        }
    }

    if !current.is_empty() {
        output.push(current);
    }

    output
}

/// Drops chunks with trimmed length < 10 characters, no alphabetic run of
/// length >= 3, or token count < 5. The hard floor on chunk size is enforced
/// here, not at emission time.
fn passes_validation(content: &str, tokens: usize) -> bool {
    if content.trim().chars().count() < 10 {
        return false;
    }
    if tokens < 5 {
        return false;
    }
    has_alphabetic_run(content, 3)
}

fn has_alphabetic_run(text: &str, min_len: usize) -> bool {
    let mut run = 0usize;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            run += 1;
            if run >= min_len {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn chunk_document_inner(document: &Document, config: &ChunkerConfig) -> (Vec<Chunk>, usize) {
    let normalized = normalize(&document.content);
    if normalized.is_empty() {
        return (Vec::new(), 0);
    }

    let paragraphs = split_paragraphs(&normalized);
    let raw_chunks = accumulate(&paragraphs, "\n\n", config);
    let raw_count = raw_chunks.len();

    let chunks = raw_chunks
        .into_iter()
        .filter_map(|content| {
            let tokens = estimate_tokens(&content);
            passes_validation(&content, tokens).then_some((content, tokens))
        })
        .enumerate()
        .map(|(idx, (content, tokens))| {
            Chunk::new(
                document.id.clone(),
                idx,
                content,
                tokens,
                document.category,
                document.source_label.clone(),
            )
        })
        .collect();

    (chunks, raw_count)
}

/// Transforms a cleaned document into a sequence of validated, contiguously
/// indexed chunks. Deterministic: the same `(content, config, category)`
/// always yields the same chunk list.
pub fn chunk_document(document: &Document, config: &ChunkerConfig) -> Vec<Chunk> {
    chunk_document_inner(document, config).0
}

/// Chunk counts before and after validation filtering, for callers that
/// report on a batch (the ingestion entrypoint's summary line).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChunkingStats {
    pub emitted: usize,
    pub dropped_by_validation: usize,
}

/// Same as [`chunk_document`], but also reports how many raw chunks were
/// dropped by [`passes_validation`] before the final list was built.
pub fn chunk_document_with_stats(document: &Document, config: &ChunkerConfig) -> (Vec<Chunk>, ChunkingStats) {
    let (chunks, raw_count) = chunk_document_inner(document, config);
    let stats = ChunkingStats {
        emitted: chunks.len(),
        dropped_by_validation: raw_count.saturating_sub(chunks.len()),
    };
    (chunks, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::Category;

    fn doc(content: &str) -> Document {
        Document::new("doc1", content, Category::Wellness, "test-source")
    }

    #[test]
    fn every_chunk_satisfies_size_and_content_invariants() {
        let content = "Mountain pose (Tadasana) is a standing posture that builds stability and awareness of the feet, legs, and spine. \
            Practitioners are encouraged to ground through all four corners of each foot.\n\n\
            Downward-facing dog stretches the hamstrings and calves while strengthening the arms and shoulders. \
            It is often used as a transitional resting pose within a flow sequence.";
        let document = doc(content);
        let chunks = chunk_document(&document, &ChunkerConfig::default());

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.tokens >= 5);
            assert!(chunk.tokens <= ChunkerConfig::default().max_tokens);
            assert!(!chunk.content.trim().is_empty());
        }
    }

    #[test]
    fn chunk_indices_are_contiguous_and_ids_follow_convention() {
        let document = doc("Paragraph one has enough words to be meaningful content.\n\nParagraph two also has enough words to be meaningful content.");
        let chunks = chunk_document(&document, &ChunkerConfig::default());

        for (expected_idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, expected_idx);
            assert_eq!(chunk.id, format!("doc1_chunk_{expected_idx}"));
        }
    }

    #[test]
    fn chunking_is_deterministic() {
        let content = "A wellness paragraph about breathing exercises and calm, steady awareness. ".repeat(40);
        let document = doc(&content);
        let config = ChunkerConfig::default();

        let first = chunk_document(&document, &config);
        let second = chunk_document(&document, &config);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.content, b.content);
            assert_eq!(a.tokens, b.tokens);
            assert_eq!(a.id, b.id);
        }
    }

    #[test]
    fn short_fragments_are_dropped_by_validation() {
        let document = doc("Ok.\n\n123 456.");
        let chunks = chunk_document(&document, &ChunkerConfig::default());
        assert!(chunks.is_empty());
    }

    #[test]
    fn stats_count_the_chunk_dropped_by_validation() {
        let document = doc("Ok.\n\n123 456.");
        let (chunks, stats) = chunk_document_with_stats(&document, &ChunkerConfig::default());
        assert_eq!(stats.emitted, chunks.len());
        assert_eq!(chunks.len(), 0);
        assert_eq!(stats.dropped_by_validation, 1);
    }

    #[test]
    fn oversized_paragraph_falls_back_to_sentence_granularity() {
        let sentence = "Sun salutations build strength, flexibility, and cardiovascular endurance over time. ";
        let huge_paragraph = sentence.repeat(200);
        let document = doc(&huge_paragraph);
        let config = ChunkerConfig::default();

        let chunks = chunk_document(&document, &config);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.tokens <= config.max_tokens);
        }
    }

    #[test]
    fn oversized_paragraph_with_no_sentence_terminator_does_not_recurse_forever() {
        let words = "breath ".repeat(3000);
        let document = doc(&words);
        let config = ChunkerConfig::default();

        let chunks = chunk_document(&document, &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].tokens > config.max_tokens);
    }
}
