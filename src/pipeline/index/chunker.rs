use uuid::Uuid;

use super::IndexError;
use crate::config::ChunkingConfig;
use crate::models::{Chunk, ChunkId};
use crate::pipeline::extraction::ExtractedText;

/// Boundary-aware chunker over normalized extracted text.
///
/// Chunks are at most `target_size` characters. Inside the last `tolerance`
/// characters before the target the cut prefers, in order: a paragraph
/// break, a sentence end, any whitespace. Consecutive chunks share about
/// `overlap` characters, realigned to a word start.
pub struct ParagraphChunker {
    config: ChunkingConfig,
}

impl ParagraphChunker {
    pub fn new(config: ChunkingConfig) -> Result<Self, IndexError> {
        config
            .validate()
            .map_err(|e| IndexError::InvalidConfig(e.to_string()))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Split a document's extracted text into ordered, provenance-tagged chunks.
    pub fn chunk(&self, document_id: &Uuid, extracted: &ExtractedText) -> Vec<Chunk> {
        let chars: Vec<char> = extracted.text.chars().collect();
        chunk_ranges(&chars, &self.config)
            .into_iter()
            .enumerate()
            .map(|(ordinal, range)| Chunk {
                id: ChunkId::new(document_id, ordinal),
                document_id: *document_id,
                ordinal,
                text: chars[range.clone()].iter().collect(),
                location: extracted.location_at(range.start),
                char_range: range,
            })
            .collect()
    }
}

impl Default for ParagraphChunker {
    fn default() -> Self {
        Self {
            config: ChunkingConfig::default(),
        }
    }
}

/// Compute chunk character ranges. Leading and trailing whitespace is never
/// part of a chunk; every non-whitespace character lands in at least one.
pub(crate) fn chunk_ranges(chars: &[char], config: &ChunkingConfig) -> Vec<std::ops::Range<usize>> {
    let n = chars.len();
    let mut ranges = Vec::new();
    let mut start = skip_whitespace(chars, 0);

    while start < n {
        let hard_end = (start + config.target_size).min(n);
        let end = if hard_end == n {
            n
        } else {
            find_break(chars, start, hard_end, config.tolerance)
        };

        let mut text_end = end;
        while text_end > start && chars[text_end - 1].is_whitespace() {
            text_end -= 1;
        }
        ranges.push(start..text_end);

        if end >= n {
            break;
        }

        let mut next = end.saturating_sub(config.overlap).max(start + 1);
        if next > 0 && !chars[next - 1].is_whitespace() && !chars[next].is_whitespace() {
            if let Some(word_start) =
                (next + 1..end).find(|&i| chars[i - 1].is_whitespace() && !chars[i].is_whitespace())
            {
                next = word_start;
            }
        }
        start = skip_whitespace(chars, next);
    }

    ranges
}

fn skip_whitespace(chars: &[char], mut pos: usize) -> usize {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos
}

/// Pick the cut position (exclusive end) for a chunk starting at `start`.
/// Only called when `hard_end < chars.len()`.
fn find_break(chars: &[char], start: usize, hard_end: usize, tolerance: usize) -> usize {
    let lo = hard_end.saturating_sub(tolerance).max(start + 1);
    let window = || (lo..=hard_end).rev();

    let paragraph = window().find(|&b| chars[b] == '\n' && chars.get(b + 1) == Some(&'\n'));
    if let Some(b) = paragraph {
        return b;
    }

    let sentence =
        window().find(|&b| matches!(chars[b - 1], '.' | '!' | '?') && chars[b].is_whitespace());
    if let Some(b) = sentence {
        return b;
    }

    window()
        .find(|&b| chars[b].is_whitespace())
        .unwrap_or(hard_end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::{assemble_text, ExtractionMethod, RawPage};
    use proptest::prelude::*;

    fn extracted(text: &str) -> ExtractedText {
        assemble_text(
            ExtractionMethod::PlainTextRead,
            &[RawPage {
                page_number: None,
                text: text.into(),
            }],
        )
        .unwrap()
    }

    fn small_config() -> ChunkingConfig {
        ChunkingConfig {
            target_size: 60,
            overlap: 10,
            tolerance: 20,
        }
    }

    fn as_strings(chars: &[char], ranges: &[std::ops::Range<usize>]) -> Vec<String> {
        ranges.iter().map(|r| chars[r.clone()].iter().collect()).collect()
    }

    #[test]
    fn short_text_is_one_chunk() {
        let doc = Uuid::new_v4();
        let chunks = ParagraphChunker::default().chunk(&doc, &extracted("Acme builds robots."));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Acme builds robots.");
        assert_eq!(chunks[0].char_range, 0..19);
        assert_eq!(chunks[0].id, ChunkId::new(&doc, 0));
    }

    #[test]
    fn prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(45), "b ".repeat(40));
        let chars: Vec<char> = text.chars().collect();
        let ranges = chunk_ranges(&chars, &small_config());
        assert_eq!(as_strings(&chars, &ranges)[0], "a".repeat(45));
    }

    #[test]
    fn prefers_sentence_end_over_whitespace() {
        let text = "The team is strong. Market size is large and growing fast every year now";
        let chars: Vec<char> = text.chars().collect();
        let config = ChunkingConfig {
            target_size: 30,
            overlap: 5,
            tolerance: 15,
        };
        let ranges = chunk_ranges(&chars, &config);
        assert_eq!(as_strings(&chars, &ranges)[0], "The team is strong.");
    }

    #[test]
    fn hard_cut_without_any_break() {
        let text = "x".repeat(150);
        let chars: Vec<char> = text.chars().collect();
        let ranges = chunk_ranges(&chars, &small_config());
        assert_eq!(ranges[0], 0..60);
        assert_eq!(ranges[1].start, 50);
    }

    #[test]
    fn overlap_starts_on_word_boundary() {
        let text = "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu nu xi omicron";
        let chars: Vec<char> = text.chars().collect();
        let ranges = chunk_ranges(&chars, &small_config());
        assert!(ranges.len() >= 2);
        for pair in ranges.windows(2) {
            let next = &pair[1];
            assert!(chars[next.start - 1].is_whitespace(), "chunk starts mid-word at {}", next.start);
            assert!(next.start < pair[0].end, "no overlap with previous chunk");
        }
    }

    #[test]
    fn chunks_carry_provenance() {
        let doc = Uuid::new_v4();
        let text = "First paragraph text. First paragraph text.\n\n\
                    Second paragraph is here and it is long enough to matter.";
        let extracted = extracted(text);
        let chunks = ParagraphChunker::new(small_config()).unwrap().chunk(&doc, &extracted);

        assert_eq!(chunks[0].text, "First paragraph text. First paragraph text.");
        assert_eq!(chunks[0].location.paragraph, 0);
        assert_eq!(chunks.last().unwrap().location.paragraph, 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal, i);
            assert_eq!(chunk.document_id, doc);
            let slice: String = extracted
                .text
                .chars()
                .skip(chunk.char_range.start)
                .take(chunk.char_range.len())
                .collect();
            assert_eq!(slice, chunk.text);
        }
    }

    #[test]
    fn invalid_config_rejected() {
        let err = ParagraphChunker::new(ChunkingConfig {
            target_size: 100,
            overlap: 60,
            tolerance: 50,
        })
        .err()
        .unwrap();
        assert!(matches!(err, IndexError::InvalidConfig(_)));
    }

    proptest! {
        #[test]
        fn chunking_is_deterministic(text in "[a-zA-Z .!?\n]{0,600}") {
            let chars: Vec<char> = text.chars().collect();
            let a = chunk_ranges(&chars, &small_config());
            let b = chunk_ranges(&chars, &small_config());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn chunks_are_bounded_trimmed_and_cover_text(text in "[a-z .\n\u{e9}]{0,600}") {
            let config = small_config();
            let chars: Vec<char> = text.chars().collect();
            let ranges = chunk_ranges(&chars, &config);

            let mut covered = vec![false; chars.len()];
            let mut prev_start = None;
            for r in &ranges {
                prop_assert!(!r.is_empty());
                prop_assert!(r.len() <= config.target_size);
                prop_assert!(!chars[r.start].is_whitespace());
                prop_assert!(!chars[r.end - 1].is_whitespace());
                if let Some(p) = prev_start {
                    prop_assert!(r.start > p);
                }
                prev_start = Some(r.start);
                for c in covered[r.clone()].iter_mut() {
                    *c = true;
                }
            }
            for (i, c) in chars.iter().enumerate() {
                if !c.is_whitespace() {
                    prop_assert!(covered[i], "char {} not covered", i);
                }
            }
        }
    }
}
