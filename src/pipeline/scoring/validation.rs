use std::ops::Range;

use super::parser::{ParsedJudgement, RawCitation};
use super::ScoringError;
use crate::models::{Chunk, ChunkId, Citation, Score};

/// Longest fallback excerpt, in characters, when a quote cannot be located.
pub const MAX_EXCERPT_CHARS: usize = 200;

/// Check a parsed judgement against the evidence bundle it was given and
/// turn it into a `Score`.
///
/// Every cited chunk must be in `bundle`; duplicates are collapsed.
pub fn validate_judgement(
    principle_id: &str,
    judgement: ParsedJudgement,
    bundle: &[Chunk],
) -> Result<Score, ScoringError> {
    let unknown: Vec<String> = judgement
        .citations
        .iter()
        .filter(|c| find_chunk(bundle, &c.chunk_id).is_none())
        .map(|c| c.chunk_id.clone())
        .collect();
    if !unknown.is_empty() {
        tracing::warn!(
            principle_id,
            unknown = ?unknown,
            "Oracle cited chunks outside the evidence bundle"
        );
        return Err(ScoringError::HallucinatedCitation(unknown));
    }

    let mut citations: Vec<Citation> = Vec::with_capacity(judgement.citations.len());
    for raw in &judgement.citations {
        let Some(chunk) = find_chunk(bundle, &raw.chunk_id) else {
            continue;
        };
        let citation = resolve_citation(chunk, raw);
        let duplicate = citations
            .iter()
            .any(|c| c.chunk_id == citation.chunk_id && c.quote_range == citation.quote_range);
        if !duplicate {
            citations.push(citation);
        }
    }

    Ok(Score {
        principle_id: principle_id.to_string(),
        value: judgement.score,
        rationale: judgement.rationale,
        citations,
    })
}

fn find_chunk<'a>(bundle: &'a [Chunk], raw_id: &str) -> Option<&'a Chunk> {
    let id = ChunkId::from_raw(raw_id);
    bundle.iter().find(|c| c.id == id)
}

fn resolve_citation(chunk: &Chunk, raw: &RawCitation) -> Citation {
    let local = raw
        .quote
        .as_deref()
        .and_then(|q| locate_quote(&chunk.text, q))
        .unwrap_or_else(|| leading_excerpt(&chunk.text));

    let chars: Vec<char> = chunk.text.chars().collect();
    let base = chunk.char_range.start;

    Citation {
        chunk_id: chunk.id.clone(),
        document_id: chunk.document_id,
        quote: chars[local.clone()].iter().collect(),
        quote_range: base + local.start..base + local.end,
    }
}

/// Find `quote` in `text` ignoring whitespace differences and surrounding
/// quotation marks. Returns the character range in `text`.
pub fn locate_quote(text: &str, quote: &str) -> Option<Range<usize>> {
    let needle: Vec<char> = collapse_whitespace(
        quote
            .trim()
            .trim_matches(|c| matches!(c, '"' | '\'' | '\u{201C}' | '\u{201D}'))
            .trim_end_matches("...")
            .trim_end_matches('\u{2026}')
            .chars()
            .enumerate(),
    )
    .into_iter()
    .map(|(c, _)| c)
    .collect();
    if needle.is_empty() {
        return None;
    }

    let haystack = collapse_whitespace(text.chars().enumerate());
    if needle.len() > haystack.len() {
        return None;
    }

    (0..=haystack.len() - needle.len())
        .find(|&i| {
            haystack[i..i + needle.len()]
                .iter()
                .zip(&needle)
                .all(|((h, _), n)| h == n)
        })
        .map(|i| haystack[i].1..haystack[i + needle.len() - 1].1 + 1)
}

/// Collapse whitespace runs to one space and trim, keeping each kept
/// character's original index.
fn collapse_whitespace(chars: impl Iterator<Item = (usize, char)>) -> Vec<(char, usize)> {
    let mut out: Vec<(char, usize)> = Vec::new();
    let mut pending: Option<usize> = None;
    for (i, c) in chars {
        if c.is_whitespace() {
            if !out.is_empty() && pending.is_none() {
                pending = Some(i);
            }
            continue;
        }
        if let Some(ws) = pending.take() {
            out.push((' ', ws));
        }
        out.push((c, i));
    }
    out
}

/// First `MAX_EXCERPT_CHARS` characters of the chunk, trailing whitespace trimmed.
fn leading_excerpt(text: &str) -> Range<usize> {
    let chars: Vec<char> = text.chars().take(MAX_EXCERPT_CHARS).collect();
    let mut end = chars.len();
    while end > 0 && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    0..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceLocation;
    use uuid::Uuid;

    fn chunk(doc: &Uuid, ordinal: usize, start: usize, text: &str) -> Chunk {
        Chunk {
            id: ChunkId::new(doc, ordinal),
            document_id: *doc,
            ordinal,
            text: text.into(),
            char_range: start..start + text.chars().count(),
            location: SourceLocation {
                page: None,
                paragraph: 0,
                original_offset: 0,
            },
        }
    }

    fn judgement(citations: Vec<RawCitation>) -> ParsedJudgement {
        ParsedJudgement {
            score: 3,
            rationale: "Solid evidence.".into(),
            citations,
        }
    }

    fn cite(id: &ChunkId, quote: Option<&str>) -> RawCitation {
        RawCitation {
            chunk_id: id.to_string(),
            quote: quote.map(str::to_string),
        }
    }

    #[test]
    fn quote_located_with_document_offsets() {
        let doc = Uuid::new_v4();
        let c = chunk(&doc, 1, 500, "The CEO previously scaled Stripe's EU business.");
        let score =
            validate_judgement("founder_market_fit", judgement(vec![cite(&c.id, Some("scaled Stripe's"))]), &[c])
                .unwrap();

        let citation = &score.citations[0];
        assert_eq!(citation.quote, "scaled Stripe's");
        assert_eq!(citation.quote_range, 500 + 19..500 + 34);
        assert_eq!(citation.document_id, doc);
    }

    #[test]
    fn quote_match_ignores_whitespace() {
        let text = "Revenue grew\n40%   year over year.";
        let range = locate_quote(text, "\"grew 40% year\"").unwrap();
        let found: String = text.chars().skip(range.start).take(range.len()).collect();
        assert_eq!(found, "grew\n40%   year");
    }

    #[test]
    fn missing_quote_falls_back_to_leading_excerpt() {
        let doc = Uuid::new_v4();
        let long_text = "x".repeat(300);
        let c = chunk(&doc, 0, 0, &long_text);
        let score = validate_judgement(
            "market_size",
            judgement(vec![cite(&c.id, Some("not in the chunk"))]),
            &[c],
        )
        .unwrap();
        assert_eq!(score.citations[0].quote.chars().count(), MAX_EXCERPT_CHARS);
        assert_eq!(score.citations[0].quote_range, 0..MAX_EXCERPT_CHARS);
    }

    #[test]
    fn hallucinated_chunk_rejected() {
        let doc = Uuid::new_v4();
        let c = chunk(&doc, 0, 0, "Team bios.");
        let bogus = ChunkId::new(&Uuid::new_v4(), 7);
        let err = validate_judgement(
            "market_size",
            judgement(vec![cite(&c.id, None), cite(&bogus, None)]),
            &[c],
        )
        .unwrap_err();
        assert_eq!(err, ScoringError::HallucinatedCitation(vec![bogus.to_string()]));
    }

    #[test]
    fn duplicates_collapsed() {
        let doc = Uuid::new_v4();
        let c = chunk(&doc, 0, 0, "Two founders, both technical.");
        let score = validate_judgement(
            "team_completeness",
            judgement(vec![cite(&c.id, None), cite(&c.id, None), cite(&c.id, Some("both technical"))]),
            &[c],
        )
        .unwrap();
        assert_eq!(score.citations.len(), 2);
    }

    #[test]
    fn every_citation_is_in_bundle() {
        let doc = Uuid::new_v4();
        let bundle = vec![chunk(&doc, 0, 0, "alpha"), chunk(&doc, 1, 10, "beta")];
        let score = validate_judgement(
            "scalability",
            judgement(vec![cite(&bundle[1].id, None), cite(&bundle[0].id, Some("alpha"))]),
            &bundle,
        )
        .unwrap();
        for citation in &score.citations {
            assert!(bundle.iter().any(|c| c.id == citation.chunk_id));
        }
        assert_eq!(score.citations[0].quote, "beta");
        assert_eq!(score.citations[0].quote_range, 10..14);
    }
}
