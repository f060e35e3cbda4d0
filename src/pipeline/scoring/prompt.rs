use super::types::OracleRequest;

pub const SCORING_SYSTEM_PROMPT: &str = r#"
You are an investment analyst scoring a company against one evaluation
principle. Judge ONLY from the evidence passages provided.

RULES:
1. Score on a 1-4 scale: 1 = weak or contrary evidence, 2 = below average,
   3 = solid, 4 = exceptional.
2. Cite the passages that support your score by their chunk_id, exactly as given.
3. NEVER cite a chunk_id that does not appear in the evidence.
4. Quotes must be copied verbatim from the cited passage.
5. Output a single JSON object and nothing else.
"#;

/// Build the user prompt for one scoring request.
pub fn build_scoring_prompt(request: &OracleRequest) -> String {
    let principle = &request.principle;

    let evidence: String = request
        .evidence
        .iter()
        .map(|item| {
            format!(
                "<evidence chunk_id=\"{}\" document_id=\"{}\">\n{}\n</evidence>\n",
                item.chunk_id, item.document_id, item.text
            )
        })
        .collect();

    let correction = match &request.correction {
        Some(note) => format!("\nYOUR PREVIOUS ANSWER WAS REJECTED: {note}\nFix it and answer again.\n"),
        None => String::new(),
    };

    format!(
        r#"PRINCIPLE ({category}): {name}
{probe}

{evidence}{correction}
Respond with this JSON structure:
{{
  "score": 1 | 2 | 3 | 4,
  "rationale": "why the evidence supports this score",
  "citations": [
    {{"chunk_id": "<chunk_id from the evidence>", "quote": "verbatim supporting text"}}
  ]
}}"#,
        category = principle.category,
        name = principle.name,
        probe = principle.probe,
    )
}

/// Corrective instruction sent after a structurally invalid response.
pub fn correction_for(error: &super::ScoringError) -> String {
    use super::ScoringError;
    match error {
        ScoringError::HallucinatedCitation(ids) => format!(
            "you cited chunk ids that are not in the evidence ({}). Cite only chunk_id values \
             shown in the evidence tags.",
            ids.join(", ")
        ),
        other => format!(
            "{other}. Return exactly one JSON object with an integer score from 1 to 4, a \
             non-empty rationale and at least one citation."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ChunkId};
    use crate::pipeline::scoring::{EvidenceItem, PrincipleBrief, ScoringError};
    use uuid::Uuid;

    fn request(correction: Option<String>) -> OracleRequest {
        let doc = Uuid::nil();
        OracleRequest {
            principle: PrincipleBrief {
                id: "market_size".into(),
                name: "Market Size".into(),
                category: Category::Market,
                probe: "How large is the addressable market?".into(),
            },
            evidence: vec![EvidenceItem {
                chunk_id: ChunkId::new(&doc, 0),
                document_id: doc,
                text: "TAM is $12B.".into(),
            }],
            correction,
        }
    }

    #[test]
    fn prompt_contains_principle_and_evidence() {
        let prompt = build_scoring_prompt(&request(None));
        assert!(prompt.contains("PRINCIPLE (market): Market Size"));
        assert!(prompt.contains("chunk_id=\"00000000-0000-0000-0000-000000000000#0\""));
        assert!(prompt.contains("TAM is $12B."));
        assert!(!prompt.contains("REJECTED"));
    }

    #[test]
    fn correction_is_appended() {
        let note = correction_for(&ScoringError::HallucinatedCitation(vec!["bogus#1".into()]));
        let prompt = build_scoring_prompt(&request(Some(note)));
        assert!(prompt.contains("REJECTED"));
        assert!(prompt.contains("bogus#1"));
    }
}
