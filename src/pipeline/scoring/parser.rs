use serde::Deserialize;

use super::sanitize::sanitize_oracle_output;
use super::ScoringError;

/// A citation as the oracle wrote it, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCitation {
    pub chunk_id: String,
    pub quote: Option<String>,
}

/// Oracle judgement that passed schema checks but not yet citation checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedJudgement {
    pub score: u8,
    pub rationale: String,
    pub citations: Vec<RawCitation>,
}

/// Parse a raw oracle response into a judgement.
pub fn parse_oracle_response(raw: &str) -> Result<ParsedJudgement, ScoringError> {
    let cleaned = sanitize_oracle_output(raw);
    let json_str = extract_json(&cleaned)?;

    #[derive(Deserialize)]
    struct RawResponse {
        score: Option<serde_json::Value>,
        rationale: Option<String>,
        citations: Option<Vec<serde_json::Value>>,
    }

    let parsed: RawResponse = serde_json::from_str(json_str)
        .map_err(|e| ScoringError::MalformedResponse(format!("JSON parsing: {e}")))?;

    let score = parse_score(
        parsed
            .score
            .as_ref()
            .ok_or_else(|| ScoringError::SchemaMismatch("missing score".into()))?,
    )?;

    let rationale = parsed.rationale.unwrap_or_default().trim().to_string();
    if rationale.is_empty() {
        return Err(ScoringError::SchemaMismatch("empty rationale".into()));
    }

    let citations = parsed
        .citations
        .unwrap_or_default()
        .iter()
        .map(parse_citation)
        .collect::<Result<Vec<_>, _>>()?;
    if citations.is_empty() {
        return Err(ScoringError::SchemaMismatch("no citations".into()));
    }

    Ok(ParsedJudgement {
        score,
        rationale,
        citations,
    })
}

/// Locate the JSON object: a ```json fence, any fence, or the outermost braces.
fn extract_json(response: &str) -> Result<&str, ScoringError> {
    for fence in ["```json", "```"] {
        if let Some(start) = response.find(fence) {
            let content_start = start + fence.len();
            let end = response[content_start..]
                .find("```")
                .ok_or_else(|| ScoringError::MalformedResponse("Unclosed JSON block".into()))?;
            return Ok(response[content_start..content_start + end].trim());
        }
    }

    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&response[start..=end]),
        _ => Err(ScoringError::MalformedResponse("No JSON object found".into())),
    }
}

fn parse_score(value: &serde_json::Value) -> Result<u8, ScoringError> {
    let n = match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| ScoringError::SchemaMismatch(format!("score is not an integer: {value}")))?;

    if !(1..=4).contains(&n) {
        return Err(ScoringError::SchemaMismatch(format!("score {n} outside 1-4")));
    }
    Ok(n as u8)
}

fn parse_citation(value: &serde_json::Value) -> Result<RawCitation, ScoringError> {
    match value {
        serde_json::Value::String(id) => Ok(RawCitation {
            chunk_id: id.trim().to_string(),
            quote: None,
        }),
        serde_json::Value::Object(map) => {
            let chunk_id = map
                .get("chunk_id")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| ScoringError::SchemaMismatch("citation without chunk_id".into()))?;
            let quote = map
                .get("quote")
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            Ok(RawCitation { chunk_id, quote })
        }
        other => Err(ScoringError::SchemaMismatch(format!("invalid citation: {other}"))),
    }
}
