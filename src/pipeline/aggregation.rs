//! Category averages and the overall recommendation.

use std::collections::HashMap;

use crate::models::{Category, CategorySummary, PrincipleOutcome, Recommendation};
use crate::rubric::{RecommendationThresholds, Rubric};

/// Average the scored principles of each category, in `Category::ALL` order.
///
/// Outcomes for principle ids not in the rubric are ignored. A category with
/// no scored principle has an undefined average.
pub fn aggregate(outcomes: &[PrincipleOutcome], rubric: &Rubric) -> Vec<CategorySummary> {
    let by_id: HashMap<&str, &PrincipleOutcome> =
        outcomes.iter().map(|o| (o.principle_id(), o)).collect();

    Category::ALL
        .iter()
        .map(|&category| {
            let mut total = 0;
            let mut values: Vec<u8> = Vec::new();
            for principle in rubric.in_category(category) {
                total += 1;
                if let Some(score) = by_id.get(principle.id.as_str()).and_then(|o| o.score()) {
                    values.push(score.value);
                }
            }

            let average = if values.is_empty() {
                None
            } else {
                Some(values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64)
            };

            CategorySummary {
                category,
                average,
                scored: values.len(),
                total,
            }
        })
        .collect()
}

/// Map category summaries to a recommendation.
///
/// - no category defined: `InsufficientEvidence`
/// - any defined category below `pass_below`: `Pass`
/// - every category defined and at least `strong_min`: `Strong`
/// - otherwise `Moderate`
pub fn recommend(
    categories: &[CategorySummary],
    thresholds: &RecommendationThresholds,
) -> Recommendation {
    let defined: Vec<f64> = categories.iter().filter_map(|c| c.average).collect();

    if defined.is_empty() {
        return Recommendation::InsufficientEvidence;
    }
    if defined.iter().any(|&avg| avg < thresholds.pass_below) {
        return Recommendation::Pass;
    }
    if defined.len() == categories.len() && defined.iter().all(|&avg| avg >= thresholds.strong_min)
    {
        return Recommendation::Strong;
    }
    Recommendation::Moderate
}
