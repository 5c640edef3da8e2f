use serde::{Deserialize, Serialize};

use crate::domain::application::ProductId;
use crate::domain::approver::Role;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CreditRuleId(pub String);

/// Maps an inclusive bureau score band of one product to the credit sub-role
/// that must review it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAssignmentRule {
    pub id: CreditRuleId,
    pub product_id: ProductId,
    pub min_score: i32,
    pub max_score: i32,
    pub role: Role,
}

impl CreditAssignmentRule {
    pub fn contains(&self, score: i32) -> bool {
        self.min_score <= score && score <= self.max_score
    }
}

/// Picks the rule whose band contains `score`. Bands are expected not to
/// overlap; if they do, the band with the highest lower bound wins.
pub fn resolve_rule<'a>(
    rules: &'a [CreditAssignmentRule],
    product_id: &ProductId,
    score: i32,
) -> Option<&'a CreditAssignmentRule> {
    rules
        .iter()
        .filter(|rule| &rule.product_id == product_id && rule.contains(score))
        .max_by(|left, right| {
            left.min_score.cmp(&right.min_score).then_with(|| right.id.0.cmp(&left.id.0))
        })
}
