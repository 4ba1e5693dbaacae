//! Nutrient label matching
//!
//! Row labels on product pages vary ("Gorduras totais (g)", "Gorduras
//! totais"), so the default policy is case-insensitive containment with
//! whitespace collapsed. When several labels are contained in a row label the
//! longest one wins; equal lengths fall back to table order.

use std::collections::HashSet;

use nutri_core::config::{MatchPolicy, NutrientLabel, SiteConfig};
use nutri_core::{parse_locale_number, NutrientField, NutritionRecord};

/// Maps nutrition-table row labels to record fields
#[derive(Debug, Clone)]
pub struct NutrientMatcher {
    labels: Vec<(String, NutrientField)>,
    policy: MatchPolicy,
}

impl NutrientMatcher {
    pub fn new(labels: &[NutrientLabel], policy: MatchPolicy) -> Self {
        let labels = labels
            .iter()
            .map(|l| {
                let key = match policy {
                    MatchPolicy::Substring => fold(&l.label),
                    MatchPolicy::Exact => l.label.trim().to_string(),
                };
                (key, l.field)
            })
            .collect();

        Self { labels, policy }
    }

    pub fn from_site(site: &SiteConfig) -> Self {
        Self::new(site.nutrient_labels(), site.match_policy)
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Field for a row label, if any label matches
    pub fn match_label(&self, text: &str) -> Option<NutrientField> {
        match self.policy {
            MatchPolicy::Exact => {
                let text = text.trim();
                self.labels
                    .iter()
                    .find(|(label, _)| label == text)
                    .map(|(_, field)| *field)
            }
            MatchPolicy::Substring => {
                let text = fold(text);
                let mut best: Option<(usize, NutrientField)> = None;
                for (label, field) in &self.labels {
                    if label.is_empty() || !text.contains(label.as_str()) {
                        continue;
                    }
                    let len = label.chars().count();
                    if best.map_or(true, |(best_len, _)| len > best_len) {
                        best = Some((len, *field));
                    }
                }
                best.map(|(_, field)| field)
            }
        }
    }

    /// Fill `record` from table rows (`[label, value, ..]`).
    ///
    /// The first row matching a field sets it; later rows for the same field
    /// are ignored. Returns the fields set, in row order.
    pub fn apply_rows(&self, rows: &[Vec<String>], record: &mut NutritionRecord) -> Vec<NutrientField> {
        let mut seen = HashSet::new();
        let mut matched = Vec::new();

        for row in rows {
            let (Some(label), Some(value)) = (row.first(), row.get(1)) else {
                continue;
            };
            let Some(field) = self.match_label(label) else {
                continue;
            };
            if seen.insert(field) {
                record.set(field, parse_locale_number(value));
                matched.push(field);
            }
        }

        matched
    }
}

/// Lowercase with runs of whitespace collapsed to one space
fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
