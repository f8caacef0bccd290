//! Pure rule-based column classifier.

use crmsync_model::{FieldKind, FieldMapping, TargetField};

use crate::rules::{alias_target, normalize_name, RULES};

/// Confidence for an exact alias-dictionary hit.
const ALIAS_CONFIDENCE: u8 = 98;
/// Confidence when the matched span covers more than 80% of the heading.
const HIGH_COVERAGE_CONFIDENCE: u8 = 95;
/// Confidence when the matched span covers more than 60% of the heading.
const MID_COVERAGE_CONFIDENCE: u8 = 90;
const HIGH_COVERAGE: f64 = 0.8;
const MID_COVERAGE: f64 = 0.6;

/// Ordered-rule column classifier. Pure and side-effect free.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Classify every column heading, producing exactly one mapping per
    /// column in input order.
    #[must_use]
    pub fn classify(&self, names: &[String]) -> Vec<FieldMapping> {
        names.iter().map(|name| self.classify_one(name)).collect()
    }

    /// Classify a single heading.
    ///
    /// Resolution order: exact alias (98), then the rule table in
    /// declaration order with coverage-based confidence. Ties go to the
    /// highest confidence, then the earliest rule. No match yields the
    /// `Unmapped` sentinel at confidence 0.
    #[must_use]
    pub fn classify_one(&self, name: &str) -> FieldMapping {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return FieldMapping::unmapped(name);
        }

        if let Some(target) = alias_target(&normalized) {
            return FieldMapping {
                source_field: name.to_string(),
                target_field: target,
                confidence: ALIAS_CONFIDENCE,
                reasoning: format!("exact alias match for '{normalized}'"),
                suggested_transformation: transformation_for(target),
            };
        }

        let mut best: Option<(u8, usize, TargetField, String)> = None;
        for (index, rule) in RULES.iter().enumerate() {
            let Some(found) = rule.pattern.find(&normalized) else {
                continue;
            };

            let coverage = found.len() as f64 / normalized.len() as f64;
            let confidence = if coverage > HIGH_COVERAGE {
                HIGH_COVERAGE_CONFIDENCE
            } else if coverage > MID_COVERAGE {
                MID_COVERAGE_CONFIDENCE
            } else {
                rule.base_confidence
            };

            // Strictly-greater keeps the earliest rule on equal confidence.
            if best.as_ref().is_none_or(|(c, _, _, _)| confidence > *c) {
                let reasoning = format!(
                    "rule {} matched '{}' covering {:.0}% of the heading",
                    index + 1,
                    found.as_str(),
                    coverage * 100.0
                );
                best = Some((confidence, index, rule.target, reasoning));
            }
        }

        match best {
            Some((confidence, _, target, reasoning)) => FieldMapping {
                source_field: name.to_string(),
                target_field: target,
                confidence,
                reasoning,
                suggested_transformation: transformation_for(target),
            },
            None => FieldMapping::unmapped(name),
        }
    }
}

/// Named transformation hint for the importer, derived from field kind.
fn transformation_for(target: TargetField) -> Option<String> {
    let name = match target.kind() {
        FieldKind::Phone => "phone_digits",
        FieldKind::PersonName => "title_case",
        FieldKind::Email => "lowercase_email",
        FieldKind::Money => "parse_money",
        FieldKind::MultiValue => "split_joined",
        FieldKind::Plain => return None,
    };
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> FieldMapping {
        RuleClassifier::new().classify_one(name)
    }

    #[test]
    fn alias_hit_scores_98() {
        let mapping = classify("E-mail");
        assert_eq!(mapping.target_field, TargetField::Email);
        assert_eq!(mapping.confidence, 98);
    }

    #[test]
    fn alias_hit_is_accent_insensitive() {
        let mapping = classify("Descrição");
        assert_eq!(mapping.target_field, TargetField::Description);
        assert_eq!(mapping.confidence, 98);
    }

    #[test]
    fn high_coverage_match_scores_95() {
        // "telefones" is not an alias; the phone rule matches "telefone",
        // 8 of 9 characters.
        let mapping = classify("Telefones");
        assert_eq!(mapping.target_field, TargetField::Phone);
        assert_eq!(mapping.confidence, 95);
    }

    #[test]
    fn partial_match_keeps_base_confidence() {
        let mapping = classify("telefone comercial secundario");
        assert_eq!(mapping.target_field, TargetField::Phone);
        assert_eq!(mapping.confidence, 80);
    }

    #[test]
    fn sobrenome_is_last_name_not_first() {
        let mapping = classify("Sobrenome do contato");
        assert_eq!(mapping.target_field, TargetField::LastName);
    }

    #[test]
    fn unknown_heading_is_unmapped() {
        let mapping = classify("xyzzy42");
        assert_eq!(mapping.target_field, TargetField::Unmapped);
        assert_eq!(mapping.confidence, 0);
    }

    #[test]
    fn one_mapping_per_column_in_order() {
        let names = vec![
            "Email".to_string(),
            "mystery".to_string(),
            "Telefone".to_string(),
        ];
        let mappings = RuleClassifier::new().classify(&names);
        assert_eq!(mappings.len(), 3);
        assert_eq!(mappings[0].source_field, "Email");
        assert_eq!(mappings[1].target_field, TargetField::Unmapped);
        assert_eq!(mappings[2].target_field, TargetField::Phone);
    }

    #[test]
    fn phone_mapping_suggests_transformation() {
        let mapping = classify("Telefone");
        assert_eq!(
            mapping.suggested_transformation.as_deref(),
            Some("phone_digits")
        );
    }
}
