//! Pure per-field value transforms.
//!
//! Each transform is keyed by the target field's [`FieldKind`]; none of
//! them touch anything beyond the value they are given.

use crmsync_model::{CandidateRecord, FieldKind, TargetField};

/// Phone values with fewer digits than this are emptied rather than kept.
const MIN_PHONE_DIGITS: usize = 8;

/// Upper bound on separator insertions when splitting run-together text.
const MAX_SPLIT_ITERATIONS: usize = 256;

/// Separator inserted between run-together values.
const VALUE_SEPARATOR: &str = "; ";

/// Connector words kept lowercase inside a person name.
pub const DEFAULT_CONNECTORS: &[&str] =
    &["da", "de", "do", "das", "dos", "e", "di", "van", "von", "der"];

/// Tunable normalization behavior.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Value used when a monetary string cannot be parsed.
    pub money_default: f64,
    /// Name connectors kept lowercase unless first or last token.
    pub connectors: Vec<String>,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            money_default: 0.0,
            connectors: DEFAULT_CONNECTORS.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

/// Strip a phone value down to digits and an optional leading plus.
///
/// Values with fewer than [`MIN_PHONE_DIGITS`] digits are considered noise
/// (extensions, placeholders) and come back empty.
#[must_use]
pub fn clean_phone(value: &str) -> String {
    let mut out = String::new();
    for c in value.trim().chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '+' && out.is_empty() {
            out.push('+');
        }
    }

    let digits = out.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < MIN_PHONE_DIGITS {
        String::new()
    } else {
        out
    }
}

/// Title-case a person name, keeping connector words lowercase unless
/// they are the first or last token.
#[must_use]
pub fn title_case_name(value: &str, connectors: &[String]) -> String {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    let last = tokens.len().saturating_sub(1);

    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let lowered = token.to_lowercase();
            let is_connector = connectors.iter().any(|c| *c == lowered);
            if is_connector && i != 0 && i != last {
                lowered
            } else {
                capitalize(&lowered)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Trim and lowercase an email address.
#[must_use]
pub fn clean_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Parse a monetary string into a plain number.
///
/// Understands currency symbols, Brazilian thousands separators
/// (`R$ 1.500.000`), decimal commas, and "N million"/"N milhões"
/// phrasing. Unparseable input yields `default`.
#[must_use]
pub fn convert_money(value: &str, default: f64) -> f64 {
    let lowered = value.trim().to_lowercase();
    if lowered.is_empty() {
        return default;
    }

    // Word multipliers. "mil" is a substring of "milhão"/"million", so the
    // million forms are tested first.
    let (multiplier, has_word) = if lowered.contains("million")
        || lowered.contains("milhao")
        || lowered.contains("milhão")
        || lowered.contains("milhoes")
        || lowered.contains("milhões")
        || lowered.contains("mm")
    {
        (1_000_000.0, true)
    } else if lowered.contains("thousand") || lowered.contains("mil") {
        (1_000.0, true)
    } else {
        (1.0, false)
    };

    let numeric: String = lowered
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-')
        .collect();
    if numeric.is_empty() {
        return default;
    }

    match parse_separated_number(&numeric, has_word) {
        Some(n) => n * multiplier,
        None => default,
    }
}

/// Interpret `.` and `,` in a numeral.
///
/// With a word multiplier present ("2.5 million"), a single separator is a
/// decimal point. Otherwise grouped triples ("1.500.000", "1,500,000") are
/// thousands separators, and a lone trailing pair ("1500,75") is a decimal
/// comma.
fn parse_separated_number(numeric: &str, word_multiplier: bool) -> Option<f64> {
    let dots = numeric.matches('.').count();
    let commas = numeric.matches(',').count();

    if dots == 0 && commas == 0 {
        return numeric.parse().ok();
    }

    if word_multiplier && dots + commas == 1 {
        return numeric.replace(',', ".").parse().ok();
    }

    if dots > 0 && commas > 0 {
        // The rightmost separator is the decimal one.
        let last_dot = numeric.rfind('.').unwrap_or(0);
        let last_comma = numeric.rfind(',').unwrap_or(0);
        let cleaned = if last_dot > last_comma {
            numeric.replace(',', "")
        } else {
            numeric.replace('.', "").replace(',', ".")
        };
        return cleaned.parse().ok();
    }

    let (sep, count) = if dots > 0 { ('.', dots) } else { (',', commas) };
    let trailing = numeric.rsplit(sep).next().unwrap_or("");

    if count > 1 || trailing.len() == 3 {
        // Grouped thousands: every separator drops out.
        numeric.replace(sep, "").parse().ok()
    } else {
        // Single separator with a non-triple tail is a decimal mark.
        numeric.replace(',', ".").parse().ok()
    }
}

/// Split run-together values by inserting a separator at every boundary
/// where a lowercase run meets a capitalized word.
///
/// `"ModeradoRegular"` becomes `"Moderado; Regular"`. Already-separated
/// text passes through unchanged. Each pass inserts at most one separator
/// and insertion destroys the boundary it fixed, so the loop terminates;
/// [`MAX_SPLIT_ITERATIONS`] bounds it regardless.
#[must_use]
pub fn split_joined_values(value: &str) -> String {
    let mut out = value.to_string();
    for _ in 0..MAX_SPLIT_ITERATIONS {
        let Some(pos) = joined_boundary(&out) else {
            return out;
        };
        out.insert_str(pos, VALUE_SEPARATOR);
    }
    out
}

/// Byte offset of the first lowercase→uppercase boundary, if any.
fn joined_boundary(s: &str) -> Option<usize> {
    let mut prev: Option<char> = None;
    for (i, c) in s.char_indices() {
        if let Some(p) = prev {
            if p.is_lowercase() && c.is_uppercase() {
                return Some(i);
            }
        }
        prev = Some(c);
    }
    None
}

/// Normalize one raw value according to its target field's kind.
#[must_use]
pub fn normalize_value(field: TargetField, raw: &str, options: &NormalizeOptions) -> String {
    match field.kind() {
        FieldKind::Phone => clean_phone(raw),
        FieldKind::PersonName => title_case_name(raw, &options.connectors),
        FieldKind::Email => clean_email(raw),
        FieldKind::Money => format_money(convert_money(raw, options.money_default)),
        FieldKind::MultiValue => split_joined_values(raw.trim()),
        FieldKind::Plain => raw.trim().to_string(),
    }
}

/// Normalize every field of a record.
#[must_use]
pub fn normalize_record(record: &CandidateRecord, options: &NormalizeOptions) -> CandidateRecord {
    record
        .iter()
        .map(|(field, raw)| (field, normalize_value(field, raw, options)))
        .collect()
}

fn format_money(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{}", amount as i64)
    } else {
        format!("{amount}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> NormalizeOptions {
        NormalizeOptions::default()
    }

    #[test]
    fn phone_keeps_digits_and_leading_plus() {
        assert_eq!(clean_phone("+55 (19) 99876-5432"), "+5519998765432");
        assert_eq!(clean_phone("(11) 4002-8922"), "1140028922");
    }

    #[test]
    fn short_phone_is_emptied() {
        assert_eq!(clean_phone("4002"), "");
        assert_eq!(clean_phone("ramal 123"), "");
    }

    #[test]
    fn name_title_case_keeps_connectors_lowercase() {
        let connectors = opts().connectors;
        assert_eq!(
            title_case_name("MARIA DA SILVA", &connectors),
            "Maria da Silva"
        );
        assert_eq!(
            title_case_name("joão de souza dos santos", &connectors),
            "João de Souza dos Santos"
        );
    }

    #[test]
    fn connector_as_first_or_last_token_is_capitalized() {
        let connectors = opts().connectors;
        assert_eq!(title_case_name("da silva", &connectors), "Da Silva");
        assert_eq!(title_case_name("maria da", &connectors), "Maria Da");
    }

    #[test]
    fn email_lowercased_and_trimmed() {
        assert_eq!(clean_email("  Ana.Souza@Example.COM "), "ana.souza@example.com");
    }

    #[test]
    fn money_brazilian_thousands() {
        assert_eq!(convert_money("R$ 1.500.000", 0.0), 1_500_000.0);
        assert_eq!(convert_money("1,500,000", 0.0), 1_500_000.0);
    }

    #[test]
    fn money_million_phrasing() {
        assert_eq!(convert_money("2 million", 0.0), 2_000_000.0);
        assert_eq!(convert_money("2 milhões", 0.0), 2_000_000.0);
        assert_eq!(convert_money("1.5 million", 0.0), 1_500_000.0);
    }

    #[test]
    fn money_decimal_comma() {
        assert_eq!(convert_money("1500,75", 0.0), 1500.75);
    }

    #[test]
    fn money_unparseable_returns_default() {
        assert_eq!(convert_money("a combinar", -1.0), -1.0);
        assert_eq!(convert_money("", -1.0), -1.0);
    }

    #[test]
    fn split_inserts_separator_at_joined_boundaries() {
        assert_eq!(split_joined_values("ModeradoRegular"), "Moderado; Regular");
        assert_eq!(
            split_joined_values("ArrojadoQualificadoAgressivo"),
            "Arrojado; Qualificado; Agressivo"
        );
    }

    #[test]
    fn split_leaves_separated_text_unchanged() {
        assert_eq!(
            split_joined_values("Moderado; Regular"),
            "Moderado; Regular"
        );
        assert_eq!(split_joined_values("plain text"), "plain text");
    }

    #[test]
    fn normalize_value_dispatches_by_kind() {
        let options = opts();
        assert_eq!(
            normalize_value(TargetField::Email, " X@Y.com ", &options),
            "x@y.com"
        );
        assert_eq!(
            normalize_value(TargetField::AnnualRevenue, "R$ 1.500.000", &options),
            "1500000"
        );
        assert_eq!(
            normalize_value(TargetField::City, "  Campinas ", &options),
            "Campinas"
        );
    }

    #[test]
    fn normalize_record_covers_all_fields() {
        let mut record = CandidateRecord::new();
        record.set(TargetField::Email, " Ana@Example.com");
        record.set(TargetField::Phone, "(19) 3233-1122");
        record.set(TargetField::Description, "ModeradoRegular");

        let normalized = normalize_record(&record, &opts());
        assert_eq!(normalized.get(TargetField::Email), Some("ana@example.com"));
        assert_eq!(normalized.get(TargetField::Phone), Some("1932331122"));
        assert_eq!(
            normalized.get(TargetField::Description),
            Some("Moderado; Regular")
        );
    }
}
