//! The ordered classification rule table and the alias dictionary.
//!
//! Rules are evaluated in declaration order; earlier rules win ties. The
//! order is a tested property, not an accident of iteration.

use std::sync::LazyLock;

use regex::Regex;

use crmsync_model::TargetField;

/// A single classification rule.
///
/// The pattern is matched against the normalized (lowercased,
/// separator-collapsed) column heading.
pub struct ClassifierRule {
    pub pattern: Regex,
    pub target: TargetField,
    /// Confidence assigned when the match covers ≤60% of the heading.
    pub base_confidence: u8,
}

fn rule(pattern: &str, target: TargetField, base_confidence: u8) -> ClassifierRule {
    ClassifierRule {
        // Patterns are static and vetted by tests.
        pattern: Regex::new(pattern).expect("invalid classifier rule pattern"),
        target,
        base_confidence,
    }
}

/// The rule table, most specific first.
///
/// Declaration order is the tie-break for equal confidence, so rules for
/// narrower fields (MobilePhone, LastName) sit above the broader ones
/// they overlap with (Phone, FirstName).
pub static RULES: LazyLock<Vec<ClassifierRule>> = LazyLock::new(|| {
    vec![
        rule(r"mobile|celular|cell|whatsapp", TargetField::MobilePhone, 85),
        rule(r"e ?mail|correio", TargetField::Email, 85),
        rule(
            r"sobrenome|last ?name|surname",
            TargetField::LastName,
            85,
        ),
        rule(
            r"first ?name|given ?name|\bnome\b",
            TargetField::FirstName,
            80,
        ),
        rule(r"telefone|phone|\bfone\b|\btel\b", TargetField::Phone, 80),
        rule(r"empresa|company|organiza", TargetField::Company, 85),
        rule(r"cargo|title|position", TargetField::Title, 75),
        rule(r"website|web ?site|\bsite\b|\burl\b", TargetField::Website, 75),
        rule(
            r"endereco|address|logradouro|street|\brua\b",
            TargetField::Street,
            75,
        ),
        rule(r"cidade|city", TargetField::City, 80),
        rule(r"estado|state|\buf\b", TargetField::State, 75),
        rule(r"\bcep\b|zip|postal", TargetField::PostalCode, 80),
        rule(r"pais|country", TargetField::Country, 80),
        rule(r"setor|industry|\bramo\b", TargetField::Industry, 70),
        rule(
            r"patrimonio|faturamento|receita|revenue|renda",
            TargetField::AnnualRevenue,
            75,
        ),
        rule(
            r"funcionarios|employees|headcount",
            TargetField::NumberOfEmployees,
            75,
        ),
        rule(
            r"origem|source|fonte|campanha|campaign",
            TargetField::LeadSource,
            70,
        ),
        rule(
            r"descricao|description|observac|notes|\bnota\b|perfil|comentario",
            TargetField::Description,
            65,
        ),
    ]
});

/// Curated exact aliases, keyed by normalized heading.
///
/// An exact hit yields confidence 98, above anything the rule table can
/// produce. Keys must already be in normalized form (see [`normalize_name`]).
pub static ALIASES: &[(&str, TargetField)] = &[
    ("email", TargetField::Email),
    ("e mail", TargetField::Email),
    ("mail", TargetField::Email),
    ("first name", TargetField::FirstName),
    ("nome", TargetField::FirstName),
    ("primeiro nome", TargetField::FirstName),
    ("last name", TargetField::LastName),
    ("sobrenome", TargetField::LastName),
    ("surname", TargetField::LastName),
    ("company", TargetField::Company),
    ("empresa", TargetField::Company),
    ("phone", TargetField::Phone),
    ("telefone", TargetField::Phone),
    ("telefone fixo", TargetField::Phone),
    ("mobile", TargetField::MobilePhone),
    ("celular", TargetField::MobilePhone),
    ("whatsapp", TargetField::MobilePhone),
    ("title", TargetField::Title),
    ("cargo", TargetField::Title),
    ("website", TargetField::Website),
    ("site", TargetField::Website),
    ("street", TargetField::Street),
    ("endereco", TargetField::Street),
    ("logradouro", TargetField::Street),
    ("city", TargetField::City),
    ("cidade", TargetField::City),
    ("state", TargetField::State),
    ("estado", TargetField::State),
    ("uf", TargetField::State),
    ("postal code", TargetField::PostalCode),
    ("cep", TargetField::PostalCode),
    ("zip", TargetField::PostalCode),
    ("zip code", TargetField::PostalCode),
    ("country", TargetField::Country),
    ("pais", TargetField::Country),
    ("industry", TargetField::Industry),
    ("setor", TargetField::Industry),
    ("annual revenue", TargetField::AnnualRevenue),
    ("patrimonio", TargetField::AnnualRevenue),
    ("faturamento", TargetField::AnnualRevenue),
    ("employees", TargetField::NumberOfEmployees),
    ("funcionarios", TargetField::NumberOfEmployees),
    ("lead source", TargetField::LeadSource),
    ("origem", TargetField::LeadSource),
    ("description", TargetField::Description),
    ("descricao", TargetField::Description),
    ("observacoes", TargetField::Description),
    ("notes", TargetField::Description),
    ("perfil", TargetField::Description),
];

/// Look up an exact alias for an already-normalized heading.
#[must_use]
pub fn alias_target(normalized: &str) -> Option<TargetField> {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, target)| *target)
}

/// Normalize a column heading for matching.
///
/// Trims, lowercases, strips diacritics common in Portuguese headings,
/// replaces separators with spaces, and collapses whitespace.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped: String = lowered.chars().map(fold_diacritic).collect();
    stripped
        .replace(['_', '-', '.', '/', ':'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        _ => c,
    }
}
