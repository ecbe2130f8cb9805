//! Pattern-based query classification.
//!
//! An ordered rule table evaluated first-match-wins. The order is part of
//! the contract: a query like "List the requirements in Section 4" matches
//! both the section rule and the list rule, and must deterministically
//! resolve to the earlier one. Priority, highest first:
//!
//! 1. definition phrasing
//! 2. explicit section/appendix/chapter reference
//! 3. enumeration/list phrasing
//! 4. yes/no polar-question openers
//! 5. procedure/how-to phrasing
//! 6. default: general

use regex::Regex;
use std::sync::LazyLock;

use crate::types::QueryType;

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    // "Section 4", "Appendix B", "Chapter 12", "Table 5.1", or a bare
    // dotted clause number like "4.2.1".
    Regex::new(r"(?i)\b(section|appendix|chapter|annex|article|clause|table|figure)\s+[a-z0-9]|\b\d+\.\d+(\.\d+)*\b")
        .expect("section regex is valid")
});

struct Rule {
    query_type: QueryType,
    matches: fn(&str) -> bool,
}

static RULES: &[Rule] = &[
    Rule { query_type: QueryType::Definition, matches: is_definition },
    Rule { query_type: QueryType::SpecificSection, matches: is_section_reference },
    Rule { query_type: QueryType::List, matches: is_list },
    Rule { query_type: QueryType::YesNo, matches: is_yes_no },
    Rule { query_type: QueryType::Procedure, matches: is_procedure },
];

/// Classify a query into a type tag. Pure function: identical input always
/// yields identical output.
pub fn classify(query: &str) -> QueryType {
    let q = query.trim().to_lowercase();
    RULES
        .iter()
        .find(|rule| (rule.matches)(&q))
        .map(|rule| rule.query_type)
        .unwrap_or(QueryType::General)
}

fn is_definition(q: &str) -> bool {
    q.starts_with("what is")
        || q.starts_with("what are the definitions")
        || q.starts_with("what does")
        || q.starts_with("define ")
        || q.contains("definition of")
        || q.contains("meaning of")
        || q.contains(" mean by ")
        || q.ends_with(" mean?")
        || q.ends_with(" mean")
}

fn is_section_reference(q: &str) -> bool {
    SECTION_RE.is_match(q)
}

fn is_list(q: &str) -> bool {
    q.starts_with("list ")
        || q.starts_with("enumerate")
        || q.starts_with("name all")
        || q.starts_with("what are all")
        || q.contains("list of")
        || q.contains(" all the ")
        || (q.starts_with("what are") && q.contains(" requirements"))
}

fn is_yes_no(q: &str) -> bool {
    const OPENERS: &[&str] = &[
        "is ", "are ", "does ", "do ", "can ", "must ", "shall ", "should ", "may ", "will ",
        "would ", "has ", "have ",
    ];
    OPENERS.iter().any(|opener| q.starts_with(opener))
}

fn is_procedure(q: &str) -> bool {
    q.starts_with("how do")
        || q.starts_with("how to")
        || q.starts_with("how can")
        || q.starts_with("how should")
        || q.contains("steps to")
        || q.contains("steps for")
        || q.contains("procedure for")
        || q.contains("process for")
        || q.contains("how is") && q.contains("performed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_query() {
        assert_eq!(classify("What is occupancy classification?"), QueryType::Definition);
        assert_eq!(classify("define fire barrier"), QueryType::Definition);
        assert_eq!(classify("What does 'means of egress' mean?"), QueryType::Definition);
    }

    #[test]
    fn test_section_query() {
        assert_eq!(classify("Section 4.2.1 requirements"), QueryType::SpecificSection);
        assert_eq!(classify("what requirements apply per Appendix B"), QueryType::SpecificSection);
        assert_eq!(classify("summarize chapter 7"), QueryType::SpecificSection);
    }

    #[test]
    fn test_list_query() {
        assert_eq!(classify("List all exit requirements"), QueryType::List);
        assert_eq!(classify("enumerate the required inspections"), QueryType::List);
        assert_eq!(classify("what are the documentation requirements"), QueryType::List);
    }

    #[test]
    fn test_yes_no_query() {
        assert_eq!(classify("Is a fire watch required during hot work?"), QueryType::YesNo);
        assert_eq!(classify("must exits be illuminated"), QueryType::YesNo);
    }

    #[test]
    fn test_procedure_query() {
        assert_eq!(classify("How do I file a variance request?"), QueryType::Procedure);
        assert_eq!(classify("what is the procedure for annual testing"), QueryType::Definition);
        assert_eq!(classify("steps to obtain an occupancy permit"), QueryType::Procedure);
    }

    #[test]
    fn test_general_default() {
        assert_eq!(classify("fire extinguisher placement near kitchens"), QueryType::General);
        assert_eq!(classify(""), QueryType::General);
    }

    #[test]
    fn test_priority_section_beats_list() {
        // Matches both the list rule and the section rule; section is
        // checked first, so it wins.
        assert_eq!(classify("List the requirements in Section 4"), QueryType::SpecificSection);
    }

    #[test]
    fn test_priority_definition_beats_yes_no() {
        // "what is" wins over nothing here, but "is" as a non-leading word
        // must not trigger the polar rule.
        assert_eq!(classify("What is a fire damper?"), QueryType::Definition);
    }

    #[test]
    fn test_deterministic() {
        let query = "Can portable heaters be used in patient rooms?";
        let first = classify(query);
        for _ in 0..10 {
            assert_eq!(classify(query), first);
        }
    }
}
