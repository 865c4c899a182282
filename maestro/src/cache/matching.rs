//! Lookup predicates shared by every cache backend.

use super::scope::{CacheScope, ListMatch, ScopeField};

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Free-text match: the query's words appear contiguously (case-insensitive) in the stored
/// prompt. Punctuation separates words. A query without words matches nothing.
pub fn prompt_matches(stored: &str, query: &str) -> bool {
    let needle = words(query);
    if needle.is_empty() {
        return false;
    }
    let hay = words(stored);
    hay.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Normalized form of a tag value: trimmed and lowercased.
pub fn normalize_tag(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Elements of a comma-separated scope value, normalized for comparison.
pub fn list_elements(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(normalize_tag)
        .filter(|v| !v.is_empty())
        .collect()
}

/// Index keys for a stored value: one per list element, or the single normalized tag.
pub fn index_values(field: ScopeField, value: &str) -> Vec<String> {
    if field.is_list() {
        list_elements(value)
    } else {
        vec![normalize_tag(value)]
    }
}

fn list_matches(stored: &str, query: &str, mode: ListMatch) -> bool {
    let stored = list_elements(stored);
    let query = list_elements(query);
    match mode {
        ListMatch::AnyElement => query.iter().any(|q| stored.contains(q)),
        ListMatch::AllElements => {
            !query.is_empty()
                && query.iter().all(|q| stored.contains(q))
                && stored.iter().all(|s| query.contains(s))
        }
    }
}

/// Whether a stored value satisfies the query value for `field`. Tags compare
/// case-insensitively after trimming.
pub fn field_matches(field: ScopeField, stored: &str, query: &str, mode: ListMatch) -> bool {
    if field.is_list() {
        list_matches(stored, query, mode)
    } else {
        normalize_tag(stored) == normalize_tag(query)
    }
}

/// Conjunctive scope match: every field present in `query` must match the stored entry's
/// value; fields absent from `query` are not filtered. An entry lacking a queried field fails.
pub fn scope_matches(stored: &CacheScope, query: &CacheScope, mode: ListMatch) -> bool {
    query.fields().all(|(field, q)| {
        stored
            .get(field)
            .is_some_and(|s| field_matches(field, s, q, mode))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Prompt match is contiguous word containment, case-insensitive.
    #[test]
    fn prompt_contiguous_words() {
        assert!(prompt_matches("CompetitorList", "competitorlist"));
        assert!(prompt_matches("a markdown editor", "Markdown Editor"));
        assert!(prompt_matches("a markdown editor", "a markdown editor"));
        assert!(!prompt_matches("a markdown editor", "editor markdown"));
        assert!(!prompt_matches("a markdown editor", "mark"));
        assert!(!prompt_matches("anything", "  ..  "));
    }

    /// **Scenario**: Any-element mode matches on one shared competitor.
    #[test]
    fn list_any_element() {
        let f = ScopeField::CompetitorsListStr;
        assert!(field_matches(f, "A, B", "b,C", ListMatch::AnyElement));
        assert!(!field_matches(f, "A,B", "C", ListMatch::AnyElement));
    }

    /// **Scenario**: All-elements mode requires the same set, regardless of order.
    #[test]
    fn list_all_elements() {
        let f = ScopeField::CompetitorsListStr;
        assert!(field_matches(f, "A,B", "b, a", ListMatch::AllElements));
        assert!(!field_matches(f, "A,B", "A", ListMatch::AllElements));
        assert!(!field_matches(f, "A", "A,B", ListMatch::AllElements));
    }

    /// **Scenario**: Omitted query keys do not filter; queried keys missing on the entry fail.
    #[test]
    fn scope_conjunction() {
        let stored = CacheScope::node("nodeCompetitorList").with_feature("stored procedures");
        let q = CacheScope::node("nodeCompetitorList");
        assert!(scope_matches(&stored, &q, ListMatch::AnyElement));
        let q = q.with_feature("Stored Procedures");
        assert!(scope_matches(&stored, &q, ListMatch::AnyElement));
        let q = q.with_user("u1");
        assert!(!scope_matches(&stored, &q, ListMatch::AnyElement));
    }
}
