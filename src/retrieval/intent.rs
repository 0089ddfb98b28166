//! Prerequisite question intent classification
//!
//! Pattern families are evaluated in a fixed order: chain questions
//! ("should I take X before Y") are checked before reverse questions
//! ("what can I take after X") because "before" phrasings routinely contain
//! reverse trigger words like "after" and "next".

use crate::patterns::QueryPatterns;

/// Coarse intent of a prerequisite question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    /// "Should I take X before Y" - relation between two named courses
    PrereqChain,
    /// "What can I take after X" / "what requires X"
    ReversePrereq,
    /// Default: a prerequisite lookup for one course
    Prereq,
}

/// Classify a query by its prerequisite intent
pub fn classify(query: &str, patterns: &QueryPatterns) -> QueryIntent {
    let query_lower = query.to_lowercase();

    if patterns.matches_chain(&query_lower) {
        return QueryIntent::PrereqChain;
    }
    if patterns.matches_reverse(&query_lower) {
        return QueryIntent::ReversePrereq;
    }
    QueryIntent::Prereq
}

/// Finer pass used inside the retriever: is this a "prerequisites FOR X"
/// question?
pub(crate) fn asks_prereqs_for(query_lower: &str, patterns: &QueryPatterns) -> bool {
    patterns
        .prereqs_for_phrases()
        .iter()
        .any(|phrase| query_lower.contains(phrase.as_str()))
}

/// Finer pass used inside the retriever: is this a "what requires X"
/// question? Queries containing "for" are excluded so this bucket never
/// collides with "prerequisites FOR X".
pub(crate) fn asks_what_requires(query_lower: &str, patterns: &QueryPatterns) -> bool {
    if query_lower.contains("for") {
        return false;
    }
    patterns
        .requires_phrases()
        .iter()
        .any(|phrase| query_lower.contains(phrase.as_str()))
}
