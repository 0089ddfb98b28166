//! Course code extraction using the pattern tables

use crate::catalog::course_code_regex;
use crate::patterns::QueryPatterns;
use ahash::AHashSet;
use std::sync::Arc;

/// Extracts canonical course codes from query text
///
/// All extraction is separator- and case-insensitive: "comp250", "COMP-250"
/// and "Comp 250" all normalize to "COMP 250".
#[derive(Clone)]
pub struct CourseExtractor {
    patterns: Arc<QueryPatterns>,
}

impl CourseExtractor {
    pub fn new(patterns: Arc<QueryPatterns>) -> Self {
        Self { patterns }
    }

    /// Replace course nicknames with canonical course codes
    pub fn replace_aliases(&self, query: &str) -> String {
        self.patterns.apply_aliases(query)
    }

    /// Extract every course code in the query, normalized, in order of
    /// appearance, deduplicated, with deny-listed department words dropped
    ///
    /// "Can I take PHYS 230 and phys-258?" -> ["PHYS 230", "PHYS 258"]
    pub fn extract_course_ids(&self, query: &str) -> Vec<String> {
        let mut seen = AHashSet::new();
        let mut result = Vec::new();
        for caps in course_code_regex().captures_iter(query) {
            let dept = caps[1].to_uppercase();
            if self.patterns.is_denied_code(&dept) {
                continue;
            }
            let course_id = format!("{} {}", dept, caps[2].to_uppercase());
            if seen.insert(course_id.clone()) {
                result.push(course_id);
            }
        }
        result
    }

    /// First course code in the query, if any
    pub fn extract_primary(&self, query: &str) -> Option<String> {
        self.extract_course_ids(query).into_iter().next()
    }

    /// Whether the query names at least one real (non-deny-listed) course
    pub fn has_specific_course(&self, query: &str) -> bool {
        !self.extract_course_ids(query).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::QueryPatterns;

    fn extractor() -> CourseExtractor {
        CourseExtractor::new(Arc::new(QueryPatterns::builtin().unwrap()))
    }

    #[test]
    fn test_extract_standard_format() {
        let e = extractor();
        assert_eq!(
            e.extract_course_ids("What are the prerequisites for COMP 250?"),
            vec!["COMP 250"]
        );
    }

    #[test]
    fn test_extract_separator_variants() {
        let e = extractor();
        assert_eq!(e.extract_course_ids("Tell me about COMP-250"), vec!["COMP 250"]);
        assert_eq!(e.extract_course_ids("Tell me about COMP250"), vec!["COMP 250"]);
        assert_eq!(e.extract_course_ids("tell me about comp 250"), vec!["COMP 250"]);
    }

    #[test]
    fn test_extract_mixed_case() {
        let e = extractor();
        assert_eq!(e.extract_course_ids("is Comp 250 hard?"), vec!["COMP 250"]);
    }

    #[test]
    fn test_extract_letter_suffix() {
        let e = extractor();
        assert_eq!(e.extract_course_ids("about comp 202d"), vec!["COMP 202D"]);
    }

    #[test]
    fn test_extract_multiple_ordered_deduplicated() {
        let e = extractor();
        assert_eq!(
            e.extract_course_ids("Can I take PHYS 230 and PHYS 258 after PHYS 230?"),
            vec!["PHYS 230", "PHYS 258"]
        );
    }

    #[test]
    fn test_deny_list_guards_false_positives() {
        let e = extractor();
        // "WHAT 200" looks like a course code but isn't
        assert!(e.extract_course_ids("what 200-level courses are there").is_empty());
        assert!(!e.has_specific_course("which courses should I take 300"));
    }

    #[test]
    fn test_real_code_next_to_denied_word() {
        let e = extractor();
        assert_eq!(
            e.extract_course_ids("what 200-level courses come after COMP 250?"),
            vec!["COMP 250"]
        );
    }

    #[test]
    fn test_alias_then_extract() {
        let e = extractor();
        let expanded = e.replace_aliases("What do I need for Calc 2?");
        assert_eq!(expanded, "What do I need for MATH 141?");
        assert_eq!(e.extract_course_ids(&expanded), vec!["MATH 141"]);
    }

    #[test]
    fn test_no_codes() {
        let e = extractor();
        assert!(e
            .extract_course_ids("recommend me some interesting courses")
            .is_empty());
        assert_eq!(e.extract_primary("hello"), None);
    }
}
