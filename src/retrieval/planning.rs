//! Planning query detection
//!
//! Recognizes questions that ask for a recommendation or course sequencing
//! answer rather than a fact about one named course, and extracts the
//! structured signals (department, term, level, completed courses) the
//! retriever needs to answer them from the catalog alone.

use crate::catalog::Term;
use crate::entities::CourseExtractor;
use crate::patterns::QueryPatterns;
use serde::Serialize;

/// Kind of planning question, in detection priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningKind {
    /// Entry-level / foundation-year questions ("what should I take U1?")
    FirstSemester,
    /// "What is available after completing A and B?"
    Available,
    /// "What 200-level COMP courses are there?"
    ByLevel,
    /// Generic recommendation phrasing
    Recommendation,
}

/// Structured interpretation of a planning question, created per request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanningQuery {
    /// None for a partial result: department/term detected but no concrete
    /// planning kind; the retriever uses it for context injection only
    pub kind: Option<PlanningKind>,
    pub department: Option<String>,
    pub term: Option<Term>,
    pub level: Option<u32>,
    /// Course codes extracted for `Available` questions
    pub completed: Vec<String>,
}

/// Detect whether a query is a planning/recommendation question
///
/// Kind decision runs in fixed priority order: first-semester markers win
/// over everything (so "what intro courses do you recommend" is
/// `FirstSemester`, not `Recommendation`), then available-after-completing
/// (which requires at least two course codes so single-course reverse
/// prerequisite questions stay out), then level, then recommendation
/// phrasing. With no kind but a detected department or term a partial
/// result is returned; otherwise None.
pub fn detect_planning_query(
    query: &str,
    patterns: &QueryPatterns,
    extractor: &CourseExtractor,
) -> Option<PlanningQuery> {
    let query_lower = query.to_lowercase();

    let department = patterns.department_of(&query_lower).map(String::from);
    let term = patterns.term_of(&query_lower);
    let level = patterns.level_of(&query_lower);

    if patterns.matches_first_semester(&query_lower) {
        return Some(PlanningQuery {
            kind: Some(PlanningKind::FirstSemester),
            department,
            term,
            level,
            completed: Vec::new(),
        });
    }

    let codes = extractor.extract_course_ids(query);
    if codes.len() >= 2 && patterns.has_available_marker(&query_lower) {
        return Some(PlanningQuery {
            kind: Some(PlanningKind::Available),
            department,
            term,
            level,
            completed: codes,
        });
    }

    if level.is_some() {
        return Some(PlanningQuery {
            kind: Some(PlanningKind::ByLevel),
            department,
            term,
            level,
            completed: Vec::new(),
        });
    }

    if patterns.matches_recommendation(&query_lower) {
        return Some(PlanningQuery {
            kind: Some(PlanningKind::Recommendation),
            department,
            term,
            level,
            completed: Vec::new(),
        });
    }

    // No concrete kind, but a department or term signal is still useful
    // for injecting catalog context around a semantic fallback.
    if department.is_some() || term.is_some() {
        return Some(PlanningQuery {
            kind: None,
            department,
            term,
            level,
            completed: Vec::new(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::QueryPatterns;
    use std::sync::Arc;

    fn fixtures() -> (QueryPatterns, CourseExtractor) {
        let patterns = Arc::new(QueryPatterns::builtin().unwrap());
        let extractor = CourseExtractor::new(patterns.clone());
        (QueryPatterns::builtin().unwrap(), extractor)
    }

    fn detect(query: &str) -> Option<PlanningQuery> {
        let (patterns, extractor) = fixtures();
        detect_planning_query(query, &patterns, &extractor)
    }

    #[test]
    fn test_first_semester_query() {
        let result = detect("What CS courses should I take first semester?").unwrap();
        assert_eq!(result.kind, Some(PlanningKind::FirstSemester));
        assert_eq!(result.department.as_deref(), Some("COMP"));
        assert_eq!(result.term, Some(Term::Fall));
    }

    #[test]
    fn test_u0_and_u1_map_to_first_semester() {
        let result = detect("I'm a U0 student, what math should I start with?").unwrap();
        assert_eq!(result.kind, Some(PlanningKind::FirstSemester));
        assert_eq!(result.department.as_deref(), Some("MATH"));

        let result = detect("Good U1 physics courses?").unwrap();
        assert_eq!(result.kind, Some(PlanningKind::FirstSemester));
    }

    #[test]
    fn test_first_semester_beats_recommendation() {
        // Contains both a first-semester marker and recommendation phrasing
        let result = detect("Can you recommend entry-level CS courses?").unwrap();
        assert_eq!(result.kind, Some(PlanningKind::FirstSemester));
    }

    #[test]
    fn test_no_prereq_phrasing_is_first_semester() {
        let result = detect("What math courses have no prerequisites?").unwrap();
        assert_eq!(result.kind, Some(PlanningKind::FirstSemester));
        assert_eq!(result.department.as_deref(), Some("MATH"));
    }

    #[test]
    fn test_available_requires_two_courses() {
        let result = detect("What's available after completing COMP 250 and MATH 133?").unwrap();
        assert_eq!(result.kind, Some(PlanningKind::Available));
        assert!(result.completed.contains(&"COMP 250".to_string()));
        assert!(result.completed.contains(&"MATH 133".to_string()));
    }

    #[test]
    fn test_single_course_is_not_available_kind() {
        // One course + "after" is a reverse-prerequisite question; only the
        // department signal survives as a partial result
        let result = detect("What can I take after COMP 250?").unwrap();
        assert_eq!(result.kind, None);
        assert!(result.completed.is_empty());
    }

    #[test]
    fn test_by_level_query() {
        let result = detect("What 200-level COMP courses are there?").unwrap();
        assert_eq!(result.kind, Some(PlanningKind::ByLevel));
        assert_eq!(result.level, Some(200));
        assert_eq!(result.department.as_deref(), Some("COMP"));
    }

    #[test]
    fn test_second_year_maps_to_level() {
        let result = detect("What should a second year psychology student take?").unwrap();
        assert_eq!(result.level, Some(200));
        assert_eq!(result.department.as_deref(), Some("PSYC"));
    }

    #[test]
    fn test_graduate_level() {
        let result = detect("Show me graduate chemistry courses by level").unwrap();
        assert_eq!(result.level, Some(500));
    }

    #[test]
    fn test_recommendation_query() {
        let result = detect("Can you suggest some good sociology courses?").unwrap();
        assert_eq!(result.kind, Some(PlanningKind::Recommendation));
        assert_eq!(result.department.as_deref(), Some("SOCI"));
    }

    #[test]
    fn test_partial_result_for_department_only() {
        let result = detect("What anthropology courses run in winter?").unwrap();
        assert_eq!(result.kind, None);
        assert_eq!(result.department.as_deref(), Some("ANTH"));
        assert_eq!(result.term, Some(Term::Winter));
    }

    #[test]
    fn test_not_a_planning_query() {
        assert_eq!(detect("hello there"), None);
    }
}
