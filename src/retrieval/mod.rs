//! Query understanding and hybrid retrieval
//!
//! A query flows through alias substitution and course-code extraction,
//! then intent classification and planning detection, and finally the
//! hybrid retriever dispatches to a structured catalog lookup or falls
//! back to semantic search. The assembled [`RetrievalResult`] is the
//! contract handed to the answer-generation layer.

mod hybrid;
mod intent;
mod planning;
mod title;

pub use hybrid::HybridRetriever;
pub use intent::{classify, QueryIntent};
pub use planning::{detect_planning_query, PlanningKind, PlanningQuery};
pub use title::{TitleIndex, TitleMatch};

use crate::catalog::{CourseRecord, Term};
use crate::error::Result;
use serde::Serialize;

/// Where a retrieved course came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOrigin {
    /// Exact structural catalog match; always scored 0.0
    Structured,
    /// Embedding similarity hit; scored by ascending distance
    Semantic,
}

/// One retrieved course reference
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedCourse {
    pub course_id: String,
    /// 0.0 for structural matches, embedding distance for semantic ones
    pub score: f32,
    pub origin: MatchOrigin,
    /// Set when the course was resolved from an ambiguous title
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub needs_clarification: bool,
    /// Candidate course ids when ambiguous; always contains the default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<String>>,
}

impl RetrievedCourse {
    pub fn structured(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            score: 0.0,
            origin: MatchOrigin::Structured,
            needs_clarification: false,
            alternatives: None,
        }
    }

    pub fn semantic(course_id: impl Into<String>, distance: f32) -> Self {
        Self {
            course_id: course_id.into(),
            score: distance,
            origin: MatchOrigin::Semantic,
            needs_clarification: false,
            alternatives: None,
        }
    }

    fn with_alternatives(mut self, alternatives: Option<Vec<String>>) -> Self {
        if let Some(alts) = alternatives {
            if alts.len() > 1 {
                self.needs_clarification = true;
                self.alternatives = Some(alts);
            }
        }
        self
    }
}

/// Planning outcome attached to a retrieval result
#[derive(Debug, Clone, Serialize)]
pub struct PlanningOutcome {
    pub kind: PlanningKind,
    pub department: Option<String>,
    pub term: Option<Term>,
    pub level: Option<u32>,
    pub completed: Vec<String>,
    /// Materialized course records backing the hits
    pub courses: Vec<CourseRecord>,
}

/// Evidence set handed to the answer-generation layer
#[derive(Debug, Clone, Serialize, Default)]
pub struct RetrievalResult {
    /// Ordered hits: structural matches first, then semantic matches by
    /// ascending distance
    pub hits: Vec<RetrievedCourse>,
    /// Present when the query was answered as a planning query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning: Option<PlanningOutcome>,
}

impl RetrievalResult {
    pub fn is_planning_query(&self) -> bool {
        self.planning.is_some()
    }

    pub fn needs_clarification(&self) -> bool {
        self.hits.first().is_some_and(|h| h.needs_clarification)
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn course_ids(&self) -> Vec<String> {
        self.hits.iter().map(|h| h.course_id.clone()).collect()
    }

    /// Restore the contract ordering after mixing structural and semantic
    /// hits: structural first (stable), semantic by ascending distance
    fn sort_hits(&mut self) {
        self.hits.sort_by(|a, b| {
            use std::cmp::Ordering;
            match (a.origin, b.origin) {
                (MatchOrigin::Structured, MatchOrigin::Semantic) => Ordering::Less,
                (MatchOrigin::Semantic, MatchOrigin::Structured) => Ordering::Greater,
                (MatchOrigin::Structured, MatchOrigin::Structured) => Ordering::Equal,
                (MatchOrigin::Semantic, MatchOrigin::Semantic) => {
                    a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal)
                }
            }
        });
    }
}

/// Optional query-rewriting capability injected into the retriever
///
/// The structural and planning paths never consult it; only the semantic
/// fallback offers the query for rewriting. Failures fall back to the
/// original query, so an unreliable implementation degrades gracefully.
pub trait QueryReformulator: Send + Sync {
    fn reformulate(&self, query: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_hits_structural_before_semantic() {
        let mut result = RetrievalResult {
            hits: vec![
                RetrievedCourse::semantic("COMP 424", 0.9),
                RetrievedCourse::structured("COMP 250"),
                RetrievedCourse::semantic("COMP 551", 0.4),
            ],
            planning: None,
        };
        result.sort_hits();
        let ids = result.course_ids();
        assert_eq!(ids, vec!["COMP 250", "COMP 551", "COMP 424"]);
    }

    #[test]
    fn test_with_alternatives_requires_multiple() {
        let hit = RetrievedCourse::structured("COMP 310")
            .with_alternatives(Some(vec!["COMP 310".to_string()]));
        assert!(!hit.needs_clarification);

        let hit = RetrievedCourse::structured("COMP 310").with_alternatives(Some(vec![
            "COMP 310".to_string(),
            "ECSE 427".to_string(),
        ]));
        assert!(hit.needs_clarification);
        assert_eq!(hit.alternatives.unwrap().len(), 2);
    }
}
