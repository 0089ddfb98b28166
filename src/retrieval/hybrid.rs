//! Hybrid retriever combining structured catalog lookups with semantic search
//!
//! Decision tree, in order: planning questions get exact catalog fetches;
//! "prerequisites for X" fetches X itself; "what requires X" walks the
//! prerequisite graph (or scans prerequisite sentences); explicit course
//! codes are fetched directly; everything else falls back to embedding
//! similarity, optionally mixed with department-scoped catalog context.
//!
//! Structural matches always score 0.0 and sort ahead of semantic matches.
//! Absence of a match is an empty result, never an error; only real store
//! or index failures propagate.

use crate::catalog::{
    available_courses, courses_by_level, entry_level_courses, CourseRecord, CourseStore,
};
use crate::config::RetrievalConfig;
use crate::embedding::SimilarityIndex;
use crate::entities::CourseExtractor;
use crate::error::Result;
use crate::patterns::QueryPatterns;
use crate::retrieval::{
    detect_planning_query, intent, PlanningKind, PlanningOutcome, PlanningQuery, QueryReformulator,
    RetrievalResult, RetrievedCourse, TitleIndex,
};
use ahash::AHashSet;
use std::sync::{Arc, OnceLock};

/// Request-scoped hybrid retriever
///
/// Stateless apart from the lazily-built title index. Construct once per
/// process and share; `warm()` pre-builds the index so tests can control
/// warm/cold states deterministically.
pub struct HybridRetriever {
    store: Arc<dyn CourseStore>,
    similarity: Arc<dyn SimilarityIndex>,
    patterns: Arc<QueryPatterns>,
    extractor: CourseExtractor,
    reformulator: Option<Arc<dyn QueryReformulator>>,
    title_index: OnceLock<TitleIndex>,
    config: RetrievalConfig,
}

impl HybridRetriever {
    pub fn new(
        store: Arc<dyn CourseStore>,
        similarity: Arc<dyn SimilarityIndex>,
        patterns: Arc<QueryPatterns>,
        config: RetrievalConfig,
    ) -> Self {
        let extractor = CourseExtractor::new(patterns.clone());
        Self {
            store,
            similarity,
            patterns,
            extractor,
            reformulator: None,
            title_index: OnceLock::new(),
            config,
        }
    }

    /// Attach an optional query-rewriting capability; the structural and
    /// planning paths never consult it
    pub fn with_reformulator(mut self, reformulator: Arc<dyn QueryReformulator>) -> Self {
        self.reformulator = Some(reformulator);
        self
    }

    /// Pre-build the title index
    pub fn warm(&self) -> Result<()> {
        self.title_index()?;
        Ok(())
    }

    /// Whether the title index has been built
    pub fn ready(&self) -> bool {
        self.title_index.get().is_some()
    }

    /// Lazily-built title index. Racing builds are harmless: construction
    /// is deterministic, so a losing build produces an identical index and
    /// is discarded.
    fn title_index(&self) -> Result<&TitleIndex> {
        if let Some(index) = self.title_index.get() {
            return Ok(index);
        }
        let built = TitleIndex::build(self.store.as_ref(), &self.config.preferred_department)?;
        tracing::debug!(titles = built.len(), "title index built");
        Ok(self.title_index.get_or_init(|| built))
    }

    /// Answer a free-text question with an ordered evidence set
    pub fn search(&self, query: &str, max_results: usize) -> Result<RetrievalResult> {
        let query = self.extractor.replace_aliases(query);
        let query_lower = query.to_lowercase();
        let codes = self.extractor.extract_course_ids(&query);
        tracing::debug!(query = %query, codes = ?codes, "hybrid search");

        // Planning questions are recognized only when the query names no
        // real course - a question about a named course always takes
        // priority - except the multi-course "available after completing
        // A and B" form, which is planning by construction.
        let planning = if codes.is_empty()
            || (codes.len() >= 2 && self.patterns.has_available_marker(&query_lower))
        {
            detect_planning_query(&query, &self.patterns, &self.extractor)
        } else {
            None
        };

        if let Some(p) = planning.as_ref() {
            if p.kind.is_some() {
                if let Some(result) = self.planning_results(p)? {
                    return Ok(result);
                }
                // Planning fetch came back empty; fall through to the
                // remaining strategies rather than reporting nothing.
            }
        }

        // Primary course reference: an explicit code is never ambiguous;
        // title resolution may be.
        let (course_id, alternatives) = match codes.first() {
            Some(code) => (Some(code.clone()), None),
            None => {
                match self.title_index()?.resolve(
                    &query,
                    &self.patterns,
                    self.config.min_title_match_len,
                ) {
                    Some(m) => (Some(m.course_id), m.alternatives),
                    None => (None, None),
                }
            }
        };

        if let Some(id) = course_id.as_deref() {
            if intent::asks_prereqs_for(&query_lower, &self.patterns) {
                // "Prerequisites FOR X": the answer lives on X's own record
                if let Some(course) = self.store.get_course(id)? {
                    let hit = RetrievedCourse::structured(course.id)
                        .with_alternatives(alternatives.clone());
                    return Ok(RetrievalResult {
                        hits: vec![hit],
                        planning: None,
                    });
                }
                // Unknown course: give semantic search a chance instead of
                // failing the request.
            } else if intent::asks_what_requires(&query_lower, &self.patterns) {
                return self.reverse_lookup(id);
            }
        }

        // Explicit course codes with no clear prerequisite intent: fetch
        // them all directly (supports multi-course comparison questions).
        if !codes.is_empty() {
            let mut hits = Vec::new();
            for code in &codes {
                if self.store.get_course(code)?.is_some() {
                    hits.push(RetrievedCourse::structured(code.clone()));
                }
            }
            if !hits.is_empty() {
                // Disambiguation flags apply to the first course only
                let first = hits.remove(0).with_alternatives(alternatives);
                hits.insert(0, first);
                return Ok(RetrievalResult {
                    hits,
                    planning: None,
                });
            }
        } else if let Some(id) = course_id {
            // Title-resolved course with no specific intent ("Tell me
            // about Operating Systems")
            if let Some(course) = self.store.get_course(&id)? {
                let hit =
                    RetrievedCourse::structured(course.id).with_alternatives(alternatives);
                return Ok(RetrievalResult {
                    hits: vec![hit],
                    planning: None,
                });
            }
        }

        self.semantic_fallback(&query, max_results, planning.as_ref())
    }

    /// Post-retrieval hydration: full records for the given ids, input
    /// order preserved, absent ids skipped
    pub fn enrich(&self, course_ids: &[String]) -> Result<Vec<CourseRecord>> {
        self.store.get_courses(course_ids)
    }

    /// Hydration plus one hop along prerequisite/corequisite sentences, so
    /// the answer layer can reason about the surrounding chain
    pub fn enrich_with_mentions(&self, course_ids: &[String]) -> Result<Vec<CourseRecord>> {
        let mut docs = self.store.get_courses(course_ids)?;
        let mut existing: AHashSet<String> = docs.iter().map(|d| d.id.clone()).collect();
        let mut extra = Vec::new();
        for doc in &docs {
            for text in [&doc.prereq_text, &doc.coreq_text] {
                for cid in self.extractor.extract_course_ids(text) {
                    if existing.insert(cid.clone()) {
                        extra.push(cid);
                    }
                }
            }
        }
        if !extra.is_empty() {
            docs.extend(self.store.get_courses(&extra)?);
        }
        Ok(docs)
    }

    /// Structured fetch for a concrete planning kind; None when it yields
    /// nothing so the caller can fall through
    fn planning_results(&self, p: &PlanningQuery) -> Result<Option<RetrievalResult>> {
        let Some(kind) = p.kind else {
            return Ok(None);
        };
        let store = self.store.as_ref();
        let dept = p.department.as_deref();

        let courses = match kind {
            PlanningKind::FirstSemester => {
                entry_level_courses(store, dept, p.term, self.config.entry_level_limit)?
            }
            PlanningKind::ByLevel => match dept {
                Some(d) => courses_by_level(
                    store,
                    d,
                    p.level.unwrap_or(100),
                    p.term,
                    self.config.by_level_limit,
                )?,
                None => Vec::new(),
            },
            PlanningKind::Available => {
                if p.completed.is_empty() {
                    Vec::new()
                } else {
                    available_courses(
                        store,
                        &p.completed,
                        dept,
                        p.term,
                        self.config.available_limit,
                    )?
                }
            }
            PlanningKind::Recommendation => match dept {
                Some(d) => match p.level {
                    Some(level) if level >= 200 => {
                        courses_by_level(store, d, level, p.term, self.config.by_level_limit)?
                    }
                    _ => entry_level_courses(
                        store,
                        Some(d),
                        p.term,
                        self.config.entry_level_limit,
                    )?,
                },
                None => Vec::new(),
            },
        };

        if courses.is_empty() {
            return Ok(None);
        }

        tracing::debug!(kind = ?kind, count = courses.len(), "planning lookup");
        let hits = courses
            .iter()
            .map(|c| RetrievedCourse::structured(c.id.clone()))
            .collect();
        Ok(Some(RetrievalResult {
            hits,
            planning: Some(PlanningOutcome {
                kind,
                department: p.department.clone(),
                term: p.term,
                level: p.level,
                completed: p.completed.clone(),
                courses,
            }),
        }))
    }

    /// "What requires X": edge table when populated, prerequisite sentence
    /// scan otherwise. An empty result is a valid answer.
    fn reverse_lookup(&self, course_id: &str) -> Result<RetrievalResult> {
        let courses = self.store.find_courses_mentioning(course_id)?;
        tracing::debug!(course = course_id, count = courses.len(), "reverse lookup");

        let mut seen = AHashSet::new();
        let hits = courses
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .map(|c| RetrievedCourse::structured(c.id))
            .collect();
        Ok(RetrievalResult {
            hits,
            planning: None,
        })
    }

    /// Embedding similarity search, optionally re-injecting department
    /// context detected by the planning pass
    fn semantic_fallback(
        &self,
        query: &str,
        max_results: usize,
        planning: Option<&PlanningQuery>,
    ) -> Result<RetrievalResult> {
        let search_query = match &self.reformulator {
            Some(r) => match r.reformulate(query) {
                Ok(rewritten) => {
                    tracing::debug!(original = %query, rewritten = %rewritten, "query reformulated");
                    rewritten
                }
                Err(e) => {
                    tracing::warn!("query reformulation failed: {}; using original query", e);
                    query.to_string()
                }
            },
            None => query.to_string(),
        };

        let semantic = self.similarity.query(&search_query, max_results)?;
        let mut result = RetrievalResult {
            hits: semantic
                .into_iter()
                .map(|h| RetrievedCourse::semantic(h.course_id, h.distance))
                .collect(),
            planning: None,
        };

        // A detected department with no structured route still carries
        // signal: mix that department's entry-level courses into the
        // evidence so it is not purely similarity-based.
        if let Some(dept) = planning.and_then(|p| p.department.as_deref()) {
            let dept_courses = entry_level_courses(
                self.store.as_ref(),
                Some(dept),
                planning.and_then(|p| p.term),
                self.config.department_inject_limit,
            )?;
            let existing: AHashSet<&str> =
                result.hits.iter().map(|h| h.course_id.as_str()).collect();
            let missing: Vec<String> = dept_courses
                .into_iter()
                .filter(|c| !existing.contains(c.id.as_str()))
                .map(|c| c.id)
                .collect();
            result
                .hits
                .extend(missing.into_iter().map(RetrievedCourse::structured));
        }

        result.sort_hits();
        Ok(result)
    }
}
