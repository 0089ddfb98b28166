//! In-memory course title index with ambiguity tracking
//!
//! Maps normalized titles to course ids so queries like "What are the
//! prerequisites for Introduction to Computer Science?" resolve without a
//! course code. Built once from the catalog and cached by the retriever;
//! it goes stale if courses are added afterwards, which is acceptable for
//! a catalog that changes between terms, not between requests.

use crate::catalog::{CourseRecord, CourseStore};
use crate::error::Result;
use crate::patterns::QueryPatterns;
use ahash::AHashMap;
use std::collections::BTreeMap;

/// A resolved title with disambiguation info
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMatch {
    /// Default course id for the matched title
    pub course_id: String,
    /// All candidate ids when the title is shared by several courses;
    /// None when the title is unique
    pub alternatives: Option<Vec<String>>,
}

/// Normalized title -> course id index
#[derive(Debug, Clone, Default)]
pub struct TitleIndex {
    by_title: AHashMap<String, String>,
    duplicates: AHashMap<String, Vec<String>>,
    /// Known titles, longest first, for substring matching
    titles_by_length: Vec<String>,
}

impl TitleIndex {
    /// Build the index from every course in the store
    ///
    /// Placeholder titles never enter the index. When several courses share
    /// a normalized title the default is the first id from the preferred
    /// department, falling back to the lexicographically first id.
    pub fn build(store: &dyn CourseStore, preferred_department: &str) -> Result<Self> {
        let courses = store.all_courses()?;
        Ok(Self::from_courses(&courses, preferred_department))
    }

    /// Build the index from an in-memory course list
    pub fn from_courses(courses: &[CourseRecord], preferred_department: &str) -> Self {
        // BTreeMap keeps grouping deterministic regardless of input order
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for course in courses {
            if course.display_title().is_none() {
                continue;
            }
            let normalized = Self::normalize(&course.title);
            if normalized.is_empty() {
                continue;
            }
            groups.entry(normalized).or_default().push(course.id.clone());
        }

        let preferred_prefix = format!("{} ", preferred_department.to_uppercase());
        let mut by_title = AHashMap::new();
        let mut duplicates = AHashMap::new();

        for (title, mut ids) in groups {
            ids.sort();
            ids.dedup();
            let default = ids
                .iter()
                .find(|id| id.starts_with(&preferred_prefix))
                .unwrap_or(&ids[0])
                .clone();
            if ids.len() > 1 {
                duplicates.insert(title.clone(), ids);
            }
            by_title.insert(title, default);
        }

        let mut titles_by_length: Vec<String> = by_title.keys().cloned().collect();
        titles_by_length.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Self {
            by_title,
            duplicates,
            titles_by_length,
        }
    }

    /// Normalize a title for matching: lowercase, trim, strip trailing periods
    pub fn normalize(title: &str) -> String {
        title
            .to_lowercase()
            .trim()
            .trim_end_matches('.')
            .trim_end()
            .to_string()
    }

    /// Resolve a query to a course id by title
    ///
    /// Strategies, first hit wins:
    /// 1. exact match of the scaffolding-stripped query against the index
    /// 2. longest known title contained in the normalized query
    /// 3. scaffolding-stripped query contained in a known title
    ///
    /// `min_match_len` guards strategies 2 and 3 against spurious
    /// short-string matches.
    pub fn resolve(
        &self,
        query: &str,
        patterns: &QueryPatterns,
        min_match_len: usize,
    ) -> Option<TitleMatch> {
        if self.by_title.is_empty() {
            return None;
        }

        let query_lower = query.to_lowercase();
        let query_lower = query_lower.trim();
        let cleaned = Self::normalize(&patterns.strip_title_scaffolding(query_lower));

        // 1. Exact match on the cleaned query
        if self.by_title.contains_key(&cleaned) {
            return Some(self.title_match(&cleaned));
        }

        // 2. Longest known title contained in the query (longest first so a
        // short, generic title never shadows a more specific one)
        let query_normalized = Self::normalize(query_lower);
        for title in &self.titles_by_length {
            if title.len() >= min_match_len && query_normalized.contains(title.as_str()) {
                return Some(self.title_match(title));
            }
        }

        // 3. Cleaned query contained in a known title (partial titles)
        if cleaned.len() >= min_match_len {
            for title in &self.titles_by_length {
                if title.contains(&cleaned) {
                    return Some(self.title_match(title));
                }
            }
        }

        None
    }

    fn title_match(&self, normalized_title: &str) -> TitleMatch {
        TitleMatch {
            course_id: self
                .by_title
                .get(normalized_title)
                .cloned()
                .unwrap_or_default(),
            alternatives: self.duplicates.get(normalized_title).cloned(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}
