//! Course store: read interface consumed by retrieval, plus the upsert path
//! used for dump ingestion
//!
//! Not-found is always `None`/empty, never an error; only real database
//! failures propagate.

use crate::catalog::{
    course_code_regex, mentions_course, CatalogDb, CourseRecord, EdgeKind, PrereqEdge, Term,
};
use crate::error::{AdvisrError, Result};
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeSet;

const COURSE_COLUMNS: &str = "id, title, description, credits, department, \
     offered_fall, offered_winter, offered_summer, prereq_text, coreq_text";

/// Structured filter for course listings
#[derive(Debug, Clone, Default)]
pub struct CourseFilter {
    /// Department prefix, e.g. "COMP"
    pub department: Option<String>,
    /// Only courses offered in this term
    pub term: Option<Term>,
}

/// Read/write access to the course catalog
///
/// Retrieval depends on this trait rather than the sqlite implementation so
/// tests can drive it against a seeded temporary database or a stub.
pub trait CourseStore: Send + Sync {
    /// Fetch one course by exact id; None if absent
    fn get_course(&self, id: &str) -> Result<Option<CourseRecord>>;

    /// Fetch several courses, preserving input order; absent ids are skipped
    fn get_courses(&self, ids: &[String]) -> Result<Vec<CourseRecord>>;

    /// List courses matching a structured filter, ordered by id
    fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<CourseRecord>>;

    /// Every course in the catalog, ordered by id
    fn all_courses(&self) -> Result<Vec<CourseRecord>>;

    /// Courses that require the given course: edge table when populated,
    /// otherwise a scan of prerequisite sentences tolerating the
    /// "COMP250" / "COMP-250" / "COMP 250" spelling variants
    fn find_courses_mentioning(&self, course_id: &str) -> Result<Vec<CourseRecord>>;

    /// Prerequisite course ids for a course, from the edge table
    fn prereq_ids(&self, course_id: &str) -> Result<Vec<String>>;

    /// Corequisite course ids for a course, from the edge table
    fn coreq_ids(&self, course_id: &str) -> Result<Vec<String>>;

    /// Insert or update a course
    fn upsert_course(&self, course: &CourseRecord) -> Result<()>;

    /// Insert an edge, creating a placeholder source course if it has not
    /// been scraped yet
    fn upsert_edge(&self, edge: &PrereqEdge) -> Result<()>;
}

/// SQLite-backed course store
pub struct SqliteCourseStore {
    db: CatalogDb,
}

impl SqliteCourseStore {
    pub fn new(db: CatalogDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &CatalogDb {
        &self.db
    }
}

fn row_to_course(row: &rusqlite::Row<'_>) -> rusqlite::Result<CourseRecord> {
    Ok(CourseRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        credits: row.get(3)?,
        department: row.get(4)?,
        offered_fall: row.get(5)?,
        offered_winter: row.get(6)?,
        offered_summer: row.get(7)?,
        prereq_text: row.get(8)?,
        coreq_text: row.get(9)?,
    })
}

impl CourseStore for SqliteCourseStore {
    fn get_course(&self, id: &str) -> Result<Option<CourseRecord>> {
        let conn = self.db.get_conn()?;
        let course = conn
            .query_row(
                &format!("SELECT {} FROM courses WHERE id = ?1", COURSE_COLUMNS),
                params![id],
                row_to_course,
            )
            .optional()?;
        Ok(course)
    }

    fn get_courses(&self, ids: &[String]) -> Result<Vec<CourseRecord>> {
        let mut courses = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(course) = self.get_course(id)? {
                courses.push(course);
            }
        }
        Ok(courses)
    }

    fn list_courses(&self, filter: &CourseFilter) -> Result<Vec<CourseRecord>> {
        let conn = self.db.get_conn()?;

        let courses: Vec<CourseRecord> = match &filter.department {
            Some(dept) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM courses WHERE id LIKE ?1 ORDER BY id",
                    COURSE_COLUMNS
                ))?;
                let rows = stmt.query_map(
                    params![format!("{} %", dept.to_uppercase())],
                    row_to_course,
                )?;
                rows.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM courses ORDER BY id",
                    COURSE_COLUMNS
                ))?;
                let rows = stmt.query_map([], row_to_course)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
        };

        Ok(match filter.term {
            Some(term) => courses.into_iter().filter(|c| c.offered_in(term)).collect(),
            None => courses,
        })
    }

    fn all_courses(&self) -> Result<Vec<CourseRecord>> {
        self.list_courses(&CourseFilter::default())
    }

    fn find_courses_mentioning(&self, course_id: &str) -> Result<Vec<CourseRecord>> {
        let edge_ids: Vec<String> = {
            let conn = self.db.get_conn()?;
            let mut stmt = conn.prepare(
                "SELECT dst_course_id FROM prereq_edges \
                 WHERE src_course_id = ?1 AND kind = 'prereq' ORDER BY dst_course_id",
            )?;
            let rows = stmt.query_map(params![course_id], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        if !edge_ids.is_empty() {
            return self.get_courses(&edge_ids);
        }

        // Edge table not populated for this course; scan the free-text
        // prerequisite sentences instead.
        let all = self.all_courses()?;
        Ok(all
            .into_iter()
            .filter(|c| c.id != course_id && mentions_course(&c.prereq_text, course_id))
            .collect())
    }

    fn prereq_ids(&self, course_id: &str) -> Result<Vec<String>> {
        self.edge_sources(course_id, EdgeKind::Prereq)
    }

    fn coreq_ids(&self, course_id: &str) -> Result<Vec<String>> {
        self.edge_sources(course_id, EdgeKind::Coreq)
    }

    fn upsert_course(&self, course: &CourseRecord) -> Result<()> {
        if !crate::catalog::is_valid_course_id(&course.id) {
            return Err(AdvisrError::InvalidCourseId {
                id: course.id.clone(),
            });
        }

        let conn = self.db.get_conn()?;
        conn.execute(
            "INSERT INTO courses (id, title, description, credits, department, \
             offered_fall, offered_winter, offered_summer, prereq_text, coreq_text) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT(id) DO UPDATE SET \
             title = excluded.title, description = excluded.description, \
             credits = excluded.credits, department = excluded.department, \
             offered_fall = excluded.offered_fall, offered_winter = excluded.offered_winter, \
             offered_summer = excluded.offered_summer, \
             prereq_text = excluded.prereq_text, coreq_text = excluded.coreq_text",
            params![
                course.id,
                course.title,
                course.description,
                course.credits,
                course.department,
                course.offered_fall,
                course.offered_winter,
                course.offered_summer,
                course.prereq_text,
                course.coreq_text,
            ],
        )?;
        Ok(())
    }

    fn upsert_edge(&self, edge: &PrereqEdge) -> Result<()> {
        // The source may reference a course that has not been scraped yet;
        // insert a placeholder row so the foreign key holds.
        if self.get_course(&edge.source)?.is_none() {
            let dept = edge
                .source
                .split_once(' ')
                .map(|(d, _)| d)
                .unwrap_or(&edge.source);
            self.upsert_course(&CourseRecord {
                id: edge.source.clone(),
                title: format!("Placeholder for {}", edge.source),
                description: "N/A".to_string(),
                credits: 0.0,
                department: format!("{} Department (placeholder)", dept),
                offered_fall: false,
                offered_winter: false,
                offered_summer: false,
                prereq_text: String::new(),
                coreq_text: String::new(),
            })?;
        }

        let conn = self.db.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO prereq_edges (src_course_id, dst_course_id, kind) \
             VALUES (?1, ?2, ?3)",
            params![edge.source, edge.destination, edge.kind.as_str()],
        )?;
        Ok(())
    }
}

impl SqliteCourseStore {
    fn edge_sources(&self, course_id: &str, kind: EdgeKind) -> Result<Vec<String>> {
        let conn = self.db.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT src_course_id FROM prereq_edges \
             WHERE dst_course_id = ?1 AND kind = ?2 ORDER BY src_course_id",
        )?;
        let rows = stmt.query_map(params![course_id, kind.as_str()], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}

/// Entry-level courses: no prerequisite sentence, or one that only names
/// CEGEP/high-school background. Sorted ascending by course number.
pub fn entry_level_courses(
    store: &dyn CourseStore,
    department: Option<&str>,
    term: Option<Term>,
    limit: usize,
) -> Result<Vec<CourseRecord>> {
    let filter = CourseFilter {
        department: department.map(|d| d.to_string()),
        term,
    };
    let mut entry: Vec<CourseRecord> = store
        .list_courses(&filter)?
        .into_iter()
        .filter(|c| {
            let prereq = c.prereq_text.trim().to_lowercase();
            prereq.is_empty()
                || prereq == "none"
                || (prereq.contains("cegep")
                    && !prereq.contains("comp")
                    && !prereq.contains("math"))
        })
        .collect();

    entry.sort_by_key(|c| c.course_number().unwrap_or(999));
    entry.truncate(limit);
    Ok(entry)
}

/// Courses at a given level (200 means 2xx), sorted by id
pub fn courses_by_level(
    store: &dyn CourseStore,
    department: &str,
    level: u32,
    term: Option<Term>,
    limit: usize,
) -> Result<Vec<CourseRecord>> {
    let filter = CourseFilter {
        department: Some(department.to_string()),
        term,
    };
    let mut result: Vec<CourseRecord> = store
        .list_courses(&filter)?
        .into_iter()
        .filter(|c| c.course_number().map(|n| n / 100) == Some(level / 100))
        .collect();

    result.sort_by(|a, b| a.id.cmp(&b.id));
    result.truncate(limit);
    Ok(result)
}

/// Courses whose extracted prerequisite codes are covered by the completed
/// set, sorted by id
///
/// Prerequisite sentences freely mix AND/OR logic ("COMP 250 or COMP 202,
/// and MATH 133"); this check treats any overlap with the completed set as
/// potentially satisfying an OR alternative. A deliberate approximation,
/// not a boolean-expression parser.
pub fn available_courses(
    store: &dyn CourseStore,
    completed: &[String],
    department: Option<&str>,
    term: Option<Term>,
    limit: usize,
) -> Result<Vec<CourseRecord>> {
    let filter = CourseFilter {
        department: department.map(|d| d.to_string()),
        term,
    };
    let completed_set: BTreeSet<String> = completed
        .iter()
        .map(|c| c.trim().to_uppercase())
        .collect();

    let mut available: Vec<CourseRecord> = store
        .list_courses(&filter)?
        .into_iter()
        .filter(|c| {
            if completed_set.contains(&c.id) {
                return false;
            }
            let prereq_text = c.prereq_text.trim();
            if prereq_text.is_empty() {
                return true;
            }
            let prereq_ids: BTreeSet<String> = course_code_regex()
                .captures_iter(&prereq_text.to_uppercase())
                .map(|caps| format!("{} {}", &caps[1], &caps[2]))
                .collect();
            if prereq_ids.is_empty() {
                return false;
            }
            prereq_ids.is_subset(&completed_set)
                || prereq_ids.iter().any(|p| completed_set.contains(p))
        })
        .collect();

    available.sort_by(|a, b| a.id.cmp(&b.id));
    available.truncate(limit);
    Ok(available)
}

/// Eligibility report for taking a target course, based on the edge table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    pub course_id: String,
    pub eligible: bool,
    pub missing_prereqs: Vec<String>,
    pub missing_coreqs: Vec<String>,
    pub total_prereqs: usize,
    pub total_coreqs: usize,
}

/// Determine whether a student can take the target course given their
/// completed and in-progress courses
///
/// Corequisites are satisfied by completed *or* concurrently taken courses;
/// prerequisites only by completed ones.
pub fn check_eligibility(
    store: &dyn CourseStore,
    completed: &[String],
    current: &[String],
    target: &str,
) -> Result<Eligibility> {
    let completed_set: BTreeSet<String> =
        completed.iter().map(|c| c.trim().to_uppercase()).collect();
    let current_set: BTreeSet<String> = current.iter().map(|c| c.trim().to_uppercase()).collect();

    let prereqs = store.prereq_ids(target)?;
    let coreqs = store.coreq_ids(target)?;

    let missing_prereqs: Vec<String> = prereqs
        .iter()
        .filter(|p| !completed_set.contains(*p))
        .cloned()
        .collect();
    let missing_coreqs: Vec<String> = coreqs
        .iter()
        .filter(|c| !completed_set.contains(*c) && !current_set.contains(*c))
        .cloned()
        .collect();

    Ok(Eligibility {
        course_id: target.to_string(),
        eligible: missing_prereqs.is_empty() && missing_coreqs.is_empty(),
        missing_prereqs,
        missing_coreqs,
        total_prereqs: prereqs.len(),
        total_coreqs: coreqs.len(),
    })
}
