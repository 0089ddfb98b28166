//! Course catalog data model and storage
//!
//! Courses are identified by canonical codes of the form `DEPT NNN[letter]`
//! ("COMP 250"). Prerequisite structure exists twice: as free-text sentences
//! scraped from the calendar, and as an optional edge table derived from
//! them. Readers must tolerate the edge table being empty and fall back to
//! text scanning.

mod database;
mod store;

pub use database::{CatalogDb, CatalogStats, DbPool};
pub use store::{
    available_courses, check_eligibility, courses_by_level, entry_level_courses, CourseFilter,
    CourseStore, Eligibility, SqliteCourseStore,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Course code shape: 3-4 letter department, optional space or hyphen,
/// 3 digits with an optional trailing letter
pub(crate) fn course_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b([A-Za-z]{3,4})[\s-]?(\d{3}[A-Za-z]?)\b")
            .expect("course code regex is valid")
    })
}

/// Whether an id is already in canonical `DEPT NNN[letter]` form
pub fn is_valid_course_id(id: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[A-Z]{3,4} \d{3}[A-Z]?$").expect("course id regex is valid")
    });
    re.is_match(id)
}

/// Check whether free text mentions a course code, tolerating the
/// "COMP250", "COMP-250" and "COMP 250" spelling variants
pub fn mentions_course(text: &str, course_id: &str) -> bool {
    let Some((dept, num)) = course_id.split_once(' ') else {
        return false;
    };
    let pattern = format!(
        r"(?i)\b{}[\s-]?{}\b",
        regex::escape(dept),
        regex::escape(num)
    );
    Regex::new(&pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Title sentinel written by the scraper for courses referenced as
/// prerequisites but not yet scraped themselves
pub const PLACEHOLDER_TITLE_PREFIX: &str = "Placeholder for";

/// Whether a title is a scraper placeholder rather than a real title
pub fn is_placeholder_title(title: &str) -> bool {
    title.is_empty() || title.starts_with(PLACEHOLDER_TITLE_PREFIX) || title == "N/A"
}

/// Academic term a course can be offered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Term {
    Fall,
    Winter,
    Summer,
}

impl Term {
    pub fn as_str(&self) -> &'static str {
        match self {
            Term::Fall => "fall",
            Term::Winter => "winter",
            Term::Summer => "summer",
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Term {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fall" => Ok(Term::Fall),
            "winter" => Ok(Term::Winter),
            "summer" => Ok(Term::Summer),
            other => Err(format!("unknown term: {}", other)),
        }
    }
}

/// Kind of a prerequisite edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Prereq,
    Coreq,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Prereq => "prereq",
            EdgeKind::Coreq => "coreq",
        }
    }
}

impl FromStr for EdgeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prereq" => Ok(EdgeKind::Prereq),
            "coreq" => Ok(EdgeKind::Coreq),
            other => Err(format!("unknown edge kind: {}", other)),
        }
    }
}

/// A directed prerequisite relation: `source` is required (or co-required)
/// for `destination`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrereqEdge {
    pub source: String,
    pub destination: String,
    pub kind: EdgeKind,
}

/// One catalog course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Canonical course code, e.g. "COMP 250"
    pub id: String,
    /// Course title; may be a scraper placeholder sentinel
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub credits: f64,
    /// Owning department as listed in the calendar
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub offered_fall: bool,
    #[serde(default)]
    pub offered_winter: bool,
    #[serde(default)]
    pub offered_summer: bool,
    /// Free-text prerequisite sentence from the calendar
    #[serde(default)]
    pub prereq_text: String,
    /// Free-text corequisite sentence from the calendar
    #[serde(default)]
    pub coreq_text: String,
}

impl CourseRecord {
    /// Usable title, or None for placeholder/missing titles
    pub fn display_title(&self) -> Option<&str> {
        if is_placeholder_title(&self.title) {
            None
        } else {
            Some(&self.title)
        }
    }

    /// Format as "CODE (Title)" or just "CODE" when the title is a placeholder
    pub fn label(&self) -> String {
        match self.display_title() {
            Some(title) => format!("{} ({})", self.id, title),
            None => self.id.clone(),
        }
    }

    /// Numeric course number parsed from the id ("COMP 250" -> 250)
    pub fn course_number(&self) -> Option<u32> {
        let (_, num) = self.id.split_once(' ')?;
        num.chars()
            .take(3)
            .collect::<String>()
            .parse::<u32>()
            .ok()
    }

    /// Department code parsed from the id ("COMP 250" -> "COMP")
    pub fn department_code(&self) -> &str {
        self.id.split_once(' ').map(|(d, _)| d).unwrap_or(&self.id)
    }

    pub fn offered_in(&self, term: Term) -> bool {
        match term {
            Term::Fall => self.offered_fall,
            Term::Winter => self.offered_winter,
            Term::Summer => self.offered_summer,
        }
    }

    /// Concatenated text fed to the embedding model when indexing
    pub fn document_text(&self) -> String {
        [
            self.title.as_str(),
            self.description.as_str(),
            self.prereq_text.as_str(),
            self.coreq_text.as_str(),
        ]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, title: &str) -> CourseRecord {
        CourseRecord {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            credits: 3.0,
            department: String::new(),
            offered_fall: false,
            offered_winter: false,
            offered_summer: false,
            prereq_text: String::new(),
            coreq_text: String::new(),
        }
    }

    #[test]
    fn test_valid_course_ids() {
        assert!(is_valid_course_id("COMP 250"));
        assert!(is_valid_course_id("MATH 133"));
        assert!(is_valid_course_id("COMP 202D"));
        assert!(is_valid_course_id("ECSE 427"));
        assert!(!is_valid_course_id("COMP-250"));
        assert!(!is_valid_course_id("comp 250"));
        assert!(!is_valid_course_id("CO 250"));
        assert!(!is_valid_course_id("COMP 25"));
    }

    #[test]
    fn test_mentions_course_separator_variants() {
        assert!(mentions_course("Prerequisite: COMP 250", "COMP 250"));
        assert!(mentions_course("Prerequisite: COMP-250", "COMP 250"));
        assert!(mentions_course("Prerequisite: COMP250", "COMP 250"));
        assert!(mentions_course("prerequisite: comp 250", "COMP 250"));
        assert!(!mentions_course("Prerequisite: COMP 251", "COMP 250"));
        assert!(!mentions_course("", "COMP 250"));
    }

    #[test]
    fn test_placeholder_title() {
        assert!(is_placeholder_title("Placeholder for COMP 206"));
        assert!(is_placeholder_title("N/A"));
        assert!(is_placeholder_title(""));
        assert!(!is_placeholder_title("Operating Systems"));
    }

    #[test]
    fn test_display_title_and_label() {
        let real = course("COMP 250", "Introduction to Computer Science");
        assert_eq!(
            real.display_title(),
            Some("Introduction to Computer Science")
        );
        assert_eq!(
            real.label(),
            "COMP 250 (Introduction to Computer Science)"
        );

        let placeholder = course("COMP 206", "Placeholder for COMP 206");
        assert_eq!(placeholder.display_title(), None);
        assert_eq!(placeholder.label(), "COMP 206");
    }

    #[test]
    fn test_course_number() {
        assert_eq!(course("COMP 250", "t").course_number(), Some(250));
        assert_eq!(course("COMP 202D", "t").course_number(), Some(202));
        assert_eq!(course("bogus", "t").course_number(), None);
    }

    #[test]
    fn test_document_text_skips_empty_fields() {
        let mut c = course("COMP 250", "Introduction to Computer Science");
        c.description = "Data structures and algorithms.".to_string();
        assert_eq!(
            c.document_text(),
            "Introduction to Computer Science Data structures and algorithms."
        );
    }
}
