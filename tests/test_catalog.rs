//! Catalog store integration tests against a real sqlite database

use advisr::catalog::{
    available_courses, check_eligibility, courses_by_level, entry_level_courses, CatalogDb,
    CourseFilter, CourseRecord, CourseStore, EdgeKind, PrereqEdge, SqliteCourseStore, Term,
};
use tempfile::TempDir;

fn course(id: &str, title: &str, prereq_text: &str) -> CourseRecord {
    CourseRecord {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("About {}.", title),
        credits: 3.0,
        department: id.split_whitespace().next().unwrap().to_string(),
        offered_fall: true,
        offered_winter: false,
        offered_summer: false,
        prereq_text: prereq_text.to_string(),
        coreq_text: String::new(),
    }
}

fn seeded_store() -> (TempDir, SqliteCourseStore) {
    let temp = TempDir::new().unwrap();
    let store = SqliteCourseStore::new(CatalogDb::open(&temp.path().join("catalog.db")).unwrap());

    let mut comp202 = course("COMP 202", "Foundations of Programming", "");
    comp202.offered_winter = true;
    store.upsert_course(&comp202).unwrap();

    store
        .upsert_course(&course(
            "COMP 250",
            "Introduction to Computer Science",
            "COMP 202 or equivalent.",
        ))
        .unwrap();
    store
        .upsert_course(&course(
            "COMP 251",
            "Algorithms and Data Structures",
            "Prerequisite: COMP 250",
        ))
        .unwrap();

    let mut comp273 = course("COMP 273", "Introduction to Computer Systems", "");
    comp273.coreq_text = "Corequisite: COMP 206".to_string();
    store.upsert_course(&comp273).unwrap();

    store
        .upsert_course(&course(
            "COMP 310",
            "Operating Systems",
            "Prerequisite: COMP-273.",
        ))
        .unwrap();

    let mut math133 = course("MATH 133", "Linear Algebra and Geometry", "");
    math133.offered_winter = true;
    store.upsert_course(&math133).unwrap();

    let mut math141 = course("MATH 141", "Calculus 2", "MATH 140");
    math141.offered_fall = false;
    math141.offered_winter = true;
    store.upsert_course(&math141).unwrap();

    store
        .upsert_edge(&PrereqEdge {
            source: "COMP 202".to_string(),
            destination: "COMP 250".to_string(),
            kind: EdgeKind::Prereq,
        })
        .unwrap();
    store
        .upsert_edge(&PrereqEdge {
            source: "COMP 250".to_string(),
            destination: "COMP 251".to_string(),
            kind: EdgeKind::Prereq,
        })
        .unwrap();
    store
        .upsert_edge(&PrereqEdge {
            source: "COMP 206".to_string(),
            destination: "COMP 273".to_string(),
            kind: EdgeKind::Coreq,
        })
        .unwrap();

    (temp, store)
}

#[test]
fn test_upsert_rejects_malformed_course_id() {
    let (_temp, store) = seeded_store();

    let result = store.upsert_course(&course("COMP-999", "Bad Id", ""));
    assert!(result.is_err());
    let result = store.upsert_course(&course("comp 999", "Bad Id", ""));
    assert!(result.is_err());
}

#[test]
fn test_get_course_roundtrip() {
    let (_temp, store) = seeded_store();

    let comp250 = store.get_course("COMP 250").unwrap().unwrap();
    assert_eq!(comp250.title, "Introduction to Computer Science");
    assert_eq!(comp250.prereq_text, "COMP 202 or equivalent.");
    assert!(comp250.offered_fall);

    assert!(store.get_course("NOPE 999").unwrap().is_none());
}

#[test]
fn test_upsert_overwrites() {
    let (_temp, store) = seeded_store();

    let mut updated = store.get_course("COMP 250").unwrap().unwrap();
    updated.credits = 4.0;
    store.upsert_course(&updated).unwrap();

    let fetched = store.get_course("COMP 250").unwrap().unwrap();
    assert_eq!(fetched.credits, 4.0);
    // Still a single row
    assert_eq!(
        store
            .all_courses()
            .unwrap()
            .iter()
            .filter(|c| c.id == "COMP 250")
            .count(),
        1
    );
}

#[test]
fn test_get_courses_preserves_order_and_skips_missing() {
    let (_temp, store) = seeded_store();

    let courses = store
        .get_courses(&[
            "MATH 133".to_string(),
            "NOPE 999".to_string(),
            "COMP 202".to_string(),
        ])
        .unwrap();
    let ids: Vec<&str> = courses.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["MATH 133", "COMP 202"]);
}

#[test]
fn test_list_courses_filters() {
    let (_temp, store) = seeded_store();

    let comp = store
        .list_courses(&CourseFilter {
            department: Some("COMP".to_string()),
            term: None,
        })
        .unwrap();
    assert!(comp.iter().all(|c| c.id.starts_with("COMP ")));
    assert!(comp.len() >= 5);

    let winter_math = store
        .list_courses(&CourseFilter {
            department: Some("MATH".to_string()),
            term: Some(Term::Winter),
        })
        .unwrap();
    let ids: Vec<&str> = winter_math.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["MATH 133", "MATH 141"]);
}

#[test]
fn test_edge_upsert_creates_placeholder_source() {
    let (_temp, store) = seeded_store();

    // COMP 206 was never scraped; the coreq edge created a placeholder
    let placeholder = store.get_course("COMP 206").unwrap().unwrap();
    assert_eq!(placeholder.title, "Placeholder for COMP 206");
    assert!(placeholder.display_title().is_none());
}

#[test]
fn test_duplicate_edges_are_ignored() {
    let (_temp, store) = seeded_store();

    store
        .upsert_edge(&PrereqEdge {
            source: "COMP 202".to_string(),
            destination: "COMP 250".to_string(),
            kind: EdgeKind::Prereq,
        })
        .unwrap();

    let prereqs = store.prereq_ids("COMP 250").unwrap();
    assert_eq!(prereqs, vec!["COMP 202"]);
}

#[test]
fn test_find_courses_mentioning_prefers_edges() {
    let (_temp, store) = seeded_store();

    // COMP 250 has an outgoing prereq edge; the edge table answers
    let requiring = store.find_courses_mentioning("COMP 250").unwrap();
    let ids: Vec<&str> = requiring.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["COMP 251"]);
}

#[test]
fn test_find_courses_mentioning_falls_back_to_text_scan() {
    let (_temp, store) = seeded_store();

    // COMP 273 has no outgoing edges; COMP 310 mentions it with a hyphen
    let requiring = store.find_courses_mentioning("COMP 273").unwrap();
    let ids: Vec<&str> = requiring.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["COMP 310"]);
}

#[test]
fn test_find_courses_mentioning_empty_is_ok() {
    let (_temp, store) = seeded_store();

    let requiring = store.find_courses_mentioning("MATH 141").unwrap();
    assert!(requiring.is_empty());
}

#[test]
fn test_entry_level_courses_sorted_by_number() {
    let (_temp, store) = seeded_store();

    let entry = entry_level_courses(&store, Some("COMP"), None, 10).unwrap();
    let ids: Vec<&str> = entry.iter().map(|c| c.id.as_str()).collect();
    // COMP 206 is a placeholder with empty prereq text, so it qualifies too
    assert_eq!(ids, vec!["COMP 202", "COMP 206", "COMP 273"]);
}

#[test]
fn test_entry_level_respects_term() {
    let (_temp, store) = seeded_store();

    let entry = entry_level_courses(&store, Some("MATH"), Some(Term::Fall), 10).unwrap();
    let ids: Vec<&str> = entry.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["MATH 133"]);
}

#[test]
fn test_courses_by_level() {
    let (_temp, store) = seeded_store();

    let level200 = courses_by_level(&store, "COMP", 200, None, 10).unwrap();
    let ids: Vec<&str> = level200.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["COMP 202", "COMP 206", "COMP 250", "COMP 251", "COMP 273"]);

    let level300 = courses_by_level(&store, "COMP", 300, None, 10).unwrap();
    let ids: Vec<&str> = level300.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["COMP 310"]);
}

#[test]
fn test_available_courses_subset_and_overlap() {
    let (_temp, store) = seeded_store();

    let available = available_courses(
        &store,
        &["COMP 202".to_string(), "MATH 133".to_string()],
        Some("COMP"),
        None,
        10,
    )
    .unwrap();
    let ids: Vec<&str> = available.iter().map(|c| c.id.as_str()).collect();
    // COMP 250's prereq codes are covered; entry-level courses always
    // qualify; completed courses are excluded
    assert!(ids.contains(&"COMP 250"));
    assert!(ids.contains(&"COMP 273"));
    assert!(!ids.contains(&"COMP 202"));
    assert!(!ids.contains(&"COMP 310"));
}

#[test]
fn test_eligibility_reports_missing_prereqs() {
    let (_temp, store) = seeded_store();

    let report = check_eligibility(&store, &[], &[], "COMP 251").unwrap();
    assert!(!report.eligible);
    assert_eq!(report.missing_prereqs, vec!["COMP 250"]);
    assert_eq!(report.total_prereqs, 1);

    let report =
        check_eligibility(&store, &["COMP 250".to_string()], &[], "COMP 251").unwrap();
    assert!(report.eligible);
    assert!(report.missing_prereqs.is_empty());
}

#[test]
fn test_eligibility_coreq_satisfied_by_current_term() {
    let (_temp, store) = seeded_store();

    // COMP 206 is a corequisite of COMP 273: taking it concurrently counts
    let report = check_eligibility(&store, &[], &[], "COMP 273").unwrap();
    assert!(!report.eligible);
    assert_eq!(report.missing_coreqs, vec!["COMP 206"]);

    let report =
        check_eligibility(&store, &[], &["COMP 206".to_string()], "COMP 273").unwrap();
    assert!(report.eligible);
    assert_eq!(report.total_coreqs, 1);
}
