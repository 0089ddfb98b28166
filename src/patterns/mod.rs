//! Pattern tables for configuration-driven query understanding
//!
//! This module provides:
//! - Course nickname/alias substitution tables ("calc 2" -> "MATH 141")
//! - Department, term, and level extraction tables for planning queries
//! - Intent phrase families (prerequisite chain, reverse prerequisite, ...)
//! - The deny list of English words that look like department codes
//! - Question scaffolding phrases stripped before title matching
//!
//! Every table is an *ordered* list of (pattern, canonical value) pairs so
//! that match priority is visible and independently testable. Built-in
//! defaults cover the common cases; any table can be replaced wholesale
//! from a TOML override file.

use crate::catalog::Term;
use crate::error::{AdvisrError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Course nickname mapped to a canonical course code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasEntry {
    pub alias: String,
    pub course_id: String,
}

/// Department phrase pattern mapped to a canonical department code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentEntry {
    pub pattern: String,
    pub department: String,
}

/// Term keyword (substring match on the lowercased query)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermEntry {
    pub keyword: String,
    pub term: String,
}

/// Level pattern; `level: None` means the level digit is captured from the
/// match itself (the "NNN-level" form)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelEntry {
    pub pattern: String,
    #[serde(default)]
    pub level: Option<u32>,
}

/// Pattern tables configuration file structure
///
/// Any table present in the file replaces the built-in table entirely;
/// absent tables keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternsFile {
    #[serde(default = "default_aliases")]
    pub alias: Vec<AliasEntry>,
    #[serde(default = "default_departments")]
    pub department: Vec<DepartmentEntry>,
    #[serde(default = "default_terms")]
    pub term: Vec<TermEntry>,
    #[serde(default = "default_levels")]
    pub level: Vec<LevelEntry>,
    #[serde(default = "default_code_deny_list")]
    pub code_deny_list: Vec<String>,
    #[serde(default = "default_title_prefixes")]
    pub title_prefix: Vec<String>,
    #[serde(default = "default_title_suffixes")]
    pub title_suffix: Vec<String>,
    #[serde(default = "default_chain_patterns")]
    pub chain: Vec<String>,
    #[serde(default = "default_reverse_patterns")]
    pub reverse: Vec<String>,
    #[serde(default = "default_first_semester_patterns")]
    pub first_semester: Vec<String>,
    #[serde(default = "default_available_markers")]
    pub available_marker: Vec<String>,
    #[serde(default = "default_recommendation_patterns")]
    pub recommendation: Vec<String>,
    #[serde(default = "default_prereqs_for_phrases")]
    pub prereqs_for_phrase: Vec<String>,
    #[serde(default = "default_requires_phrases")]
    pub requires_phrase: Vec<String>,
}

impl Default for PatternsFile {
    fn default() -> Self {
        Self {
            alias: default_aliases(),
            department: default_departments(),
            term: default_terms(),
            level: default_levels(),
            code_deny_list: default_code_deny_list(),
            title_prefix: default_title_prefixes(),
            title_suffix: default_title_suffixes(),
            chain: default_chain_patterns(),
            reverse: default_reverse_patterns(),
            first_semester: default_first_semester_patterns(),
            available_marker: default_available_markers(),
            recommendation: default_recommendation_patterns(),
            prereqs_for_phrase: default_prereqs_for_phrases(),
            requires_phrase: default_requires_phrases(),
        }
    }
}

/// Compiled alias with its word-boundary regex
#[derive(Debug, Clone)]
pub struct CompiledAlias {
    pub alias: String,
    pub regex: Regex,
    pub course_id: String,
}

/// Compiled level pattern
#[derive(Debug, Clone)]
struct CompiledLevel {
    regex: Regex,
    level: Option<u32>,
}

/// Compiled pattern tables used by the query understanding pipeline
///
/// All regex tables (except aliases) are matched against the *lowercased*
/// query; alias regexes carry their own case-insensitive flag because they
/// rewrite the original query text.
#[derive(Debug, Clone)]
pub struct QueryPatterns {
    aliases: Vec<CompiledAlias>,
    departments: Vec<(Regex, String)>,
    terms: Vec<(String, Term)>,
    levels: Vec<CompiledLevel>,
    code_deny: HashSet<String>,
    title_prefixes: Vec<Regex>,
    title_suffixes: Vec<Regex>,
    chain: Vec<Regex>,
    reverse: Vec<Regex>,
    first_semester: Vec<Regex>,
    available_markers: Vec<Regex>,
    recommendation: Vec<Regex>,
    prereqs_for_phrases: Vec<String>,
    requires_phrases: Vec<String>,
}

fn compile(table: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| AdvisrError::Pattern(format!("invalid regex in {} table '{}': {}", table, pattern, e)))
}

fn compile_all(table: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(table, p)).collect()
}

impl QueryPatterns {
    /// Compile the built-in default tables
    pub fn builtin() -> Result<Self> {
        Self::from_config(PatternsFile::default())
    }

    /// Load pattern tables from a TOML override file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AdvisrError::Io {
            source: e,
            context: format!("Failed to read patterns file: {:?}", path),
        })?;
        let config: PatternsFile = toml::from_str(&content)?;
        Self::from_config(config)
    }

    /// Compile pattern tables from a parsed configuration
    pub fn from_config(config: PatternsFile) -> Result<Self> {
        // Sort aliases longest-first so a longer alias is never partially
        // shadowed by a shorter one ("calculus 2" before "calculus").
        let mut alias_entries = config.alias;
        alias_entries.sort_by(|a, b| {
            b.alias
                .len()
                .cmp(&a.alias.len())
                .then_with(|| a.alias.cmp(&b.alias))
        });
        let aliases = alias_entries
            .iter()
            .map(|entry| {
                let regex = compile(
                    "alias",
                    &format!(r"(?i)\b{}\b", regex::escape(&entry.alias)),
                )?;
                Ok(CompiledAlias {
                    alias: entry.alias.clone(),
                    regex,
                    course_id: entry.course_id.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let departments = config
            .department
            .iter()
            .map(|entry| Ok((compile("department", &entry.pattern)?, entry.department.clone())))
            .collect::<Result<Vec<_>>>()?;

        let terms = config
            .term
            .iter()
            .map(|entry| {
                let term = entry.term.parse::<Term>().map_err(|_| {
                    AdvisrError::Pattern(format!("unknown term '{}' in term table", entry.term))
                })?;
                Ok((entry.keyword.to_lowercase(), term))
            })
            .collect::<Result<Vec<_>>>()?;

        let levels = config
            .level
            .iter()
            .map(|entry| {
                Ok(CompiledLevel {
                    regex: compile("level", &entry.pattern)?,
                    level: entry.level,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let code_deny = config
            .code_deny_list
            .iter()
            .map(|w| w.to_uppercase())
            .collect();

        Ok(Self {
            aliases,
            departments,
            terms,
            levels,
            code_deny,
            title_prefixes: compile_all("title_prefix", &config.title_prefix)?,
            title_suffixes: compile_all("title_suffix", &config.title_suffix)?,
            chain: compile_all("chain", &config.chain)?,
            reverse: compile_all("reverse", &config.reverse)?,
            first_semester: compile_all("first_semester", &config.first_semester)?,
            available_markers: compile_all("available_marker", &config.available_marker)?,
            recommendation: compile_all("recommendation", &config.recommendation)?,
            prereqs_for_phrases: config.prereqs_for_phrase,
            requires_phrases: config.requires_phrase,
        })
    }

    /// Replace course nicknames with canonical course codes
    ///
    /// Substitution runs longest-alias-first with word-boundary matching so
    /// "calculus 2" never falls through to a rule for "calculus".
    pub fn apply_aliases(&self, query: &str) -> String {
        let mut result = query.to_string();
        for alias in &self.aliases {
            if alias.regex.is_match(&result) {
                result = alias
                    .regex
                    .replace_all(&result, alias.course_id.as_str())
                    .to_string();
            }
        }
        result
    }

    /// Whether an uppercased department-shaped token is a known English word
    /// rather than a real department code ("WHAT 200-level" is not a course)
    pub fn is_denied_code(&self, dept: &str) -> bool {
        self.code_deny.contains(&dept.to_uppercase())
    }

    /// First matching department, in table order
    pub fn department_of(&self, query_lower: &str) -> Option<&str> {
        self.departments
            .iter()
            .find(|(regex, _)| regex.is_match(query_lower))
            .map(|(_, dept)| dept.as_str())
    }

    /// First matching term keyword, in table order
    pub fn term_of(&self, query_lower: &str) -> Option<Term> {
        self.terms
            .iter()
            .find(|(keyword, _)| query_lower.contains(keyword.as_str()))
            .map(|(_, term)| *term)
    }

    /// First matching level, in table order; the captured-digit form
    /// ("200-level") reads the hundreds digit out of the match
    pub fn level_of(&self, query_lower: &str) -> Option<u32> {
        for entry in &self.levels {
            if let Some(caps) = entry.regex.captures(query_lower) {
                match entry.level {
                    Some(level) => return Some(level),
                    None => {
                        if let Some(digit) = caps.get(1) {
                            if let Ok(n) = digit.as_str().parse::<u32>() {
                                return Some(n * 100);
                            }
                        }
                    }
                }
            }
        }
        None
    }

    pub fn matches_chain(&self, query_lower: &str) -> bool {
        self.chain.iter().any(|r| r.is_match(query_lower))
    }

    pub fn matches_reverse(&self, query_lower: &str) -> bool {
        self.reverse.iter().any(|r| r.is_match(query_lower))
    }

    pub fn matches_first_semester(&self, query_lower: &str) -> bool {
        self.first_semester.iter().any(|r| r.is_match(query_lower))
    }

    pub fn has_available_marker(&self, query_lower: &str) -> bool {
        self.available_markers.iter().any(|r| r.is_match(query_lower))
    }

    pub fn matches_recommendation(&self, query_lower: &str) -> bool {
        self.recommendation.iter().any(|r| r.is_match(query_lower))
    }

    /// Strip question scaffolding ("what are the prerequisites for ...",
    /// "... about?") from both ends of a lowercased query
    pub fn strip_title_scaffolding(&self, query_lower: &str) -> String {
        let mut cleaned = query_lower.to_string();
        for prefix in &self.title_prefixes {
            cleaned = prefix.replace(&cleaned, "").to_string();
        }
        for suffix in &self.title_suffixes {
            cleaned = suffix.replace(&cleaned, "").to_string();
        }
        cleaned
    }

    /// Phrases marking a "prerequisites FOR X" question
    pub fn prereqs_for_phrases(&self) -> &[String] {
        &self.prereqs_for_phrases
    }

    /// Phrases marking a "what requires X" question
    pub fn requires_phrases(&self) -> &[String] {
        &self.requires_phrases
    }
}

fn default_aliases() -> Vec<AliasEntry> {
    fn entry(alias: &str, course_id: &str) -> AliasEntry {
        AliasEntry {
            alias: alias.to_string(),
            course_id: course_id.to_string(),
        }
    }
    vec![
        // Math courses
        entry("calc 1", "MATH 140"),
        entry("calculus 1", "MATH 140"),
        entry("calc 2", "MATH 141"),
        entry("calculus 2", "MATH 141"),
        entry("calc 3", "MATH 222"),
        entry("calculus 3", "MATH 222"),
        entry("linear algebra", "MATH 133"),
        entry("lin alg", "MATH 133"),
        entry("discrete math", "MATH 240"),
        entry("discrete", "MATH 240"),
        entry("ode", "MATH 323"),
        entry("pde", "MATH 324"),
        entry("real analysis", "MATH 242"),
        // CS courses
        entry("intro to cs", "COMP 202"),
        entry("intro cs", "COMP 202"),
        entry("data structures", "COMP 250"),
        entry("algorithms", "COMP 251"),
        entry("operating systems", "COMP 310"),
        entry("os", "COMP 310"),
        entry("databases", "COMP 421"),
        entry("ai", "COMP 424"),
        entry("machine learning", "COMP 551"),
        entry("ml", "COMP 551"),
        entry("compilers", "COMP 520"),
        entry("computer graphics", "COMP 557"),
        entry("graphics", "COMP 557"),
    ]
}

fn default_departments() -> Vec<DepartmentEntry> {
    fn entry(pattern: &str, department: &str) -> DepartmentEntry {
        DepartmentEntry {
            pattern: pattern.to_string(),
            department: department.to_string(),
        }
    }
    vec![
        // Computer science & engineering
        entry(r"\b(cs|comp(?:uter)?(?:\s+science)?)\b", "COMP"),
        entry(r"\b(software\s+engineering?|swe)\b", "ECSE"),
        entry(r"\b(ecse|electrical(?:\s+engineering)?|ece)\b", "ECSE"),
        entry(r"\b(mech(?:anical)?(?:\s+engineering)?)\b", "MECH"),
        entry(r"\b(civil(?:\s+engineering)?|cive)\b", "CIVE"),
        entry(r"\b(mining(?:\s+engineering)?|mimi)\b", "MIMI"),
        // Sciences
        entry(r"\b(math(?:ematics)?)\b", "MATH"),
        entry(r"\b(phys(?:ics)?)\b", "PHYS"),
        entry(r"\b(chem(?:istry)?)\b", "CHEM"),
        entry(r"\b(biol(?:ogy)?)\b", "BIOL"),
        entry(r"\b(biochem(?:istry)?|bioc)\b", "BIOC"),
        entry(r"\b(neurosci(?:ence)?|nrsc)\b", "NRSC"),
        entry(r"\b(microbiol(?:ogy)?|immunol(?:ogy)?|mimm)\b", "MIMM"),
        entry(r"\b(anat(?:omy)?)\b", "ANAT"),
        entry(r"\b(physiol(?:ogy)?|phgy)\b", "PHGY"),
        entry(r"\b(atmospheric|oceanograph(?:y|ic)?|atoc)\b", "ATOC"),
        entry(r"\b(earth\s+(?:and\s+)?planetary|epsc)\b", "EPSC"),
        entry(r"\b(pharmac(?:y|ology)|phar)\b", "PHAR"),
        // Social sciences
        entry(r"\b(econ(?:omics)?)\b", "ECON"),
        entry(r"\b(psyc(?:hology)?)\b", "PSYC"),
        entry(r"\b(soci(?:ology)?)\b", "SOCI"),
        entry(r"\b(anth(?:ropology)?)\b", "ANTH"),
        entry(r"\b(poli(?:tical)?\s*sci(?:ence)?|political\s+science)\b", "POLI"),
        entry(r"\b(geog(?:raphy)?)\b", "GEOG"),
        entry(r"\b(ling(?:uistics)?)\b", "LING"),
        entry(r"\b(kine(?:siology)?)\b", "KINE"),
        entry(r"\b(social\s+work|swrk)\b", "SWRK"),
        entry(r"\b(nutr(?:ition)?|diet(?:etics)?)\b", "NUTR"),
        // Humanities
        entry(r"\b(hist(?:ory)?)\b", "HIST"),
        entry(r"\b(english|engl)\b", "ENGL"),
        entry(r"\b(french\s+(?:language|lit|studies?)|fren)\b", "FREN"),
        entry(r"\b(phil(?:osophy)?)\b", "PHIL"),
        entry(r"\b(relig(?:ion|ious\s+stud(?:ies)?))\b", "RELI"),
        entry(r"\b(art\s+hist(?:ory)?|arth)\b", "ARTH"),
        entry(r"\b(music|musc)\b", "MUSC"),
        // Professional / other
        entry(r"\b(mgmt|management)\b", "MGMT"),
        entry(r"\b(nurs(?:ing)?)\b", "NURS"),
        entry(r"\b(envir(?:onmental)?(?:\s+stud(?:ies)?)?|envi)\b", "ENVI"),
        entry(r"\b(educ(?:ation)?|edpe|edsl)\b", "EDPE"),
    ]
}

fn default_terms() -> Vec<TermEntry> {
    fn entry(keyword: &str, term: &str) -> TermEntry {
        TermEntry {
            keyword: keyword.to_string(),
            term: term.to_string(),
        }
    }
    vec![
        entry("fall", "fall"),
        entry("autumn", "fall"),
        entry("first semester", "fall"),
        entry("semester 1", "fall"),
        entry("f1", "fall"),
        entry("winter", "winter"),
        entry("second semester", "winter"),
        entry("semester 2", "winter"),
        entry("w2", "winter"),
        entry("summer", "summer"),
    ]
}

fn default_levels() -> Vec<LevelEntry> {
    fn entry(pattern: &str, level: Option<u32>) -> LevelEntry {
        LevelEntry {
            pattern: pattern.to_string(),
            level,
        }
    }
    vec![
        // U2/U3/U4 are McGill-specific year notations
        entry(r"\bu2\b", Some(200)),
        entry(r"\bu3\b", Some(300)),
        entry(r"\bu4\b", Some(400)),
        entry(r"\b(?:second|2nd|sophomore)\s*(?:year)?\b", Some(200)),
        entry(r"\b(?:third|3rd|junior)\s*(?:year)?\b", Some(300)),
        entry(r"\b(?:fourth|4th|senior)\s*(?:year)?\b", Some(400)),
        entry(r"\b(?:graduate|grad|masters?|phd)\b", Some(500)),
        // "200-level" - level digit extracted from the match
        entry(r"\b(\d)00[\s-]?level\b", None),
    ]
}

fn default_code_deny_list() -> Vec<String> {
    // Common English words that look like department codes (3-4 uppercase
    // letters) but aren't. Without this, "WHAT 200-level courses" would
    // match as course code "WHAT 200".
    [
        "WHAT", "THAT", "HAVE", "THIS", "WHEN", "THEN", "WITH", "FROM",
        "TAKE", "GIVE", "FIND", "LIST", "SHOW", "NEED", "WANT", "LIKE",
        "DOES", "EACH", "MANY", "MORE", "MUCH", "MOST", "NEXT", "SOME",
        "SUCH", "VERY", "WELL", "WILL", "THEY", "THEM", "YOUR", "YEAR",
        "ALSO", "INTO", "OVER", "LAST", "LONG", "LOOK", "MAKE", "JUST",
        "KNOW", "LESS", "MUST", "NONE", "ONLY", "PLAN", "REAL", "SAME",
        "TELL", "TEST", "TIME", "TRUE", "TURN", "TYPE", "WAIT", "WORK",
        "OPEN", "HOLD", "STAY", "STOP", "STEP", "BOTH", "EVEN", "WERE",
        "BEEN", "KEEP", "WENT", "BEST", "PICK", "SKIP", "HELP", "DONE",
    ]
    .iter()
    .map(|w| w.to_string())
    .collect()
}

fn default_title_prefixes() -> Vec<String> {
    [
        r"^what are the prerequisites for\s+",
        r"^what are the prereqs for\s+",
        r"^what do i need for\s+",
        r"^prerequisites for\s+",
        r"^prereqs for\s+",
        r"^requirements for\s+",
        r"^what is\s+",
        r"^tell me about\s+",
        r"^describe\s+",
        r"^when is\s+",
        r"^is\s+",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_title_suffixes() -> Vec<String> {
    [r"\s+about\?*$", r"\s+offered\?*$", r"\s+like\?*$", r"\?+$"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_chain_patterns() -> Vec<String> {
    [
        r"should i take .+ before",
        r"do i need .+ before",
        r"is .+ required (?:for|before)",
        r"take .+ before .+\?",
        r"need .+ (?:for|to take)",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_reverse_patterns() -> Vec<String> {
    [
        r"what can i take after",
        r"what should i take after",
        r"what courses? require",
        r"i finished .+,? what'?s next",
        r"after .+,? what",
        r"courses? that need",
        r"what(?:'s| is) next after",
        r"take after",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_first_semester_patterns() -> Vec<String> {
    [
        // McGill U0 (foundation program) and U1 map to entry-level courses
        r"\bu0\b",
        r"\bu1\b",
        r"foundation\s+program",
        r"first\s*(?:semester|year)",
        r"start(?:ing)?\s*(?:with|out)",
        r"begin(?:ning|ner)?",
        r"intro(?:ductory|duction)?",
        r"entry[\s-]?level",
        r"no\s*prereq",
        r"should\s+i\s+take\s+first",
        r"take\s+first",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_available_markers() -> Vec<String> {
    [
        r"\b(?:after|with|having|completed?|done|finished|took)\b",
        r"available\s+to\s+(?:me|take)",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_recommendation_patterns() -> Vec<String> {
    [
        r"should\s+i\s+take",
        r"recommend",
        r"suggest",
        r"best\s+courses?",
        r"good\s+courses?",
        r"what\s+courses?\s+(?:should|to)",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_prereqs_for_phrases() -> Vec<String> {
    [
        "prerequisite for",
        "prerequisites for",
        "prereqs for",
        "what do i need for",
        "requirements for",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

fn default_requires_phrases() -> Vec<String> {
    [
        "require",
        "need",
        "courses that use",
        "after",
        "next",
        "finished",
        "completed",
        "done with",
        "taken",
        "what can i take",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}
