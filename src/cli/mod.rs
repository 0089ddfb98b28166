//! CLI command definitions and parsing
use crate::catalog::CourseRecord;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "advisr",
    version,
    about = "Course catalog assistant with hybrid structured + semantic retrieval",
    long_about = "Advisr answers natural-language questions about course offerings and \
                  prerequisites by combining deterministic catalog lookups with semantic \
                  search over course descriptions."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/advisr/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Profile to apply on top of the configuration
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Load a JSON course dump into the catalog
    Load {
        /// Path to the JSON dump (array of course entries)
        file: PathBuf,
    },

    /// Answer a question with hybrid retrieval
    Search {
        /// The question text
        query: String,

        /// Maximum number of semantic results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print the raw retrieval result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check eligibility for a course given completed/current courses
    Check {
        /// Target course code, e.g. "COMP 307"
        target: String,

        /// Completed courses, comma separated
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,

        /// Courses being taken this term, comma separated
        #[arg(long, value_delimiter = ',')]
        current: Vec<String>,
    },

    /// Show catalog statistics
    Stats,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the active configuration
    Show,
    /// Print the configuration file path
    Path,
}

/// One entry of a JSON course dump: a course row plus its edges
#[derive(Debug, Deserialize)]
pub struct CourseDumpEntry {
    #[serde(flatten)]
    pub course: CourseRecord,
    /// Course ids required before this course
    #[serde(default)]
    pub prereq_edges: Vec<String>,
    /// Course ids co-required with this course
    #[serde(default)]
    pub coreq_edges: Vec<String>,
}
