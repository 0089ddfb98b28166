//! Advisr - Course Catalog Assistant
//!
//! Answers natural-language questions about university course offerings and
//! prerequisites by combining deterministic catalog lookups with semantic
//! retrieval over course descriptions, then handing the assembled evidence
//! to an external answer-generation layer.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod entities;
pub mod error;
pub mod patterns;
pub mod retrieval;

pub use error::{AdvisrError, Result};
