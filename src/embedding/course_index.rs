//! Course similarity index built from the catalog
//!
//! Each course becomes one document (title + description + prerequisite and
//! corequisite sentences), embedded and inserted into the HNSW index. Ids
//! are positional; the index owns the id <-> course code mapping and the
//! metadata needed by callers.

use crate::catalog::CourseStore;
use crate::config::IndexingConfig;
use crate::embedding::{
    CourseMeta, EmbeddingProvider, SemanticHit, SimilarityIndex, VectorIndex,
};
use crate::error::Result;
use ahash::AHashMap;
use std::sync::{Arc, OnceLock};

/// HNSW-backed similarity index over course documents
pub struct CourseVectorIndex {
    provider: Arc<dyn EmbeddingProvider>,
    index: VectorIndex,
    /// Internal id (vector position) -> course id
    ids: Vec<String>,
    meta: AHashMap<String, CourseMeta>,
}

impl CourseVectorIndex {
    /// Embed every catalog course and build the index
    pub fn build(
        store: &dyn CourseStore,
        provider: Arc<dyn EmbeddingProvider>,
        indexing: &IndexingConfig,
        batch_size: usize,
    ) -> Result<Self> {
        let courses = store.all_courses()?;
        let index = VectorIndex::new(
            provider.dimension(),
            indexing.hnsw_ef_construction,
            indexing.hnsw_m,
            indexing.hnsw_ef_search,
        );

        let mut ids = Vec::with_capacity(courses.len());
        let mut meta = AHashMap::with_capacity(courses.len());
        let mut documents = Vec::with_capacity(courses.len());

        for course in &courses {
            let text = course.document_text();
            if text.is_empty() {
                continue;
            }
            meta.insert(
                course.id.clone(),
                CourseMeta {
                    course_id: course.id.clone(),
                    title: course.title.clone(),
                    department: course.department_code().to_string(),
                },
            );
            ids.push(course.id.clone());
            documents.push(text);
        }

        tracing::info!(courses = ids.len(), "building course similarity index");

        let batch_size = batch_size.max(1);
        let mut offset = 0;
        for chunk in documents.chunks(batch_size) {
            let embeddings = provider.embed_batch(chunk)?;
            let items: Vec<(u64, Vec<f32>)> = embeddings
                .into_iter()
                .enumerate()
                .map(|(i, v)| ((offset + i) as u64, v))
                .collect();
            index.insert_batch(&items)?;
            offset += chunk.len();
        }

        Ok(Self {
            provider,
            index,
            ids,
            meta,
        })
    }
}

impl SimilarityIndex for CourseVectorIndex {
    fn query(&self, text: &str, k: usize) -> Result<Vec<SemanticHit>> {
        if self.ids.is_empty() {
            return Ok(Vec::new());
        }
        let embedding = self.provider.embed(text)?;
        let neighbors = self.index.search(&embedding, k)?;
        Ok(neighbors
            .into_iter()
            .filter_map(|n| {
                self.ids.get(n.id as usize).map(|course_id| SemanticHit {
                    course_id: course_id.clone(),
                    distance: n.distance,
                })
            })
            .collect())
    }

    fn get_metadata(&self, ids: &[String]) -> Result<Vec<CourseMeta>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.meta.get(id).cloned())
            .collect())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// Similarity index that embeds the catalog on first semantic query
///
/// Structural and planning lookups never touch the index, so building it
/// eagerly would pay a model download for queries that don't need one.
/// Racing first queries may build twice; the loser is discarded.
pub struct LazyCourseIndex {
    store: Arc<dyn CourseStore>,
    model_name: String,
    indexing: IndexingConfig,
    batch_size: usize,
    inner: OnceLock<CourseVectorIndex>,
}

impl LazyCourseIndex {
    pub fn new(
        store: Arc<dyn CourseStore>,
        model_name: String,
        indexing: IndexingConfig,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            model_name,
            indexing,
            batch_size,
            inner: OnceLock::new(),
        }
    }

    fn inner(&self) -> Result<&CourseVectorIndex> {
        if let Some(index) = self.inner.get() {
            return Ok(index);
        }
        let provider = Arc::new(super::FastEmbedProvider::new(&self.model_name)?);
        let built = CourseVectorIndex::build(
            self.store.as_ref(),
            provider,
            &self.indexing,
            self.batch_size,
        )?;
        Ok(self.inner.get_or_init(|| built))
    }
}

impl SimilarityIndex for LazyCourseIndex {
    fn query(&self, text: &str, k: usize) -> Result<Vec<SemanticHit>> {
        self.inner()?.query(text, k)
    }

    fn get_metadata(&self, ids: &[String]) -> Result<Vec<CourseMeta>> {
        self.inner()?.get_metadata(ids)
    }

    fn len(&self) -> usize {
        self.inner.get().map(|i| i.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdvisrError;

    /// Deterministic provider: hashes characters into a small vector
    struct TestProvider;

    impl EmbeddingProvider for TestProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.is_empty() {
                return Err(AdvisrError::Embedding("Empty text".to_string()));
            }
            let mut v = vec![0.0f32; 8];
            for (i, b) in text.bytes().enumerate() {
                v[i % 8] += b as f32 / 255.0;
            }
            Ok(v)
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            texts.iter().map(|t| self.embed(t)).collect()
        }

        fn dimension(&self) -> usize {
            8
        }

        fn model_name(&self) -> &str {
            "test-hash"
        }
    }

    #[test]
    fn test_query_returns_known_course_ids() {
        use crate::catalog::{CatalogDb, CourseRecord, SqliteCourseStore};
        use tempfile::TempDir;

        let temp = TempDir::new().unwrap();
        let store = SqliteCourseStore::new(CatalogDb::open(&temp.path().join("c.db")).unwrap());
        for (id, title) in [
            ("COMP 250", "Introduction to Computer Science"),
            ("COMP 310", "Operating Systems"),
            ("MATH 133", "Linear Algebra and Geometry"),
        ] {
            store
                .upsert_course(&CourseRecord {
                    id: id.to_string(),
                    title: title.to_string(),
                    description: format!("About {}.", title),
                    credits: 3.0,
                    department: id.split_whitespace().next().unwrap().to_string(),
                    offered_fall: true,
                    offered_winter: false,
                    offered_summer: false,
                    prereq_text: String::new(),
                    coreq_text: String::new(),
                })
                .unwrap();
        }

        let index = CourseVectorIndex::build(
            &store,
            Arc::new(TestProvider),
            &IndexingConfig::default(),
            2,
        )
        .unwrap();
        assert_eq!(index.len(), 3);

        let hits = index.query("computer science introduction", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| ["COMP 250", "COMP 310", "MATH 133"]
            .contains(&h.course_id.as_str())));
        // Ascending distance
        assert!(hits[0].distance <= hits[1].distance);

        let meta = index
            .get_metadata(&["COMP 310".to_string(), "NOPE 999".to_string()])
            .unwrap();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].title, "Operating Systems");
    }
}
