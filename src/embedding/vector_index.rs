/// HNSW vector index for approximate nearest-neighbor search
use crate::error::AdvisrError;
use hnsw_rs::prelude::*;
use std::sync::RwLock;

type Result<T> = std::result::Result<T, AdvisrError>;

/// A nearest-neighbor match
#[derive(Debug, Clone)]
pub struct NearestNeighbor {
    /// Internal id of the indexed item
    pub id: u64,
    /// Cosine distance; lower is more similar
    pub distance: f32,
}

/// In-memory HNSW index over normalized embeddings
///
/// Rebuilt from the catalog whenever the process needs it; the catalog is
/// small enough that persistence is not worth the complexity.
pub struct VectorIndex {
    index: RwLock<Hnsw<'static, f32, DistCosine>>,
    dimension: usize,
    count: RwLock<u64>,
    ef_search: usize,
}

impl VectorIndex {
    /// Create an empty index
    ///
    /// `ef_construction` and `m` are the usual HNSW build parameters
    /// (higher = better recall, slower build).
    pub fn new(dimension: usize, ef_construction: usize, m: usize, ef_search: usize) -> Self {
        let index = Hnsw::<f32, DistCosine>::new(m, dimension, ef_construction, 200, DistCosine);
        Self {
            index: RwLock::new(index),
            dimension,
            count: RwLock::new(0),
            ef_search,
        }
    }

    /// Insert one vector
    pub fn insert(&self, id: u64, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(AdvisrError::SimilarityIndex(format!(
                "invalid dimension: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }

        let data = vector.to_vec();
        let index = self
            .index
            .write()
            .map_err(|_| AdvisrError::SimilarityIndex("index lock poisoned".to_string()))?;
        index.insert((&data, id as usize));

        let mut count = self
            .count
            .write()
            .map_err(|_| AdvisrError::SimilarityIndex("index lock poisoned".to_string()))?;
        *count += 1;

        Ok(())
    }

    /// Insert multiple vectors
    pub fn insert_batch(&self, items: &[(u64, Vec<f32>)]) -> Result<()> {
        for (id, vector) in items {
            self.insert(*id, vector)?;
        }
        Ok(())
    }

    /// k nearest neighbors, ascending distance
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<NearestNeighbor>> {
        if query.len() != self.dimension {
            return Err(AdvisrError::SimilarityIndex(format!(
                "invalid dimension: expected {}, got {}",
                self.dimension,
                query.len()
            )));
        }

        let index = self
            .index
            .read()
            .map_err(|_| AdvisrError::SimilarityIndex("index lock poisoned".to_string()))?;
        let neighbors = index.search(query, k, self.ef_search);

        Ok(neighbors
            .into_iter()
            .map(|n| NearestNeighbor {
                id: n.d_id as u64,
                distance: n.distance,
            })
            .collect())
    }

    /// Number of indexed vectors
    pub fn len(&self) -> u64 {
        self.count.read().map(|c| *c).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}
