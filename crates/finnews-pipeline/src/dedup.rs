//! Near-duplicate clustering over embedding similarity.
//!
//! Articles are visited in run order. Each unvisited article seeds a group
//! that absorbs every later unvisited article similar enough to it, so the
//! representative of a cluster is always its lowest-indexed member. No
//! randomness is involved: the same similarity matrix always produces the
//! same clusters.

use std::sync::Arc;

use finnews_core::{Article, Cluster, DedupLinkage, Embedder, ScoringError};

pub const DEFAULT_THRESHOLD: f32 = 0.80;

/// Cosine similarity. A zero vector is similar to nothing.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Full pairwise cosine similarity matrix.
#[must_use]
pub fn similarity_matrix(embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n = embeddings.len();
    let mut matrix = vec![vec![0.0_f32; n]; n];
    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let s = cosine_similarity(&embeddings[i], &embeddings[j]);
            matrix[i][j] = s;
            matrix[j][i] = s;
        }
    }
    matrix
}

/// Group indices `0..n` given an `n x n` similarity matrix.
///
/// With [`DedupLinkage::Seed`] a candidate joins when its similarity to the
/// seed reaches `threshold`. With [`DedupLinkage::Complete`] it must reach
/// `threshold` against every member already in the group. The boundary is
/// inclusive. Each group lists its members in ascending index order.
#[must_use]
pub fn cluster_by_similarity(
    similarity: &[Vec<f32>],
    threshold: f32,
    linkage: DedupLinkage,
) -> Vec<Vec<usize>> {
    let n = similarity.len();
    let mut visited = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let mut group = vec![i];

        for j in (i + 1)..n {
            if visited[j] {
                continue;
            }
            let joins = match linkage {
                DedupLinkage::Seed => similarity[i][j] >= threshold,
                DedupLinkage::Complete => group.iter().all(|&m| similarity[m][j] >= threshold),
            };
            if joins {
                visited[j] = true;
                group.push(j);
            }
        }
        groups.push(group);
    }
    groups
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupOutcome {
    /// One representative per cluster, in run order.
    pub unique: Vec<Article>,
    pub clusters: Vec<Cluster>,
}

pub struct DedupClusterer {
    embedder: Arc<dyn Embedder>,
    threshold: f32,
    linkage: DedupLinkage,
}

impl DedupClusterer {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, threshold: f32, linkage: DedupLinkage) -> Self {
        Self {
            embedder,
            threshold,
            linkage,
        }
    }

    /// Cluster one run's articles.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError`] if the embedder fails or returns the wrong
    /// number of vectors.
    pub async fn cluster(&self, articles: Vec<Article>) -> Result<DedupOutcome, ScoringError> {
        let groups = match articles.len() {
            0 => return Ok(DedupOutcome::default()),
            1 => vec![vec![0]],
            n => {
                let texts: Vec<String> = articles.iter().map(|a| a.text.clone()).collect();
                let embeddings = self.embedder.embed(&texts).await?;
                if embeddings.len() != n {
                    return Err(ScoringError::InvalidResponse(format!(
                        "embedder returned {} vectors for {n} articles",
                        embeddings.len()
                    )));
                }
                cluster_by_similarity(&similarity_matrix(&embeddings), self.threshold, self.linkage)
            }
        };

        Ok(assemble(articles, &groups))
    }
}

fn assemble(articles: Vec<Article>, groups: &[Vec<usize>]) -> DedupOutcome {
    let clusters: Vec<Cluster> = groups
        .iter()
        .map(|g| Cluster {
            main_id: articles[g[0]].id,
            merged_ids: g.iter().map(|&i| articles[i].id).collect(),
        })
        .collect();

    let mut is_main = vec![false; articles.len()];
    for g in groups {
        is_main[g[0]] = true;
    }
    let unique = articles
        .into_iter()
        .zip(is_main)
        .filter_map(|(a, keep)| keep.then_some(a))
        .collect();

    DedupOutcome { unique, clusters }
}

#[cfg(test)]
#[path = "dedup_test.rs"]
mod tests;
