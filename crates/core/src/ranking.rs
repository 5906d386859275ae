use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::EmbedError;
use crate::models::RankedText;
use tracing::debug;

pub const DEFAULT_TOP_K: usize = 2;

/// Scores every text against `query` by cosine similarity and returns the
/// `top_k` best, highest first. Equal scores keep their input order.
pub fn rank_texts(
    embedder: &dyn Embedder,
    query: &str,
    texts: &[String],
    top_k: usize,
) -> Result<Vec<RankedText>, EmbedError> {
    if texts.is_empty() || top_k == 0 {
        return Ok(Vec::new());
    }

    let query_vector = embedder.embed(query)?;
    let vectors = embedder.embed_batch(texts)?;
    if vectors.len() != texts.len() {
        return Err(EmbedError::CountMismatch {
            expected: texts.len(),
            got: vectors.len(),
        });
    }

    let mut ranked = texts
        .iter()
        .zip(vectors.iter())
        .enumerate()
        .map(|(index, (text, vector))| RankedText {
            index,
            text: text.clone(),
            score: cosine_similarity(&query_vector, vector),
        })
        .collect::<Vec<_>>();

    ranked.sort_by(|left, right| right.score.total_cmp(&left.score));
    ranked.truncate(top_k);

    debug!(
        model = embedder.model_name(),
        candidates = texts.len(),
        scores = ?ranked.iter().map(|hit| hit.score).collect::<Vec<_>>(),
        "ranked texts"
    );

    Ok(ranked)
}
