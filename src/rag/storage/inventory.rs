//! Per-document summary of what the embeddings index holds.

use serde::Serialize;

use crate::rag::core::candidate::Passage;
use crate::rag::core::errors::RagResult;
use crate::rag::storage::embeddings_index::EmbeddingsIndex;

/// Chunk statistics for one source document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    /// Document path or key.
    pub source: String,
    /// Workspace of the first chunk seen, empty when unscoped.
    pub workspace: String,
    /// Number of stored chunks.
    pub chunk_count: usize,
    /// Smallest and largest `start_index` among the chunks that carry one.
    pub start_range: Option<(i64, i64)>,
}

/// Group the corpus snapshot by source, in first-seen order.
///
/// # Errors
/// Returns an error if the snapshot cannot be read.
pub async fn summarize_sources(index: &dyn EmbeddingsIndex) -> RagResult<Vec<SourceSummary>> {
    let snapshot = index.get_all().await?;
    Ok(group_by_source(&snapshot))
}

fn group_by_source(snapshot: &[Passage]) -> Vec<SourceSummary> {
    let mut summaries: Vec<SourceSummary> = Vec::new();
    for passage in snapshot {
        let meta = &passage.metadata;
        let position = summaries.iter().position(|s| s.source == meta.source);
        let summary = if let Some(position) = position {
            &mut summaries[position]
        } else {
            summaries.push(SourceSummary {
                source: meta.source.clone(),
                workspace: meta.workspace.clone().unwrap_or_default(),
                chunk_count: 0,
                start_range: None,
            });
            let last = summaries.len() - 1;
            &mut summaries[last]
        };

        summary.chunk_count += 1;
        if let Some(start) = meta.start_index {
            summary.start_range = Some(match summary.start_range {
                Some((min, max)) => (min.min(start), max.max(start)),
                None => (start, start),
            });
        }
    }
    summaries
}
