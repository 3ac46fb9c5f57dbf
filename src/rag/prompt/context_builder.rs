//! Context block handed to the answer generator.

use crate::rag::core::candidate::Passage;

/// Reply used instead of calling the generator when retrieval found nothing.
pub const NO_DOCUMENTS_ANSWER: &str = "Aucun document chargé, je ne peux pas répondre.";

/// Citation marker for a source: its file name wrapped in `[[...]]`.
#[must_use]
pub fn citation(source: &str) -> String {
    let name = source.rsplit(['/', '\\']).next().unwrap_or(source);
    format!("[[{name}]]")
}

/// Render ranked passages and the question into one deterministic block.
///
/// Each passage is preceded by its citation marker so the generator can quote
/// sources in the same format.
#[must_use]
pub fn build_context_block(query: &str, passages: &[Passage]) -> String {
    let body_len: usize = passages.iter().map(|p| p.text.len() + 64).sum();
    let mut out = String::with_capacity(body_len + query.len() + 32);

    out.push_str("[CONTEXT]\n");
    for passage in passages {
        out.push_str(&citation(&passage.metadata.source));
        if let Some(workspace) = passage.metadata.workspace_tag() {
            out.push_str(" (workspace: ");
            out.push_str(workspace);
            out.push(')');
        }
        out.push('\n');
        out.push_str(passage.text.trim());
        out.push_str("\n\n");
    }

    out.push_str("[QUESTION]\n");
    out.push_str(query.trim());
    out.push('\n');

    out
}
