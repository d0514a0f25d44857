//! Apply-edit flow: ask a chat model to rewrite a document, review the
//! result block by block, then write it back.
//!
//! ```text
//! read(path) ─▶ ChatModel ─▶ strip ``` fence ─▶ DiffReview
//!                                                   │ accept / reject
//!                                                   ▼
//!                                      finalize ─▶ write(path)
//! ```

use anyhow::{Context, Result};
use futures::StreamExt;

use quill_core::chat::{ChatMessage, ChatModel};
use quill_core::diff::DiffReview;
use quill_core::document::DocumentStore;

const EDIT_SYSTEM_PROMPT: &str = "You edit markdown notes. Apply the user's instruction to the \
document and reply with the complete updated document only, without commentary.";

fn edit_messages(path: &str, current: &str, instruction: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(EDIT_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Document `{}`:\n\n{}\n\nInstruction: {}",
            path, current, instruction
        )),
    ]
}

/// Ask `chat` to apply `instruction` to the document at `path`.
///
/// Returns a review of the proposed rewrite against the current text;
/// nothing is written until [`commit_review`].
pub async fn request_edit(
    chat: &dyn ChatModel,
    documents: &dyn DocumentStore,
    path: &str,
    instruction: &str,
) -> Result<DiffReview> {
    let current = documents
        .read(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    let reply = chat
        .generate(&edit_messages(path, &current, instruction))
        .await
        .context("Chat model failed to generate an edit")?;
    Ok(review_reply(&current, &reply))
}

/// Like [`request_edit`], but consumes the chat model's delta stream and
/// hands each delta to `on_delta` as it arrives.
pub async fn request_edit_streaming<F>(
    chat: &dyn ChatModel,
    documents: &dyn DocumentStore,
    path: &str,
    instruction: &str,
    mut on_delta: F,
) -> Result<DiffReview>
where
    F: FnMut(&str) + Send,
{
    let current = documents
        .read(path)
        .await
        .with_context(|| format!("Failed to read {}", path))?;
    let mut deltas = chat
        .stream(&edit_messages(path, &current, instruction))
        .await
        .context("Chat model failed to start streaming")?;

    let mut reply = String::new();
    while let Some(delta) = deltas.next().await {
        let delta = delta.context("Chat stream failed")?;
        on_delta(&delta);
        reply.push_str(&delta);
    }
    Ok(review_reply(&current, &reply))
}

/// Write the finalized review to `path`.
///
/// Undecided changes keep their original text.
pub async fn commit_review(
    documents: &dyn DocumentStore,
    path: &str,
    review: &DiffReview,
) -> Result<String> {
    let text = review.finalize();
    documents
        .write(path, &text)
        .await
        .with_context(|| format!("Failed to write {}", path))?;
    tracing::info!(path, remaining = review.pending(), "Committed reviewed edit");
    Ok(text)
}

fn review_reply(current: &str, reply: &str) -> DiffReview {
    let mut proposed = strip_code_fence(reply).to_string();
    // Models add or drop the final newline at random; keep the document's.
    match (current.ends_with('\n'), proposed.ends_with('\n')) {
        (true, false) => proposed.push('\n'),
        (false, true) => {
            proposed.pop();
        }
        _ => {}
    }
    DiffReview::from_texts(current, &proposed)
}

/// Unwrap a reply that is a single fenced code block.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return reply;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return reply;
    };
    // Drop the info string (```markdown) up to the first newline.
    match body.find('\n') {
        Some(newline) => body[newline + 1..].strip_suffix('\n').unwrap_or(&body[newline + 1..]),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use quill_core::diff::DiffBlock;
    use quill_core::document::InMemoryDocumentStore;

    struct FixedReply(&'static str);

    #[async_trait]
    impl ChatModel for FixedReply {
        async fn generate(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.0.to_string())
        }

        async fn stream(
            &self,
            _messages: &[ChatMessage],
        ) -> Result<BoxStream<'static, Result<String>>> {
            let parts: Vec<Result<String>> = self
                .0
                .split_inclusive(' ')
                .map(|s| Ok(s.to_string()))
                .collect();
            Ok(stream::iter(parts).boxed())
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```markdown\n# Title\nBody\n```"), "# Title\nBody");
        assert_eq!(strip_code_fence("```\nplain\n```\n"), "plain");
        assert_eq!(strip_code_fence("no fence"), "no fence");
        assert_eq!(strip_code_fence("```unterminated\ntext"), "```unterminated\ntext");
    }

    #[tokio::test]
    async fn test_request_and_commit_accepted_edit() {
        let docs = InMemoryDocumentStore::new();
        docs.put("note.md", 1, "# Colors\nThe color red.\n");
        let chat = FixedReply("```markdown\n# Colors\nThe colour red.\n```");

        let mut review = request_edit(&chat, &docs, "note.md", "use British spelling")
            .await
            .unwrap();
        assert_eq!(review.pending(), 1);
        assert!(matches!(review.blocks()[0], DiffBlock::Unchanged { .. }));

        review.accept_all();
        let written = commit_review(&docs, "note.md", &review).await.unwrap();
        assert_eq!(written, "# Colors\nThe colour red.\n");
        assert_eq!(docs.read("note.md").await.unwrap(), written);
    }

    #[tokio::test]
    async fn test_rejected_edit_leaves_document_unchanged() {
        let docs = InMemoryDocumentStore::new();
        docs.put("note.md", 1, "alpha\nbeta");
        let chat = FixedReply("alpha\ngamma");

        let mut review = request_edit(&chat, &docs, "note.md", "rewrite").await.unwrap();
        review.reject_all();
        let written = commit_review(&docs, "note.md", &review).await.unwrap();
        assert_eq!(written, "alpha\nbeta");
    }

    #[tokio::test]
    async fn test_streaming_edit_collects_deltas() {
        let docs = InMemoryDocumentStore::new();
        docs.put("note.md", 1, "one two");
        let chat = FixedReply("one two three");

        let mut seen = Vec::new();
        let mut review = request_edit_streaming(&chat, &docs, "note.md", "extend", |d| {
            seen.push(d.to_string())
        })
        .await
        .unwrap();
        assert_eq!(seen.concat(), "one two three");

        review.accept_all();
        assert_eq!(review.finalize(), "one two three");
    }

    #[tokio::test]
    async fn test_reply_follows_document_final_newline() {
        let docs = InMemoryDocumentStore::new();
        docs.put("bare.md", 1, "alpha\nbeta");
        docs.put("ended.md", 1, "alpha\nbeta\n");

        let added = request_edit(&FixedReply("alpha\ngamma\n"), &docs, "bare.md", "x")
            .await
            .unwrap();
        assert_eq!(added.pending(), 1);
        assert!(!added.blocks().iter().any(|b| matches!(b,
            DiffBlock::Modified(m) if m.modified_value.as_deref() == Some(""))));

        let mut dropped = request_edit(&FixedReply("alpha\ngamma"), &docs, "ended.md", "x")
            .await
            .unwrap();
        assert_eq!(dropped.pending(), 1);
        dropped.accept_all();
        assert_eq!(dropped.finalize(), "alpha\ngamma\n");
    }

    #[tokio::test]
    async fn test_missing_document_is_an_error() {
        let docs = InMemoryDocumentStore::new();
        let chat = FixedReply("anything");
        assert!(request_edit(&chat, &docs, "missing.md", "x").await.is_err());
    }
}
