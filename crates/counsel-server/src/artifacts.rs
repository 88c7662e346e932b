//! Turns a finished reply into at most one downloadable artifact.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use bytes::Bytes;
use chrono::Utc;
use counsel_core::{
  artifact::{ArtifactKind, ArtifactPolicy, OutputArtifact, artifact_title},
  classify::RequestType,
  upstream::ObjectStore,
};
use uuid::Uuid;

/// Where rendered bytes go.
#[derive(Clone)]
enum Delivery {
  Inline,
  Upload(Arc<dyn ObjectStore>),
}

#[derive(Clone)]
pub struct ArtifactGenerator {
  policy:   ArtifactPolicy,
  delivery: Delivery,
}

impl ArtifactGenerator {
  /// Artifacts are returned as base64 content in the reply.
  pub fn inline(policy: ArtifactPolicy) -> Self { Self { policy, delivery: Delivery::Inline } }

  /// Artifacts are uploaded and returned by URL.
  pub fn uploading(policy: ArtifactPolicy, store: Arc<dyn ObjectStore>) -> Self {
    Self { policy, delivery: Delivery::Upload(store) }
  }

  /// Build the artifact for `reply`, if the policy calls for one.
  ///
  /// Rendering and upload failures are logged and yield `None`; they never
  /// fail the chat request.
  pub async fn generate(
    &self,
    request_type: RequestType,
    message: &str,
    session_id: &str,
    reply: &str,
  ) -> Option<OutputArtifact> {
    let kind = self.policy.decide(request_type, reply)?;
    let title = artifact_title(kind, message);
    let filename = format!("{session_id}_{}.{}", Uuid::new_v4(), kind.extension());

    let bytes = match render(kind, &title, reply).await {
      Ok(Ok(bytes)) => bytes,
      Ok(Err(e)) => {
        tracing::error!(%kind, session_id, error = %e, "artifact rendering failed");
        return None;
      }
      Err(e) => {
        tracing::error!(%kind, session_id, error = %e, "artifact rendering task failed");
        return None;
      }
    };

    let (content, url) = match &self.delivery {
      Delivery::Inline => (Some(B64.encode(&bytes)), None),
      Delivery::Upload(store) => {
        let key = format!("{}/{filename}", kind.key_prefix());
        match store.put(&key, Bytes::from(bytes), kind.content_type()).await {
          Ok(url) => (None, Some(url)),
          Err(e) => {
            tracing::error!(%kind, key = %key, error = %e, "artifact upload failed");
            return None;
          }
        }
      }
    };

    tracing::info!(%kind, session_id, "generated artifact");
    Some(OutputArtifact { kind, title, filename, content, url })
  }
}

/// Layout and encoding run on the blocking pool.
async fn render(
  kind: ArtifactKind,
  title: &str,
  reply: &str,
) -> Result<counsel_docs::Result<Vec<u8>>, tokio::task::JoinError> {
  let (title, reply) = (title.to_owned(), reply.to_owned());
  tokio::task::spawn_blocking(move || match kind {
    ArtifactKind::Pdf => counsel_docs::pdf::render_pdf(&title, &reply, Utc::now().date_naive()),
    ArtifactKind::Csv => counsel_docs::table::render_csv(&reply),
  })
  .await
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use async_trait::async_trait;
  use counsel_core::upstream::UpstreamError;
  use counsel_upstream::FsObjectStore;

  use super::*;

  struct FailingStore;

  #[async_trait]
  impl ObjectStore for FailingStore {
    async fn put(&self, _: &str, _: Bytes, _: &str) -> Result<String, UpstreamError> {
      Err(UpstreamError::Transport("connection refused".into()))
    }
  }

  #[tokio::test]
  async fn document_reply_gets_inline_pdf() {
    let generator = ArtifactGenerator::inline(ArtifactPolicy::default());
    let artifact = generator
      .generate(
        RequestType::Document,
        "Please draft a non-disclosure agreement",
        "session_1",
        "NON-DISCLOSURE AGREEMENT\n\n1. Parties",
      )
      .await
      .unwrap();

    assert_eq!(artifact.kind, ArtifactKind::Pdf);
    assert_eq!(artifact.title, "Legal Document - Please draft a non-disclosure ...");
    assert!(artifact.filename.starts_with("session_1_"));
    assert!(artifact.filename.ends_with(".pdf"));
    assert!(artifact.url.is_none());

    let bytes = B64.decode(artifact.content.unwrap()).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
  }

  #[tokio::test]
  async fn table_reply_gets_csv() {
    let generator = ArtifactGenerator::inline(ArtifactPolicy::default());
    let artifact = generator
      .generate(
        RequestType::Table,
        "create table of filing deadlines",
        "s",
        "| Filing | Deadline |\n| Answer | 21 days |",
      )
      .await
      .unwrap();

    assert_eq!(artifact.kind, ArtifactKind::Csv);
    let csv = String::from_utf8(B64.decode(artifact.content.unwrap()).unwrap()).unwrap();
    assert_eq!(csv.lines().collect::<Vec<_>>(), ["Filing,Deadline", "Answer,21 days"]);
  }

  #[tokio::test(flavor = "current_thread")]
  async fn rendering_yields_to_other_tasks() {
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    let ticker = tokio::spawn(async move {
      loop {
        counter.fetch_add(1, Ordering::Relaxed);
        tokio::task::yield_now().await;
      }
    });

    let reply = "1. The tenant shall pay rent on the first day of each month.\n".repeat(2000);
    let artifact = ArtifactGenerator::inline(ArtifactPolicy::default())
      .generate(RequestType::Document, "draft a lease", "s", &reply)
      .await;
    ticker.abort();

    assert!(artifact.is_some());
    assert!(ticks.load(Ordering::Relaxed) > 0);
  }

  #[tokio::test]
  async fn short_chat_reply_gets_nothing() {
    let generator = ArtifactGenerator::inline(ArtifactPolicy::default());
    assert!(generator.generate(RequestType::Chat, "hi", "s", "Hello.").await.is_none());
  }

  #[tokio::test]
  async fn upload_mode_stores_under_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsObjectStore::new(dir.path(), "http://localhost:5000/files"));
    let generator = ArtifactGenerator::uploading(ArtifactPolicy::default(), store);

    let artifact = generator
      .generate(RequestType::Table, "table of fees", "session_9", "a | b")
      .await
      .unwrap();

    assert!(artifact.content.is_none());
    let url = artifact.url.unwrap();
    assert_eq!(url, format!("http://localhost:5000/files/tables/{}", artifact.filename));
    assert!(dir.path().join("tables").join(&artifact.filename).exists());
  }

  #[tokio::test]
  async fn upload_failure_omits_artifact() {
    let generator = ArtifactGenerator::uploading(ArtifactPolicy::default(), Arc::new(FailingStore));
    assert!(
      generator
        .generate(RequestType::Document, "draft a will", "s", "LAST WILL")
        .await
        .is_none()
    );
  }
}
