//! Integration Test: Generation Pipeline
//!
//! Drives the pipeline with scripted providers against temporary output roots.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blueprint_agent::{
    CompletionOptions, CompletionProvider, GenerationPipeline, GenerationRequest, PipelineConfig,
    PipelineError,
};
use blueprint_core::{BlueprintError, ErrorClass, MalformedIntentError, UnsupportedFeatureError};
use tempfile::TempDir;

const BOOK_REPLY: &str = r#"Sure, here is the intent:
```json
{"projectType": "api", "database": "mongodb",
 "entities": [{"name": "Book", "fields": [{"name": "title", "type": "string"}, {"name": "author", "type": "string"}]}]}
```"#;

/// Mock provider replaying a fixed answer
struct ScriptedProvider {
    reply: Result<String, String>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(reason.to_string()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(BOOK_REPLY.to_string()),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(prompt.contains("Project description"));
        assert_eq!(options.model, "test-model");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map_err(|reason| anyhow::anyhow!(reason))
    }
}

fn config(dir: &TempDir, timeout: Duration) -> PipelineConfig {
    PipelineConfig {
        projects_root: dir.path().join("projects"),
        archives_root: dir.path().join("archives"),
        options: CompletionOptions::new("test-model"),
        provider_timeout: timeout,
    }
}

fn pipeline(dir: &TempDir, provider: Arc<ScriptedProvider>) -> GenerationPipeline {
    GenerationPipeline::new(provider, config(dir, Duration::from_secs(5)))
}

fn entry_count(path: &Path) -> usize {
    std::fs::read_dir(path).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_book_request_end_to_end() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir, ScriptedProvider::replying(BOOK_REPLY));

    let outcome = pipeline
        .generate(GenerationRequest::new("A simple book API").with_project_name("books"))
        .await
        .unwrap();

    assert_eq!(outcome.project_name, "books");
    assert_eq!(outcome.files.len(), 5);
    assert_eq!(outcome.archive_name, "books.tar.gz");
    assert_eq!(outcome.download_locator, "/downloads/books.tar.gz");
    assert!(dir.path().join("archives/books.tar.gz").is_file());
    assert_eq!(outcome.manifest.files.len(), 5);

    let package: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("projects/books/package.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(package["description"], "A simple book API");
}

#[tokio::test]
async fn test_empty_description_never_reaches_provider() {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::replying(BOOK_REPLY);
    let pipeline = pipeline(&dir, Arc::clone(&provider));

    let err = pipeline.generate(GenerationRequest::new("   ")).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidRequest(_)));
    assert_eq!(err.class(), ErrorClass::Client);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_provider_timeout_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let pipeline = GenerationPipeline::new(
        ScriptedProvider::slow(Duration::from_secs(5)),
        config(&dir, Duration::from_millis(50)),
    );

    let err = pipeline.generate(GenerationRequest::new("A book API")).await.unwrap_err();
    assert!(matches!(err, PipelineError::ProviderTimeout { .. }));
    assert!(err.is_retryable());
    assert_eq!(entry_count(&dir.path().join("projects")), 0);
}

#[tokio::test]
async fn test_provider_failure_is_retryable() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir, ScriptedProvider::failing("503 Service Unavailable"));

    let err = pipeline.generate(GenerationRequest::new("A book API")).await.unwrap_err();
    match &err {
        PipelineError::ProviderUnavailable { provider, reason } => {
            assert_eq!(provider, "scripted");
            assert!(reason.contains("503"));
        }
        other => panic!("expected provider unavailable, got {:?}", other),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unsupported_database_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(
        &dir,
        ScriptedProvider::replying(&BOOK_REPLY.replace("mongodb", "postgres")),
    );

    let err = pipeline.generate(GenerationRequest::new("A book API")).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Core(BlueprintError::UnsupportedFeature(UnsupportedFeatureError::Database(_)))
    ));
    assert_eq!(err.class(), ErrorClass::Client);
    assert_eq!(entry_count(&dir.path().join("projects")), 0);
    assert_eq!(entry_count(&dir.path().join("archives")), 0);
}

#[tokio::test]
async fn test_prose_only_reply_is_malformed() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir, ScriptedProvider::replying("I cannot help with that."));

    let err = pipeline.generate(GenerationRequest::new("A book API")).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Core(BlueprintError::MalformedIntent(MalformedIntentError::Unparseable(_)))
    ));
}

#[tokio::test]
async fn test_concurrent_requests_with_same_name() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir, ScriptedProvider::replying(BOOK_REPLY));

    let (first, second) = tokio::join!(
        pipeline.generate(GenerationRequest::new("A book API").with_project_name("shared")),
        pipeline.generate(GenerationRequest::new("A book API").with_project_name("shared")),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first.project_name, second.project_name);
    assert_ne!(first.archive_name, second.archive_name);
    let mut names = vec![first.project_name, second.project_name];
    names.sort();
    assert_eq!(names, vec!["shared", "shared-2"]);
}

#[tokio::test]
async fn test_archive_failure_rolls_back_project() {
    let dir = TempDir::new().unwrap();
    // A regular file where the archives directory should be.
    std::fs::write(dir.path().join("archives"), b"not a directory").unwrap();
    let pipeline = pipeline(&dir, ScriptedProvider::replying(BOOK_REPLY));

    let err = pipeline
        .generate(GenerationRequest::new("A book API").with_project_name("doomed"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Core(BlueprintError::Storage { .. })));
    assert!(!dir.path().join("projects/doomed").exists());

    // The released name is usable again once the archive root is fixed.
    std::fs::remove_file(dir.path().join("archives")).unwrap();
    let outcome = pipeline
        .generate(GenerationRequest::new("A book API").with_project_name("doomed"))
        .await
        .unwrap();
    assert_eq!(outcome.project_name, "doomed");
}

/// Intent with enough entities that packaging takes a noticeable while
fn wide_reply(entities: usize) -> String {
    let entities: Vec<_> = (0..entities)
        .map(|i| {
            let suffix: String = [b'a' + (i / 26) as u8, b'a' + (i % 26) as u8]
                .iter()
                .map(|&b| b as char)
                .collect();
            serde_json::json!({"name": format!("Item{}", suffix), "fields": ["label"]})
        })
        .collect();
    serde_json::json!({"projectType": "api", "database": "mongodb", "entities": entities})
        .to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_request_still_finishes_packaging() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&dir, ScriptedProvider::replying(&wide_reply(300)));
    let project_dir = dir.path().join("projects/dropped");
    let archive = dir.path().join("archives/dropped.tar.gz");

    let watch = async {
        while !project_dir.exists() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    };
    tokio::select! {
        _ = pipeline.generate(GenerationRequest::new("A wide API").with_project_name("dropped")) => {}
        _ = watch => {}
    }

    // The caller is gone; packaging must still end in a readable archive.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
    loop {
        if blueprint_core::read_manifest(&archive).is_ok() {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "project left without an archive"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let manifest = blueprint_core::read_manifest(&archive).unwrap();
    assert_eq!(manifest.project, "dropped");
    assert_eq!(manifest.files.len(), 300 * 3 + 2);
    assert!(project_dir.is_dir());
}
