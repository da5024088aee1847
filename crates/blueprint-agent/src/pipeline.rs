//! Generation pipeline
//!
//! One request runs provider -> normalizer -> resolver -> materializer ->
//! archiver. The provider call is the only network suspension point and is
//! bounded by a timeout. Materializing and archiving run together as one
//! blocking task that outlives a dropped request. The stages share nothing
//! across requests except the name namespaces.

use blueprint_core::{
    ArchiveManifest, Archiver, BlueprintError, FileTree, IntentNormalizer, Namespace,
    PackageArtifact, Project, ProjectMaterializer, TemplateResolver,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::PipelineError;
use crate::prompt::build_intent_prompt;
use crate::provider::{CompletionOptions, CompletionProvider};

/// URL prefix archives are served under
pub const DOWNLOAD_PREFIX: &str = "/downloads";

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub projects_root: PathBuf,
    pub archives_root: PathBuf,
    pub options: CompletionOptions,
    pub provider_timeout: Duration,
}

/// Inbound generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub description: String,
    #[serde(default)]
    pub project_name: Option<String>,
}

impl GenerationRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            project_name: None,
        }
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }
}

/// What a successful request produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub project_name: String,
    /// Relative paths inside the project, in tree order
    pub files: Vec<String>,
    pub archive_name: String,
    pub download_locator: String,
    pub manifest: ArchiveManifest,
}

pub struct GenerationPipeline {
    provider: Arc<dyn CompletionProvider>,
    resolver: TemplateResolver,
    materializer: ProjectMaterializer,
    archiver: Archiver,
    options: CompletionOptions,
    provider_timeout: Duration,
}

impl GenerationPipeline {
    /// Pipeline with its own, empty namespaces
    pub fn new(provider: Arc<dyn CompletionProvider>, config: PipelineConfig) -> Self {
        Self::with_namespaces(
            provider,
            config,
            Arc::new(Namespace::new()),
            Arc::new(Namespace::new()),
        )
    }

    /// Pipeline sharing the given project and archive namespaces
    pub fn with_namespaces(
        provider: Arc<dyn CompletionProvider>,
        config: PipelineConfig,
        projects: Arc<Namespace>,
        archives: Arc<Namespace>,
    ) -> Self {
        Self {
            provider,
            resolver: TemplateResolver::default(),
            materializer: ProjectMaterializer::new(config.projects_root, projects),
            archiver: Archiver::new(config.archives_root, archives),
            options: config.options,
            provider_timeout: config.provider_timeout,
        }
    }

    pub fn with_resolver(mut self, resolver: TemplateResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn archives_root(&self) -> &std::path::Path {
        self.archiver.archives_root()
    }

    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutcome, PipelineError> {
        let description = request.description.trim();
        if description.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "description must not be empty".to_string(),
            ));
        }

        let started = Instant::now();
        let raw = self.complete(description).await?;

        let intent = IntentNormalizer::new()
            .with_description(description)
            .normalize(&raw)?;
        let tree = self.resolver.resolve(&intent)?;

        // Detached from this future: if the caller goes away the blocking
        // task still finishes with an archive or with the project removed.
        let (project, artifact) = {
            let materializer = self.materializer.clone();
            let archiver = self.archiver.clone();
            let requested = request.project_name.clone();
            let project_type = intent.project_type().to_string();
            tokio::task::spawn_blocking(move || {
                package(&materializer, &archiver, &tree, requested.as_deref(), &project_type)
            })
            .await??
        };

        tracing::info!(
            project = %project.name,
            archive = %artifact.archive_name,
            files = project.files.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "project generated"
        );

        Ok(GenerationOutcome {
            download_locator: format!("{}/{}", DOWNLOAD_PREFIX, artifact.archive_name),
            project_name: project.name,
            files: project.files,
            archive_name: artifact.archive_name,
            manifest: artifact.manifest,
        })
    }

    async fn complete(&self, description: &str) -> Result<String, PipelineError> {
        let prompt = build_intent_prompt(description);
        let provider = self.provider.name().to_string();

        let call = self.provider.complete(&prompt, &self.options);
        match tokio::time::timeout(self.provider_timeout, call).await {
            Ok(Ok(raw)) => Ok(raw),
            Ok(Err(e)) => {
                tracing::warn!(%provider, error = %format!("{:#}", e), "provider call failed");
                Err(PipelineError::ProviderUnavailable {
                    provider,
                    reason: format!("{:#}", e),
                })
            }
            Err(_) => {
                tracing::warn!(
                    %provider,
                    timeout_ms = self.provider_timeout.as_millis() as u64,
                    "provider call timed out"
                );
                Err(PipelineError::ProviderTimeout {
                    provider,
                    timeout: self.provider_timeout,
                })
            }
        }
    }
}

/// Materialize then archive, removing the project if archiving fails
fn package(
    materializer: &ProjectMaterializer,
    archiver: &Archiver,
    tree: &FileTree,
    requested: Option<&str>,
    project_type: &str,
) -> Result<(Project, PackageArtifact), BlueprintError> {
    let project = materializer.materialize(tree, requested, project_type)?;
    match archiver.archive(&project) {
        Ok(artifact) => Ok((project, artifact)),
        Err(e) => {
            tracing::warn!(
                project = %project.name,
                error = %e,
                "archiving failed, removing project"
            );
            materializer.discard(&project.name, &project.root_directory);
            Err(e)
        }
    }
}

impl fmt::Debug for GenerationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationPipeline")
            .field("provider", &self.provider.name())
            .field("resolver", &self.resolver)
            .field("materializer", &self.materializer)
            .field("archiver", &self.archiver)
            .field("options", &self.options)
            .field("provider_timeout", &self.provider_timeout)
            .finish()
    }
}
