//! Template Resolver - validated [`Intent`] to [`FileTree`]
//!
//! Resolution runs per concern, not per entity. A [`TemplateRegistry`] maps
//! each [`Capability`] to a pure template function; the resolver runs every
//! capability that is active for the intent and merges the partial trees.
//! Shared files (the database connector, the project manifest) are therefore
//! emitted once regardless of entity count, and a new capability is a new
//! registry entry rather than a branch inside an existing template.
//!
//! Cross-file references (route -> controller -> model -> related models) go
//! through an [`EntityIndex`] built once per resolution, so a reference can
//! only ever point at a file the same resolution emits.

mod templates;

use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::error::{MalformedIntentError, Result};
use crate::intent::{Entity, Feature, Intent, Operation};
use crate::tree::FileTree;

/// First line of the timestamped header block in generated sources
pub const GENERATED_BEGIN: &str = "// @generated-begin";

/// Last line of the timestamped header block in generated sources
pub const GENERATED_END: &str = "// @generated-end";

/// A concern the resolver knows how to emit files for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Manifest,
    Database,
    Models,
    Controllers,
    Routes,
    Server,
    Auth,
    Docker,
    Readme,
}

impl Capability {
    /// Feature flag gating this capability; `None` means always on
    pub fn feature(&self) -> Option<Feature> {
        match self {
            Self::Manifest | Self::Database | Self::Models | Self::Controllers | Self::Routes => {
                None
            }
            Self::Server => Some(Feature::Server),
            Self::Auth => Some(Feature::Auth),
            Self::Docker => Some(Feature::Docker),
            Self::Readme => Some(Feature::Readme),
        }
    }

    pub fn is_active(&self, intent: &Intent) -> bool {
        self.feature().map_or(true, |f| intent.has_feature(f))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A pure template set: everything one capability contributes
pub type TemplateFn = fn(&ResolveContext<'_>) -> Result<FileTree>;

/// Registry of template sets keyed by capability
#[derive(Clone)]
pub struct TemplateRegistry {
    sets: BTreeMap<Capability, TemplateFn>,
}

impl TemplateRegistry {
    /// Registry with no template sets
    pub fn empty() -> Self {
        Self {
            sets: BTreeMap::new(),
        }
    }

    /// Registry with every built-in template set
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        templates::register_all(&mut registry);
        registry
    }

    /// Register (or replace) the template set for a capability
    pub fn register(&mut self, capability: Capability, template: TemplateFn) -> &mut Self {
        self.sets.insert(capability, template);
        self
    }

    pub fn capabilities(&self) -> impl Iterator<Item = Capability> + '_ {
        self.sets.keys().copied()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("capabilities", &self.sets.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Paths every entity resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPaths {
    pub model: String,
    pub controller: String,
    pub routes: String,
}

/// Lookup from entity to the files derived from it
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    entries: BTreeMap<String, EntityPaths>,
}

impl EntityIndex {
    fn build(intent: &Intent) -> Self {
        let entries = intent
            .entities()
            .iter()
            .map(|entity| (entity.key(), Self::paths_for(entity)))
            .collect();
        Self { entries }
    }

    fn paths_for(entity: &Entity) -> EntityPaths {
        let stem = entity.file_stem();
        EntityPaths {
            model: format!("src/models/{}.model.js", stem),
            controller: format!("src/controllers/{}.controller.js", stem),
            routes: format!("src/routes/{}.routes.js", stem),
        }
    }

    /// Case-insensitive lookup
    pub fn get(&self, entity: &str) -> Option<&EntityPaths> {
        self.entries.get(&entity.to_lowercase())
    }

    /// Paths for an entity that must exist. Resolution validates references
    /// before any template runs, so a miss here is reported as dangling.
    pub fn require(&self, from: &str, entity: &str) -> Result<&EntityPaths> {
        self.get(entity).ok_or_else(|| {
            MalformedIntentError::DanglingRelation {
                entity: from.to_string(),
                target: entity.to_string(),
            }
            .into()
        })
    }
}

/// Everything a template function can see
#[derive(Debug)]
pub struct ResolveContext<'a> {
    intent: &'a Intent,
    index: EntityIndex,
    generated_at: DateTime<Utc>,
}

impl<'a> ResolveContext<'a> {
    pub fn intent(&self) -> &'a Intent {
        self.intent
    }

    pub fn index(&self) -> &EntityIndex {
        &self.index
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    /// REST surface for an entity; the full CRUD set unless the intent narrows it
    pub fn operations_for(&self, entity: &Entity) -> Vec<Operation> {
        self.intent
            .routes()
            .and_then(|routes| routes.iter().find(|r| r.entity.eq_ignore_ascii_case(&entity.name)))
            .map(|r| r.operations.clone())
            .unwrap_or_else(|| Operation::ALL.to_vec())
    }

    /// Timestamped header for generated JavaScript sources
    pub fn source_header(&self) -> String {
        format!(
            "{}\n// Generated by {} {} at {}. Regenerate instead of editing this block.\n{}\n",
            GENERATED_BEGIN,
            crate::NAME,
            crate::VERSION,
            self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            GENERATED_END
        )
    }
}

/// Resolves intents with a template registry
#[derive(Debug, Clone, Default)]
pub struct TemplateResolver {
    registry: TemplateRegistry,
}

impl TemplateResolver {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Resolve with the current time in generated headers
    pub fn resolve(&self, intent: &Intent) -> Result<FileTree> {
        self.resolve_at(intent, Utc::now())
    }

    /// Resolve with a fixed generation timestamp. Output is byte-deterministic
    /// for a given intent and timestamp.
    pub fn resolve_at(&self, intent: &Intent, generated_at: DateTime<Utc>) -> Result<FileTree> {
        validate_references(intent)?;

        let ctx = ResolveContext {
            intent,
            index: EntityIndex::build(intent),
            generated_at,
        };

        let mut tree = FileTree::new();
        for (capability, template) in &self.registry.sets {
            if !capability.is_active(intent) {
                continue;
            }
            let partial = template(&ctx)?;
            tracing::trace!(%capability, files = partial.len(), "template set resolved");
            tree.merge(partial)?;
        }

        tracing::debug!(
            project_type = intent.project_type(),
            entities = intent.entities().len(),
            files = tree.len(),
            "intent resolved"
        );
        Ok(tree)
    }
}

/// Resolve with the standard registry
pub fn resolve(intent: &Intent) -> Result<FileTree> {
    TemplateResolver::default().resolve(intent)
}

/// Remove every `@generated-begin` .. `@generated-end` block, leaving the
/// structural content for diffing.
pub fn strip_generated_regions(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut inside = false;
    for line in content.split_inclusive('\n') {
        let marker = line.trim_end();
        if !inside && marker == GENERATED_BEGIN {
            inside = true;
        } else if inside {
            if marker == GENERATED_END {
                inside = false;
            }
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Reject references to entities the intent does not declare, duplicate route
/// surfaces and relation properties that shadow declared fields.
fn validate_references(intent: &Intent) -> Result<()> {
    for entity in intent.entities() {
        let mut properties: HashSet<String> =
            entity.fields.iter().map(|f| f.name.clone()).collect();
        for relation in &entity.relations {
            if intent.entity(&relation.target).is_none() {
                return Err(MalformedIntentError::DanglingRelation {
                    entity: entity.name.clone(),
                    target: relation.target.clone(),
                }
                .into());
            }
            let property = relation.property_name();
            if !properties.insert(property.clone()) {
                return Err(MalformedIntentError::DuplicateField {
                    entity: entity.name.clone(),
                    field: property,
                }
                .into());
            }
        }
    }

    // Every entity gets a router; distinct names can still pluralize alike.
    let mut mounts: HashMap<String, &str> = HashMap::new();
    for entity in intent.entities() {
        let path = format!("/api/{}", entity.route_segment());
        if let Some(first) = mounts.insert(path.clone(), &entity.name) {
            return Err(MalformedIntentError::DuplicateBasePath {
                path,
                first: first.to_string(),
                second: entity.name.clone(),
            }
            .into());
        }
    }

    if let Some(routes) = intent.routes() {
        let mut seen = HashSet::new();
        for route in routes {
            let Some(entity) = intent.entity(&route.entity) else {
                return Err(MalformedIntentError::UnknownRouteEntity(route.entity.clone()).into());
            };
            if !seen.insert(entity.key()) {
                return Err(MalformedIntentError::DuplicateRoute(entity.name.clone()).into());
            }
        }
    }

    Ok(())
}

/// Module specifier for `require()` from one generated file to another,
/// e.g. `src/routes/book.routes.js` -> `src/controllers/book.controller.js`
/// gives `../controllers/book.controller`.
pub(crate) fn relative_module(from_file: &str, to_file: &str) -> String {
    let from_dir: Vec<&str> = match from_file.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let target = to_file.strip_suffix(".js").unwrap_or(to_file);
    let to_parts: Vec<&str> = target.split('/').collect();
    let (to_dir, to_name) = to_parts.split_at(to_parts.len() - 1);

    let common = from_dir
        .iter()
        .zip(to_dir.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat("..").take(from_dir.len() - common));
    parts.extend_from_slice(&to_dir[common..]);
    parts.extend_from_slice(to_name);

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}
