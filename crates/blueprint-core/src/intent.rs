//! Intent - the normalized description of what to build
//!
//! An [`Intent`] is only ever produced by the normalizer. Every name in it is
//! already case-normalized (entities PascalCase, fields camelCase, project type
//! kebab-case), which is what lets the resolver derive identifiers and paths
//! without re-checking casing.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::naming;

/// Supported database engines. There is exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseEngine {
    Mongodb,
}

impl DatabaseEngine {
    /// Parse an engine tag, accepting common spellings
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "mongodb" | "mongo" => Some(Self::Mongodb),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mongodb => "mongodb",
        }
    }
}

/// Optional capability flags. Each one owns its own template set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Auth,
    Docker,
    Readme,
    Server,
}

impl Feature {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "server" | "app" | "entrypoint" => Some(Self::Server),
            "auth" | "authentication" => Some(Self::Auth),
            "docker" | "dockerfile" => Some(Self::Docker),
            "readme" | "docs" => Some(Self::Readme),
            _ => None,
        }
    }

    /// Flags that only make sense with an entry point: the Dockerfile runs
    /// `src/app.js` and the auth guard is mounted from it.
    pub fn implies(&self) -> Option<Feature> {
        match self {
            Self::Auth | Self::Docker => Some(Self::Server),
            Self::Readme | Self::Server => None,
        }
    }
}

/// Field storage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    ObjectId,
    Array,
    Mixed,
}

impl FieldType {
    /// Map a provider-supplied type name. Unknown names become `Mixed`.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "" | "string" | "str" | "text" | "email" | "url" | "uuid" => Self::String,
            "number" | "int" | "integer" | "float" | "double" | "decimal" | "bigint" => {
                Self::Number
            }
            "boolean" | "bool" => Self::Boolean,
            "date" | "datetime" | "timestamp" | "time" => Self::Date,
            "objectid" | "id" | "ref" | "reference" => Self::ObjectId,
            "array" | "list" => Self::Array,
            _ => Self::Mixed,
        }
    }
}

/// A scalar attribute of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub constraints: Vec<String>,
}

impl Field {
    pub fn has_constraint(&self, constraint: &str) -> bool {
        self.constraints.iter().any(|c| c == constraint)
    }
}

/// Cardinality of a relation, seen from the owning entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    pub fn parse(tag: &str) -> Option<Self> {
        let key: String = naming::split_words(tag).concat();
        match key.as_str() {
            "onetoone" | "hasone" | "one" => Some(Self::OneToOne),
            "manytoone" | "belongsto" | "references" | "ref" => Some(Self::ManyToOne),
            "onetomany" | "hasmany" | "many" => Some(Self::OneToMany),
            "manytomany" | "belongstomany" => Some(Self::ManyToMany),
            _ => None,
        }
    }

    /// Whether the owning side holds a list of references
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::OneToMany | Self::ManyToMany)
    }
}

/// A reference from one entity to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub target: String,
    pub kind: RelationKind,
}

impl Relation {
    /// Property name the relation occupies on the owning model
    pub fn property_name(&self) -> String {
        let base = naming::to_camel_case(&self.target);
        if self.kind.is_collection() {
            naming::pluralize(&base)
        } else {
            base
        }
    }
}

/// A domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
    pub relations: Vec<Relation>,
}

impl Entity {
    /// Lowercase key used for case-insensitive lookups
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }

    /// `BlogPost` -> `blog-post`, the stem of every file derived from this entity
    pub fn file_stem(&self) -> String {
        naming::to_kebab_case(&self.name)
    }

    /// `BlogPost` -> `blogPost`
    pub fn variable_name(&self) -> String {
        naming::to_camel_case(&self.name)
    }

    /// `BlogPost` -> `blog-posts`
    pub fn route_segment(&self) -> String {
        naming::pluralize(&self.file_stem())
    }
}

/// REST operation on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Every operation, in route declaration order
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Get,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "list" | "index" | "getall" | "findall" => Some(Self::List),
            "get" | "read" | "show" | "getone" | "findone" | "retrieve" => Some(Self::Get),
            "create" | "post" | "add" => Some(Self::Create),
            "update" | "put" | "patch" | "edit" => Some(Self::Update),
            "delete" | "remove" | "destroy" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Controller handler name
    pub fn handler(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "getById",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Desired REST surface for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    pub entity: String,
    pub operations: Vec<Operation>,
}

/// The normalized intent. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub(crate) project_type: String,
    pub(crate) entities: Vec<Entity>,
    pub(crate) database: DatabaseEngine,
    pub(crate) routes: Option<Vec<RouteSpec>>,
    pub(crate) features: Vec<Feature>,
    pub(crate) description: String,
}

impl Intent {
    pub fn project_type(&self) -> &str {
        &self.project_type
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn database(&self) -> DatabaseEngine {
        self.database
    }

    pub fn routes(&self) -> Option<&[RouteSpec]> {
        self.routes.as_deref()
    }

    /// Sorted, deduplicated feature flags
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Case-insensitive entity lookup
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        let key = name.to_lowercase();
        self.entities.iter().find(|e| e.key() == key)
    }

    /// Copy of this intent with a different feature set. Used to explore
    /// flag combinations; the flags are sorted and deduplicated but implied
    /// flags are not added.
    pub fn with_features(&self, features: impl IntoIterator<Item = Feature>) -> Self {
        let mut features: Vec<Feature> = features.into_iter().collect();
        features.sort();
        features.dedup();
        Self {
            features,
            ..self.clone()
        }
    }
}
