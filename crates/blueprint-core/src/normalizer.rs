//! Intent Normalizer - provider output to validated [`Intent`]
//!
//! The provider is asked for JSON but nothing guarantees it complies: replies
//! come wrapped in prose, fenced in markdown, or with fields in the wrong
//! shape. Normalization is therefore a fixed sequence:
//!
//! 1. Locate the intent document. The whole reply is tried first, then fenced
//!    code blocks, then balanced `{...}` blocks in order of appearance. The
//!    first candidate that parses as a JSON object is the intent. At most
//!    [`MAX_CANDIDATES`] candidates are examined.
//! 2. Check the database engine against the supported set. An unsupported
//!    engine is reported even when the rest of the intent is broken too.
//! 3. Check required fields (`projectType`, non-empty `entities`).
//! 4. Repair the shapes we know how to repair and case-normalize every name.
//! 5. Check feature flags against the supported set.
//!
//! Nothing here touches the network or the disk.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::{MalformedIntentError, Result, UnsupportedFeatureError};
use crate::intent::{
    DatabaseEngine, Entity, Feature, Field, FieldType, Intent, Operation, Relation, RelationKind,
    RouteSpec,
};
use crate::naming;

/// Upper bound on candidate blocks examined during fallback extraction
pub const MAX_CANDIDATES: usize = 16;

/// Upper bound on opening braces tried by the balanced-block scanner
const MAX_SCAN_STARTS: usize = 4 * MAX_CANDIDATES;

/// Provider replies larger than this are rejected without parsing
pub const MAX_INPUT_BYTES: usize = 256 * 1024;

lazy_static! {
    static ref FENCED_BLOCK: Regex = Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n(.*?)```").unwrap();
}

/// Normalize provider output with no description override.
pub fn normalize(raw: &str) -> Result<Intent> {
    IntentNormalizer::new().normalize(raw)
}

/// Configurable normalizer
#[derive(Debug, Clone, Default)]
pub struct IntentNormalizer {
    description: Option<String>,
}

impl IntentNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carry the request's own description instead of whatever the provider
    /// echoed back.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Turn raw provider output into a validated intent
    pub fn normalize(&self, raw: &str) -> Result<Intent> {
        let document = extract_document(raw)?;
        let raw_intent: RawIntent = serde_json::from_value(Value::Object(document))
            .map_err(|e| MalformedIntentError::Unparseable(e.to_string()))?;

        let database = match raw_intent.database.as_deref().map(str::trim) {
            None | Some("") => DatabaseEngine::Mongodb,
            Some(tag) => DatabaseEngine::parse(tag)
                .ok_or_else(|| UnsupportedFeatureError::Database(tag.to_string()))?,
        };

        let project_type = raw_intent
            .project_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(MalformedIntentError::MissingField("projectType"))?;
        let project_type = naming::to_kebab_case(project_type);
        if project_type.is_empty() {
            return Err(MalformedIntentError::EmptyName("project type").into());
        }

        let raw_entities = raw_intent
            .entities
            .ok_or(MalformedIntentError::MissingField("entities"))?;
        if raw_entities.is_empty() {
            return Err(MalformedIntentError::NoEntities.into());
        }

        let entities = normalize_entities(raw_entities)?;
        let routes = raw_intent.routes.map(normalize_routes).transpose()?;

        let raw_features = raw_intent.features.unwrap_or_default();
        let mut features = Vec::with_capacity(raw_features.len());
        for tag in &raw_features {
            let feature = Feature::parse(tag)
                .ok_or_else(|| UnsupportedFeatureError::Feature(tag.trim().to_string()))?;
            features.push(feature);
            features.extend(feature.implies());
        }
        features.sort();
        features.dedup();

        let description = match &self.description {
            Some(description) => description.clone(),
            None => raw_intent.description.unwrap_or_default().trim().to_string(),
        };

        Ok(Intent {
            project_type,
            entities,
            database,
            routes,
            features,
            description,
        })
    }
}

// ============================================================================
// Extraction
// ============================================================================

fn extract_document(raw: &str) -> Result<Map<String, Value>> {
    if raw.len() > MAX_INPUT_BYTES {
        return Err(MalformedIntentError::TooLarge(raw.len()).into());
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MalformedIntentError::Unparseable("empty output".to_string()).into());
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(map);
    }

    for (examined, candidate) in candidate_blocks(trimmed).into_iter().enumerate() {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(candidate) {
            tracing::debug!(candidate = examined, "intent recovered by fallback extraction");
            return Ok(map);
        }
    }

    Err(MalformedIntentError::Unparseable("no JSON object found in output".to_string()).into())
}

/// Fenced blocks first, then top-level balanced objects, capped at
/// [`MAX_CANDIDATES`].
fn candidate_blocks(raw: &str) -> Vec<&str> {
    let mut candidates: Vec<&str> = FENCED_BLOCK
        .captures_iter(raw)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .take(MAX_CANDIDATES)
        .collect();

    let mut cursor = 0;
    let mut starts = 0;
    while candidates.len() < MAX_CANDIDATES && starts < MAX_SCAN_STARTS {
        let Some(offset) = raw[cursor..].find('{') else {
            break;
        };
        starts += 1;
        let start = cursor + offset;
        match balanced_object_end(raw, start) {
            Some(end) => {
                candidates.push(&raw[start..=end]);
                cursor = end + 1;
            }
            None => cursor = start + 1,
        }
    }

    candidates
}

/// Index of the `}` closing the object opened at `start`, skipping braces
/// inside string literals.
fn balanced_object_end(raw: &str, start: usize) -> Option<usize> {
    let bytes = raw.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

// ============================================================================
// Raw provider shapes
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIntent {
    #[serde(alias = "project_type")]
    project_type: Option<String>,
    entities: Option<Vec<RawEntity>>,
    database: Option<String>,
    routes: Option<Vec<RawRoute>>,
    features: Option<Vec<String>>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(alias = "entity", alias = "model")]
    name: Option<String>,
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default)]
    relations: Vec<RawRelation>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawField {
    Name(String),
    Spec(RawFieldSpec),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldSpec {
    name: String,
    #[serde(rename = "type", alias = "fieldType", alias = "field_type", default)]
    field_type: Option<String>,
    #[serde(default)]
    constraints: RawConstraints,
    required: Option<bool>,
    unique: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum RawConstraints {
    #[default]
    None,
    List(Vec<String>),
    Flags(Map<String, Value>),
}

impl RawConstraints {
    fn into_tags(self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::List(list) => list,
            Self::Flags(map) => map
                .into_iter()
                .filter_map(|(key, value)| match value {
                    Value::Bool(true) => Some(key),
                    Value::Number(n) => Some(format!("{}:{}", key, n)),
                    Value::String(s) => Some(format!("{}:{}", key, s)),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRelation {
    Target(String),
    Spec(RawRelationSpec),
}

#[derive(Debug, Deserialize)]
struct RawRelationSpec {
    #[serde(alias = "entity", alias = "model")]
    target: String,
    #[serde(alias = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRoute {
    #[serde(alias = "model", alias = "resource")]
    entity: String,
    #[serde(default, alias = "methods", alias = "actions")]
    operations: Vec<String>,
}

// ============================================================================
// Normalization
// ============================================================================

fn normalize_identifier(
    raw: &str,
    what: &'static str,
    convert: fn(&str) -> String,
) -> std::result::Result<String, MalformedIntentError> {
    let name = convert(raw.trim());
    match name.chars().next() {
        None => Err(MalformedIntentError::EmptyName(what)),
        Some(c) if !c.is_alphabetic() => {
            Err(MalformedIntentError::InvalidName(raw.trim().to_string()))
        }
        Some(_) => Ok(name),
    }
}

fn normalize_entities(raw: Vec<RawEntity>) -> Result<Vec<Entity>> {
    let mut seen = HashSet::new();
    let mut entities = Vec::with_capacity(raw.len());

    for raw_entity in raw {
        let name = normalize_identifier(
            raw_entity.name.as_deref().unwrap_or_default(),
            "entity",
            naming::to_pascal_case,
        )?;
        if !seen.insert(name.to_lowercase()) {
            return Err(MalformedIntentError::DuplicateEntity(name).into());
        }

        let fields = normalize_fields(&name, raw_entity.fields)?;

        let mut relations = Vec::with_capacity(raw_entity.relations.len());
        for raw_relation in raw_entity.relations {
            let (target, kind) = match raw_relation {
                RawRelation::Target(target) => (target, None),
                RawRelation::Spec(spec) => (spec.target, spec.kind),
            };
            let target = normalize_identifier(&target, "relation target", naming::to_pascal_case)?;
            let kind = match kind {
                None => RelationKind::ManyToOne,
                Some(tag) => RelationKind::parse(&tag)
                    .ok_or(MalformedIntentError::UnknownRelationKind(tag))?,
            };
            relations.push(Relation { target, kind });
        }

        entities.push(Entity {
            name,
            fields,
            relations,
        });
    }

    Ok(entities)
}

fn normalize_fields(entity: &str, raw: Vec<RawField>) -> Result<Vec<Field>> {
    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(raw.len());

    for raw_field in raw {
        let spec = match raw_field {
            RawField::Name(name) => RawFieldSpec {
                name,
                field_type: None,
                constraints: RawConstraints::None,
                required: None,
                unique: None,
            },
            RawField::Spec(spec) => spec,
        };

        let name = normalize_identifier(&spec.name, "field", naming::to_camel_case)?;
        if !seen.insert(name.clone()) {
            return Err(MalformedIntentError::DuplicateField {
                entity: entity.to_string(),
                field: name,
            }
            .into());
        }

        let mut tags = spec.constraints.into_tags();
        if spec.required == Some(true) {
            tags.push("required".to_string());
        }
        if spec.unique == Some(true) {
            tags.push("unique".to_string());
        }

        let mut constraints: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = normalize_constraint(&tag);
            if !tag.is_empty() && !constraints.contains(&tag) {
                constraints.push(tag);
            }
        }

        fields.push(Field {
            name,
            field_type: FieldType::parse(spec.field_type.as_deref().unwrap_or_default()),
            constraints,
        });
    }

    Ok(fields)
}

/// Lowercase the constraint key, keep any `:value` as given
fn normalize_constraint(tag: &str) -> String {
    match tag.trim().split_once(':') {
        Some((key, value)) => format!("{}:{}", key.trim().to_lowercase(), value.trim()),
        None => tag.trim().to_lowercase(),
    }
}

fn normalize_routes(raw: Vec<RawRoute>) -> Result<Vec<RouteSpec>> {
    let mut routes = Vec::with_capacity(raw.len());
    for raw_route in raw {
        let entity =
            normalize_identifier(&raw_route.entity, "route entity", naming::to_pascal_case)?;

        let mut operations = Vec::with_capacity(raw_route.operations.len());
        for tag in &raw_route.operations {
            let op = Operation::parse(tag)
                .ok_or_else(|| MalformedIntentError::UnknownOperation(tag.clone()))?;
            operations.push(op);
        }
        operations.sort();
        operations.dedup();
        if operations.is_empty() {
            operations = Operation::ALL.to_vec();
        }

        routes.push(RouteSpec { entity, operations });
    }
    Ok(routes)
}
