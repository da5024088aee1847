//! `src/models/<entity>.model.js`, one Mongoose schema per entity

use crate::error::Result;
use crate::intent::{Entity, Field, FieldType, Relation};
use crate::resolver::{relative_module, ResolveContext};
use crate::tree::{FileTree, GeneratedFile};

use super::js_str;

pub(super) fn render(ctx: &ResolveContext<'_>) -> Result<FileTree> {
    let mut tree = FileTree::new();
    for entity in ctx.intent().entities() {
        let path = &ctx.index().require(&entity.name, &entity.name)?.model;
        let content = render_model(ctx, entity, path)?;
        tree.insert(GeneratedFile::source(path.clone(), content))?;
    }
    Ok(tree)
}

fn render_model(ctx: &ResolveContext<'_>, entity: &Entity, path: &str) -> Result<String> {
    let mut out = ctx.source_header();
    out.push_str("'use strict';\n\nconst mongoose = require('mongoose');\n");

    // Related models are registered before this schema refers to them.
    let mut required = Vec::new();
    for relation in &entity.relations {
        if relation.target == entity.name {
            continue;
        }
        let target = &ctx.index().require(&entity.name, &relation.target)?.model;
        let module = relative_module(path, target);
        if !required.contains(&module) {
            required.push(module);
        }
    }
    for module in &required {
        out.push_str(&format!("require({});\n", js_str(module)));
    }

    let schema = format!("{}Schema", entity.variable_name());
    out.push_str(&format!("\nconst {} = new mongoose.Schema(\n  {{\n", schema));
    for field in &entity.fields {
        out.push_str(&format!("    {}: {},\n", field.name, field_definition(field)));
    }
    for relation in &entity.relations {
        out.push_str(&format!(
            "    {}: {},\n",
            relation.property_name(),
            relation_definition(relation)
        ));
    }
    out.push_str("  },\n  { timestamps: true }\n);\n\n");

    out.push_str(&format!(
        "module.exports = mongoose.models.{name} || mongoose.model({quoted}, {schema});\n",
        name = entity.name,
        quoted = js_str(&entity.name),
        schema = schema,
    ));
    Ok(out)
}

fn schema_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "String",
        FieldType::Number => "Number",
        FieldType::Boolean => "Boolean",
        FieldType::Date => "Date",
        FieldType::ObjectId => "mongoose.Schema.Types.ObjectId",
        FieldType::Array => "Array",
        FieldType::Mixed => "mongoose.Schema.Types.Mixed",
    }
}

fn field_definition(field: &Field) -> String {
    let mut options = vec![format!("type: {}", schema_type(field.field_type))];
    options.extend(field.constraints.iter().filter_map(|c| constraint_option(c)));
    format!("{{ {} }}", options.join(", "))
}

fn relation_definition(relation: &Relation) -> String {
    let reference = format!(
        "{{ type: mongoose.Schema.Types.ObjectId, ref: {} }}",
        js_str(&relation.target)
    );
    if relation.kind.is_collection() {
        format!("[{}]", reference)
    } else {
        reference
    }
}

/// Schema option for a normalized constraint tag. Tags Mongoose has no
/// equivalent for are dropped.
fn constraint_option(tag: &str) -> Option<String> {
    let (key, value) = match tag.split_once(':') {
        Some((key, value)) => (key, Some(value)),
        None => (tag, None),
    };

    match (key, value) {
        ("required" | "unique" | "index" | "sparse" | "trim" | "lowercase" | "uppercase", None) => {
            Some(format!("{}: true", key))
        }
        ("min" | "max", Some(v)) => numeric(v).map(|n| format!("{}: {}", key, n)),
        ("minlength", Some(v)) => integer(v).map(|n| format!("minLength: {}", n)),
        ("maxlength", Some(v)) => integer(v).map(|n| format!("maxLength: {}", n)),
        ("default", Some(v)) => Some(format!("default: {}", literal(v))),
        ("enum", Some(v)) => {
            let values: Vec<String> = v
                .split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(js_str)
                .collect();
            (!values.is_empty()).then(|| format!("enum: [{}]", values.join(", ")))
        }
        _ => {
            tracing::trace!(constraint = tag, "constraint has no schema option");
            None
        }
    }
}

fn numeric(value: &str) -> Option<String> {
    value
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|_| value.to_string())
}

fn integer(value: &str) -> Option<u64> {
    value.parse().ok()
}

fn literal(value: &str) -> String {
    match value {
        "true" | "false" | "null" => value.to_string(),
        v if numeric(v).is_some() => v.to_string(),
        v => js_str(v),
    }
}
