//! `src/controllers/<entity>.controller.js`
//!
//! Handlers are emitted only for the operations in the entity's REST surface.

use crate::error::Result;
use crate::intent::{Entity, Operation};
use crate::resolver::{relative_module, ResolveContext};
use crate::tree::{FileTree, GeneratedFile};

use super::js_str;

pub(super) fn render(ctx: &ResolveContext<'_>) -> Result<FileTree> {
    let mut tree = FileTree::new();
    for entity in ctx.intent().entities() {
        let paths = ctx.index().require(&entity.name, &entity.name)?;
        let model_module = relative_module(&paths.controller, &paths.model);
        let content = render_controller(ctx, entity, &model_module);
        tree.insert(GeneratedFile::source(paths.controller.clone(), content))?;
    }
    Ok(tree)
}

fn render_controller(ctx: &ResolveContext<'_>, entity: &Entity, model_module: &str) -> String {
    let model = &entity.name;
    let operations = ctx.operations_for(entity);

    let mut out = ctx.source_header();
    out.push_str(&format!(
        "'use strict';\n\nconst {} = require({});\n",
        model,
        js_str(model_module)
    ));

    let populate = if entity.relations.is_empty() {
        String::new()
    } else {
        let paths: Vec<String> = entity
            .relations
            .iter()
            .map(|r| js_str(&r.property_name()))
            .collect();
        out.push_str(&format!("\nconst POPULATE = [{}];\n", paths.join(", ")));
        ".populate(POPULATE)".to_string()
    };

    let not_found = js_str(&format!("{} not found", model));
    for op in &operations {
        let body = match op {
            Operation::List => format!(
                "    const items = await {model}.find(){populate};\n    res.json(items);\n"
            ),
            Operation::Get => format!(
                "    const item = await {model}.findById(req.params.id){populate};\n\
                 {guard}    res.json(item);\n",
                guard = missing_guard(&not_found),
            ),
            Operation::Create => format!(
                "    const item = await {model}.create(req.body);\n    res.status(201).json(item);\n"
            ),
            Operation::Update => format!(
                "    const item = await {model}.findByIdAndUpdate(req.params.id, req.body, {{\n      \
                 new: true,\n      runValidators: true,\n    }}){populate};\n\
                 {guard}    res.json(item);\n",
                guard = missing_guard(&not_found),
            ),
            Operation::Delete => format!(
                "    const item = await {model}.findByIdAndDelete(req.params.id);\n\
                 {guard}    res.status(204).end();\n",
                guard = missing_guard(&not_found),
            ),
        };
        out.push_str(&format!(
            "\nasync function {}(req, res, next) {{\n  try {{\n{}  }} catch (err) {{\n    next(err);\n  }}\n}}\n",
            op.handler(),
            body
        ));
    }

    let handlers: Vec<&str> = operations.iter().map(Operation::handler).collect();
    out.push_str(&format!("\nmodule.exports = {{ {} }};\n", handlers.join(", ")));
    out
}

fn missing_guard(message: &str) -> String {
    format!(
        "    if (!item) {{\n      return res.status(404).json({{ error: {} }});\n    }}\n",
        message
    )
}
