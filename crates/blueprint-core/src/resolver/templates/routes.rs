//! `src/routes/<entity>.routes.js`

use crate::error::Result;
use crate::intent::{Entity, Operation};
use crate::resolver::{relative_module, ResolveContext};
use crate::tree::{FileTree, GeneratedFile};

use super::js_str;

/// Mount point of an entity's router, e.g. `/api/blog-posts`
pub(crate) fn base_path(entity: &Entity) -> String {
    format!("/api/{}", entity.route_segment())
}

pub(crate) fn method_and_path(op: Operation) -> (&'static str, &'static str) {
    match op {
        Operation::List => ("get", "/"),
        Operation::Get => ("get", "/:id"),
        Operation::Create => ("post", "/"),
        Operation::Update => ("put", "/:id"),
        Operation::Delete => ("delete", "/:id"),
    }
}

pub(super) fn render(ctx: &ResolveContext<'_>) -> Result<FileTree> {
    let mut tree = FileTree::new();
    for entity in ctx.intent().entities() {
        let paths = ctx.index().require(&entity.name, &entity.name)?;
        let controller = relative_module(&paths.routes, &paths.controller);

        let mut out = ctx.source_header();
        out.push_str(&format!(
            "'use strict';\n\nconst express = require('express');\nconst controller = require({});\n\nconst router = express.Router();\n\n",
            js_str(&controller)
        ));
        for op in ctx.operations_for(entity) {
            let (method, path) = method_and_path(op);
            out.push_str(&format!(
                "router.{}({}, controller.{});\n",
                method,
                js_str(path),
                op.handler()
            ));
        }
        out.push_str(&format!(
            "\nmodule.exports = {{ basePath: {}, router }};\n",
            js_str(&base_path(entity))
        ));

        tree.insert(GeneratedFile::source(paths.routes.clone(), out))?;
    }
    Ok(tree)
}
