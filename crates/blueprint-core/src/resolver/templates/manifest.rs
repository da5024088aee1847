//! `package.json`
//!
//! The manifest lists only what the always-on sources need, so toggling a
//! feature flag never changes it.

use serde_json::json;

use crate::error::Result;
use crate::resolver::ResolveContext;
use crate::tree::{FileTree, GeneratedFile};

const EXPRESS_VERSION: &str = "^4.19.2";
const MONGOOSE_VERSION: &str = "^8.4.0";

pub(super) fn render(ctx: &ResolveContext<'_>) -> Result<FileTree> {
    let intent = ctx.intent();
    let manifest = json!({
        "name": intent.project_type(),
        "version": "0.1.0",
        "private": true,
        "description": intent.description(),
        "license": "UNLICENSED",
        "engines": { "node": ">=18" },
        "dependencies": {
            "express": EXPRESS_VERSION,
            "mongoose": MONGOOSE_VERSION,
        },
    });

    let mut content = serde_json::to_string_pretty(&manifest)?;
    content.push('\n');

    let mut tree = FileTree::new();
    tree.insert(GeneratedFile::manifest("package.json", content))?;
    Ok(tree)
}
