//! `README.md`

use crate::error::Result;
use crate::resolver::ResolveContext;
use crate::tree::{FileTree, GeneratedFile};

use super::routes::{base_path, method_and_path};

pub(super) fn render(ctx: &ResolveContext<'_>) -> Result<FileTree> {
    let intent = ctx.intent();
    let mut out = format!("# {}\n\n", intent.project_type());
    if !intent.description().is_empty() {
        out.push_str(intent.description());
        out.push_str("\n\n");
    }

    out.push_str("## Data model\n\n");
    for entity in intent.entities() {
        out.push_str(&format!("### {}\n\n", entity.name));
        if entity.fields.is_empty() && entity.relations.is_empty() {
            out.push_str("No declared fields.\n\n");
            continue;
        }
        out.push_str("| Field | Type | Constraints |\n| --- | --- | --- |\n");
        for field in &entity.fields {
            out.push_str(&format!(
                "| `{}` | {:?} | {} |\n",
                field.name,
                field.field_type,
                field.constraints.join(", ")
            ));
        }
        for relation in &entity.relations {
            let shape = if relation.kind.is_collection() {
                format!("[{}]", relation.target)
            } else {
                relation.target.clone()
            };
            out.push_str(&format!(
                "| `{}` | {} | {:?} |\n",
                relation.property_name(),
                shape,
                relation.kind
            ));
        }
        out.push('\n');
    }

    out.push_str("## Endpoints\n\n| Method | Path |\n| --- | --- |\n");
    for entity in intent.entities() {
        let base = base_path(entity);
        for op in ctx.operations_for(entity) {
            let (method, path) = method_and_path(op);
            let full = if path == "/" {
                base.clone()
            } else {
                format!("{}{}", base, path)
            };
            out.push_str(&format!("| {} | `{}` |\n", method.to_uppercase(), full));
        }
    }

    out.push_str(
        "\n## Configuration\n\n\
         | Variable | Purpose |\n| --- | --- |\n\
         | `MONGODB_URI` | MongoDB connection string |\n\
         | `PORT` | HTTP port |\n\
         | `API_TOKEN` | Bearer token, when `src/middleware/auth.js` is present |\n\n\
         Install dependencies with `npm install`.\n",
    );

    let mut tree = FileTree::new();
    tree.insert(GeneratedFile::config("README.md", out))?;
    Ok(tree)
}
