//! `src/config/db.js`, the one shared connector

use crate::error::Result;
use crate::naming;
use crate::resolver::ResolveContext;
use crate::tree::{FileTree, GeneratedFile};

use super::js_str;

pub(crate) const PATH: &str = "src/config/db.js";

pub(super) fn render(ctx: &ResolveContext<'_>) -> Result<FileTree> {
    let db_name = naming::to_snake_case(ctx.intent().project_type());
    let default_uri = format!("mongodb://127.0.0.1:27017/{}", db_name);

    let content = format!(
        r#"{header}'use strict';

const mongoose = require('mongoose');

const DEFAULT_URI = {uri};

async function connectDatabase(uri = process.env.MONGODB_URI || DEFAULT_URI) {{
  mongoose.set('strictQuery', true);
  await mongoose.connect(uri);
  return mongoose.connection;
}}

async function disconnectDatabase() {{
  await mongoose.disconnect();
}}

module.exports = {{ connectDatabase, disconnectDatabase }};
"#,
        header = ctx.source_header(),
        uri = js_str(&default_uri),
    );

    let mut tree = FileTree::new();
    tree.insert(GeneratedFile::source(PATH, content))?;
    Ok(tree)
}
