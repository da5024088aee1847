//! `src/app.js`, an Express entry point mounting every entity router
//!
//! The output never depends on other capabilities: the auth guard is loaded
//! at startup if its module was generated, and routers are mounted behind it.

use crate::error::Result;
use crate::resolver::{relative_module, ResolveContext};
use crate::tree::{FileTree, GeneratedFile};

use super::{auth, database, js_str};

const PATH: &str = "src/app.js";

pub(super) fn render(ctx: &ResolveContext<'_>) -> Result<FileTree> {
    let mut out = ctx.source_header();
    out.push_str("'use strict';\n\nconst express = require('express');\n");
    out.push_str(&format!(
        "const {{ connectDatabase }} = require({});\n",
        js_str(&relative_module(PATH, database::PATH))
    ));

    let mut routers = Vec::new();
    for entity in ctx.intent().entities() {
        let paths = ctx.index().require(&entity.name, &entity.name)?;
        let binding = format!("{}Routes", entity.variable_name());
        out.push_str(&format!(
            "const {} = require({});\n",
            binding,
            js_str(&relative_module(PATH, &paths.routes))
        ));
        routers.push(binding);
    }

    let guard = relative_module(PATH, auth::PATH);
    out.push_str(&format!(
        r#"
function loadGuards() {{
  try {{
    return [require({module}).requireToken];
  }} catch (err) {{
    if (err.code === 'MODULE_NOT_FOUND' && err.message.includes({module})) {{
      return [];
    }}
    throw err;
  }}
}}

const guards = loadGuards();
"#,
        module = js_str(&guard)
    ));

    out.push_str("\nconst app = express();\napp.use(express.json());\n\n");
    for binding in &routers {
        out.push_str(&format!(
            "app.use({b}.basePath, ...guards, {b}.router);\n",
            b = binding
        ));
    }

    out.push_str(
        r#"
app.get('/health', (req, res) => {
  res.json({ status: 'ok' });
});

app.use((err, req, res, next) => {
  const status = err.name === 'ValidationError' || err.name === 'CastError' ? 400 : 500;
  res.status(status).json({ error: err.message });
});

async function start(port = process.env.PORT || 3000) {
  await connectDatabase();
  return app.listen(port, () => {
    console.log(`listening on port ${port}`);
  });
}

if (require.main === module) {
  start().catch((err) => {
    console.error(err);
    process.exit(1);
  });
}

module.exports = { app, start };
"#,
    );

    let mut tree = FileTree::new();
    tree.insert(GeneratedFile::source(PATH, out))?;
    Ok(tree)
}
