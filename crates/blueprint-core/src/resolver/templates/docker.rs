//! `Dockerfile` and `.dockerignore`

use crate::error::Result;
use crate::resolver::ResolveContext;
use crate::tree::{FileTree, GeneratedFile};

const DOCKERFILE: &str = r#"FROM node:20-alpine

WORKDIR /app
ENV NODE_ENV=production

COPY package.json ./
RUN npm install --omit=dev

COPY src ./src

EXPOSE 3000
CMD ["node", "src/app.js"]
"#;

const DOCKERIGNORE: &str = "node_modules\nnpm-debug.log\n.env\n.git\n";

pub(super) fn render(_ctx: &ResolveContext<'_>) -> Result<FileTree> {
    let mut tree = FileTree::new();
    tree.insert(GeneratedFile::config("Dockerfile", DOCKERFILE))?;
    tree.insert(GeneratedFile::config(".dockerignore", DOCKERIGNORE))?;
    Ok(tree)
}
