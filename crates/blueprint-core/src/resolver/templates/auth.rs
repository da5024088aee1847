//! `src/middleware/auth.js`, bearer token guard backed by `API_TOKEN`
//!
//! Uses only node's `crypto`, so the manifest needs no new dependency.
//! `src/app.js` picks the guard up when this file is present.

use crate::error::Result;
use crate::resolver::ResolveContext;
use crate::tree::{FileTree, GeneratedFile};

pub(super) const PATH: &str = "src/middleware/auth.js";

const BODY: &str = r#"'use strict';

const crypto = require('crypto');

function digest(value) {
  return crypto.createHash('sha256').update(String(value)).digest();
}

function requireToken(req, res, next) {
  const expected = process.env.API_TOKEN;
  if (!expected) {
    return res.status(500).json({ error: 'API_TOKEN is not configured' });
  }

  const header = req.get('authorization') || '';
  const [scheme, token] = header.split(' ');
  if (scheme !== 'Bearer' || !token) {
    return res.status(401).json({ error: 'Missing bearer token' });
  }

  if (!crypto.timingSafeEqual(digest(token), digest(expected))) {
    return res.status(401).json({ error: 'Invalid token' });
  }

  next();
}

module.exports = { requireToken };
"#;

pub(super) fn render(ctx: &ResolveContext<'_>) -> Result<FileTree> {
    let mut tree = FileTree::new();
    tree.insert(GeneratedFile::source(
        PATH,
        format!("{}{}", ctx.source_header(), BODY),
    ))?;
    Ok(tree)
}
