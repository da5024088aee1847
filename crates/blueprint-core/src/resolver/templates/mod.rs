//! Built-in template sets, one module per capability

mod auth;
mod controller;
mod database;
mod docker;
mod manifest;
mod model;
mod readme;
mod routes;
mod server;

use super::{Capability, TemplateRegistry};

pub(super) fn register_all(registry: &mut TemplateRegistry) {
    registry
        .register(Capability::Manifest, manifest::render)
        .register(Capability::Database, database::render)
        .register(Capability::Models, model::render)
        .register(Capability::Controllers, controller::render)
        .register(Capability::Routes, routes::render)
        .register(Capability::Server, server::render)
        .register(Capability::Auth, auth::render)
        .register(Capability::Docker, docker::render)
        .register(Capability::Readme, readme::render);
}

/// Single-quoted JavaScript string literal
pub(crate) fn js_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
