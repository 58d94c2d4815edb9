//! CEL expression compilation and evaluation.

use anyhow::Result;
use ::cel::{Program, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::mapcss::Context;

/// A compiled CEL program ready for evaluation.
#[derive(Clone)]
pub struct CelProgram {
    program: Arc<Program>,
    source: String,
}

impl CelProgram {
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for CelProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CelProgram")
            .field("source", &self.source)
            .finish()
    }
}

/// Variables exposed to a program: the subject's `tags` and a `meta` map
/// describing the subject and, in link mode, the membership.
#[derive(Debug, Default)]
pub struct CelContext {
    pub tags: HashMap<String, String>,
    pub meta: HashMap<String, String>,
}

impl CelContext {
    pub fn from_context(ctx: &Context<'_>) -> Self {
        let mut tags = HashMap::new();
        let mut meta = HashMap::new();

        if let Some(subject) = ctx.subject() {
            tags.extend(
                subject
                    .tags()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            meta.insert("type".to_string(), subject.kind().label().to_string());
            meta.insert("id".to_string(), subject.id().to_string());
        }
        meta.insert("mode".to_string(), ctx.mode().to_string());

        if ctx.is_link() {
            if let Some(role) = ctx.member_role() {
                meta.insert("role".to_string(), role.to_string());
            }
            if let Some(index) = ctx.index() {
                meta.insert("index".to_string(), (index + 1).to_string());
            }
            if let Some(parent) = ctx.parent() {
                meta.insert("parent_id".to_string(), parent.id().to_string());
            }
        }

        Self { tags, meta }
    }
}

/// Compile a CEL expression string into a program.
pub fn compile_cel(source: &str) -> Result<CelProgram> {
    let program =
        Program::compile(source).map_err(|e| anyhow::anyhow!("CEL compile error: {}", e))?;

    Ok(CelProgram {
        program: Arc::new(program),
        source: source.to_string(),
    })
}

/// Evaluate a compiled CEL program with the given context.
pub fn evaluate_cel(program: &CelProgram, ctx: CelContext) -> Result<Value> {
    let mut cel_ctx = ::cel::Context::default();

    cel_ctx
        .add_variable("tags", ctx.tags)
        .map_err(|e| anyhow::anyhow!("CEL context error: {}", e))?;

    cel_ctx
        .add_variable("meta", ctx.meta)
        .map_err(|e| anyhow::anyhow!("CEL context error: {}", e))?;

    program
        .program
        .execute(&cel_ctx)
        .map_err(|e| anyhow::anyhow!("CEL execution error: {}", e))
}

/// Only a boolean `true` counts; null, strings, numbers and maps are false.
pub fn coerce_bool(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}
