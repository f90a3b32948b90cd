//! CEL expression engine with compiled program caching

use cel_interpreter::objects::Value as CelValue;
use cel_interpreter::{Context, Program};
use dashmap::DashMap;
use std::sync::Arc;

use crate::cel::{
    context::EvalContext,
    convert::json_to_cel,
    error::{CelError, Result},
};
use crate::rules::AccessQuery;

/// Compiles assertion expressions once and evaluates them per query
#[derive(Default)]
pub struct Engine {
    program_cache: DashMap<String, Arc<Program>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile an expression, reusing a previous compilation when available
    pub fn compile(&self, expr: &str) -> Result<Arc<Program>> {
        if let Some(program) = self.program_cache.get(expr) {
            return Ok(program.clone());
        }

        let program = Program::compile(expr)
            .map_err(|e| CelError::CompilationError(format!("{:?}", e)))?;

        let program = Arc::new(program);
        self.program_cache.insert(expr.to_string(), program.clone());
        Ok(program)
    }

    /// Evaluate a compiled program; the result must be a boolean
    pub fn evaluate(
        &self,
        program: &Program,
        query: &AccessQuery<'_>,
        ctx: &EvalContext,
    ) -> Result<bool> {
        let mut cel_context = Context::default();
        for (key, value) in ctx.to_variables(query) {
            let _ = cel_context.add_variable(key, json_to_cel(&value));
        }

        let result = program
            .execute(&cel_context)
            .map_err(|e| CelError::EvaluationError(format!("{:?}", e)))?;

        match result {
            CelValue::Bool(b) => Ok(b),
            _ => Err(CelError::NonBooleanResult),
        }
    }

    /// Compile and evaluate in one call
    pub fn evaluate_expression(
        &self,
        expr: &str,
        query: &AccessQuery<'_>,
        ctx: &EvalContext,
    ) -> Result<bool> {
        let program = self.compile(expr)?;
        self.evaluate(&program, query, ctx)
    }

    /// Number of compiled programs held
    pub fn cached_programs(&self) -> usize {
        self.program_cache.len()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cached_programs", &self.program_cache.len())
            .finish()
    }
}
