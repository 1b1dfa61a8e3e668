use rhai::{AST, Array, Dynamic, Engine, Scope};
use tm_timing::{Duration, Instant};
use tracing::warn;

use crate::error::DecodeError;

/// Soft deadline for one `parse()` invocation. Exceeding it logs a warning,
/// but the call is never cancelled mid-expression: `rhai` has no safe
/// preemption point, matching the "does not cancel" wording of the
/// contract this implements.
const SOFT_DEADLINE: Duration = Duration::from_millis(20);

const MAX_OPERATIONS: u64 = 2_000_000;
const MAX_CALL_LEVELS: usize = 32;
const MAX_EXPR_DEPTH: usize = 64;

/// A sandboxed evaluator exposing one callable: `parse(payload) ->
/// array-of-strings`. No filesystem, network, or process access is
/// registered with the engine, so none is reachable from script code.
pub struct ScriptHost {
    engine: Engine,
    ast: AST,
}

impl ScriptHost {
    /// Compiles `source` once. Compilation errors surface here, at connect
    /// time, not per frame.
    pub fn compile(source: &str) -> Result<Self, DecodeError> {
        let mut engine = Engine::new();
        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_call_levels(MAX_CALL_LEVELS);
        engine.set_max_expr_depths(MAX_EXPR_DEPTH, MAX_EXPR_DEPTH);
        engine.disable_symbol("eval");

        let ast = engine.compile(source).map_err(|e| DecodeError::ScriptCompile(e.to_string()))?;
        if !ast.iter_functions().any(|f| f.name == "parse" && f.params.len() == 1) {
            return Err(DecodeError::ScriptCompile(
                "script must define a single-argument function named `parse`".to_string(),
            ));
        }
        Ok(Self { engine, ast })
    }

    /// Invokes `parse(payload)`. Runtime errors are caught and reported as
    /// this frame failing to decode; they never unwind past this call.
    pub fn parse(&self, payload: &str) -> Result<Vec<String>, DecodeError> {
        let mut scope = Scope::new();
        let start = Instant::now();
        let result: Result<Dynamic, _> =
            self.engine.call_fn(&mut scope, &self.ast, "parse", (payload.to_string(),));
        let elapsed = start.elapsed();
        if elapsed > SOFT_DEADLINE {
            warn!(?elapsed, "decoder script exceeded the soft 20ms deadline");
        }

        let value = result.map_err(|e| DecodeError::ScriptRuntime(e.to_string()))?;
        let array: Array = value.try_cast().ok_or(DecodeError::ScriptReturnType)?;
        array
            .into_iter()
            .map(|v| v.try_cast::<String>().ok_or(DecodeError::ScriptReturnType))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_and_runs_a_simple_script() {
        let host = ScriptHost::compile(
            r#"
            fn parse(payload) {
                payload.split(",")
            }
            "#,
        )
        .unwrap();
        let out = host.parse("1,2,3").unwrap();
        assert_eq!(out, vec!["1", "2", "3"]);
    }

    #[test]
    fn missing_parse_function_fails_to_compile() {
        let err = ScriptHost::compile("fn not_parse(x) { x }");
        assert!(err.is_err());
    }

    #[test]
    fn runtime_error_is_caught_not_unwound() {
        let host = ScriptHost::compile(
            r#"
            fn parse(payload) {
                throw "boom";
            }
            "#,
        )
        .unwrap();
        assert!(host.parse("x").is_err());
    }

    #[test]
    fn unbounded_loop_is_stopped_by_operation_limit() {
        let host = ScriptHost::compile(
            r#"
            fn parse(payload) {
                let i = 0;
                loop { i += 1; }
            }
            "#,
        )
        .unwrap();
        assert!(host.parse("x").is_err());
    }
}
