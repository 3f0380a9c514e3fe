//! Tool-loop protection.
//!
//! The agent must not re-run the same scene mutation over and over, and must
//! verify a mutation before attempting the next one. These rules mirror the
//! loop failures observed in practice: scripts re-executed after success,
//! and mutation chains that never look at the scene in between.

use std::collections::BTreeSet;

use serde_json::Value;

/// The command that mutates the scene.
const MUTATING_COMMAND: &str = "script_execute";

/// Commands that verify scene state after a mutation.
const VERIFYING_COMMANDS: &[&str] = &["scene_query", "viewport_screenshot"];

/// A guardrail stopped a tool call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardrailViolation {
    #[error("tool iteration limit reached ({limit})")]
    IterationLimit { limit: u32 },

    #[error("'{command}' already ran with identical arguments")]
    RepeatedCall { command: String },

    #[error("run a verification command before calling '{command}' again")]
    VerificationRequired { command: String },
}

/// Tracks tool-call activity within one conversation and vetoes calls that
/// match a known loop pattern.
#[derive(Debug, Clone)]
pub struct ToolLoopGuard {
    max_iterations: u32,
    iterations: u32,
    executed_signatures: BTreeSet<String>,
    last_was_mutation: bool,
}

impl ToolLoopGuard {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations,
            iterations: 0,
            executed_signatures: BTreeSet::new(),
            last_was_mutation: false,
        }
    }

    /// Iterations consumed so far in this turn.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Check a tool call before it runs, recording it if allowed.
    pub fn check(&mut self, command: &str, args: &Value) -> Result<(), GuardrailViolation> {
        self.iterations += 1;
        if self.max_iterations > 0 && self.iterations > self.max_iterations {
            return Err(GuardrailViolation::IterationLimit {
                limit: self.max_iterations,
            });
        }

        if command == MUTATING_COMMAND {
            if self.last_was_mutation {
                return Err(GuardrailViolation::VerificationRequired {
                    command: command.into(),
                });
            }
            let signature = format!("{command}:{args}");
            if !self.executed_signatures.insert(signature) {
                return Err(GuardrailViolation::RepeatedCall {
                    command: command.into(),
                });
            }
        }

        if VERIFYING_COMMANDS.contains(&command) {
            self.last_was_mutation = false;
        } else {
            self.last_was_mutation = command == MUTATING_COMMAND;
        }
        Ok(())
    }

    /// Reset the per-turn iteration count. Executed signatures persist for
    /// the whole conversation so identical mutations stay suppressed.
    pub fn reset_turn(&mut self) {
        self.iterations = 0;
    }

    /// Forget everything, e.g. when the conversation is cleared.
    pub fn reset(&mut self) {
        self.iterations = 0;
        self.executed_signatures.clear();
        self.last_was_mutation = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn distinct_calls_pass() {
        let mut guard = ToolLoopGuard::new(25);
        guard.check("script_execute", &json!({"code": "spawn_cube()"})).unwrap();
        guard.check("scene_query", &json!({"class_contains": "Cube"})).unwrap();
        guard.check("script_execute", &json!({"code": "spawn_light()"})).unwrap();
    }

    #[test]
    fn iteration_limit_trips() {
        let mut guard = ToolLoopGuard::new(2);
        guard.check("scene_query", &json!({})).unwrap();
        guard.check("scene_query", &json!({})).unwrap();
        let err = guard.check("scene_query", &json!({})).unwrap_err();
        assert_eq!(err, GuardrailViolation::IterationLimit { limit: 2 });
    }

    #[test]
    fn zero_limit_means_unlimited() {
        let mut guard = ToolLoopGuard::new(0);
        for _ in 0..100 {
            guard.check("scene_query", &json!({})).unwrap();
        }
    }

    #[test]
    fn mutation_twice_in_a_row_requires_verification() {
        let mut guard = ToolLoopGuard::new(25);
        guard.check("script_execute", &json!({"code": "a()"})).unwrap();
        let err = guard
            .check("script_execute", &json!({"code": "b()"}))
            .unwrap_err();
        assert!(matches!(err, GuardrailViolation::VerificationRequired { .. }));
    }

    #[test]
    fn verification_unblocks_next_mutation() {
        let mut guard = ToolLoopGuard::new(25);
        guard.check("script_execute", &json!({"code": "a()"})).unwrap();
        guard.check("viewport_screenshot", &json!({})).unwrap();
        guard.check("script_execute", &json!({"code": "b()"})).unwrap();
    }

    #[test]
    fn identical_mutation_is_suppressed_even_after_verification() {
        let mut guard = ToolLoopGuard::new(25);
        guard.check("script_execute", &json!({"code": "a()"})).unwrap();
        guard.check("scene_query", &json!({})).unwrap();
        let err = guard
            .check("script_execute", &json!({"code": "a()"}))
            .unwrap_err();
        assert_eq!(
            err,
            GuardrailViolation::RepeatedCall {
                command: "script_execute".into()
            }
        );
    }

    #[test]
    fn reset_turn_keeps_signatures() {
        let mut guard = ToolLoopGuard::new(2);
        guard.check("script_execute", &json!({"code": "a()"})).unwrap();
        guard.check("scene_query", &json!({})).unwrap();
        assert!(guard.check("scene_query", &json!({})).is_err()); // limit hit

        guard.reset_turn();
        guard.check("scene_query", &json!({})).unwrap();
        // The earlier mutation is still on record.
        let err = guard
            .check("script_execute", &json!({"code": "a()"}))
            .unwrap_err();
        assert!(matches!(err, GuardrailViolation::RepeatedCall { .. }));
    }

    #[test]
    fn full_reset_forgets_signatures() {
        let mut guard = ToolLoopGuard::new(25);
        guard.check("script_execute", &json!({"code": "a()"})).unwrap();
        guard.reset();
        guard.check("script_execute", &json!({"code": "a()"})).unwrap();
    }

    #[test]
    fn non_scene_commands_do_not_count_as_verification() {
        let mut guard = ToolLoopGuard::new(25);
        guard.check("script_execute", &json!({"code": "a()"})).unwrap();
        // asset_generate is neither mutating nor verifying; the mutation
        // flag clears because the last call is no longer a mutation.
        guard.check("asset_generate", &json!({"prompt": "rock", "output_kind": "mesh"})).unwrap();
        guard.check("script_execute", &json!({"code": "import()"})).unwrap();
    }
}
