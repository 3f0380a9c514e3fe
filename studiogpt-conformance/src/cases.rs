//! Built-in lifecycle conformance cases.
//!
//! Each case drives a fresh extension through `Loading -> Active ->
//! Unloading` (or a failure path) against a disposable [`SandboxHost`] and
//! checks one guaranteed property. Results are reported per case as
//! pass/fail/error; a panic inside a case is contained and reported as an
//! error, never aborts the run.

use studiogpt_capability::json;
use studiogpt_extension::lifecycle::ExtensionState;
use studiogpt_extension::loader::{Contribution, ExtensionLoader, default_contributions};
use studiogpt_extension::module::{ModuleDescriptor, ModuleGraph};
use studiogpt_extension::registration::ContributionKind;

use crate::sandbox::{HostAction, SandboxHost};

/// Outcome of one conformance case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Pass,
    /// The checked property did not hold.
    Fail(String),
    /// The case itself blew up (panic).
    Error(String),
}

impl CaseOutcome {
    pub fn passed(&self) -> bool {
        *self == Self::Pass
    }
}

/// A named case and its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseResult {
    pub name: &'static str,
    pub outcome: CaseOutcome,
}

type CaseFn = fn() -> Result<(), String>;

const CASES: &[(&str, CaseFn)] = &[
    ("load_unload_leaves_no_handles", case_load_unload_leaves_no_handles),
    (
        "deregistration_reverses_registration",
        case_deregistration_reverses_registration,
    ),
    ("json_roundtrip_value_model", case_json_roundtrip_value_model),
    ("cancel_after_completion_is_noop", case_cancel_after_completion_is_noop),
    ("failed_registration_rolls_back", case_failed_registration_rolls_back),
    ("duplicate_menu_entry_scenario", case_duplicate_menu_entry_scenario),
    ("module_graph_load_unload_order", case_module_graph_load_unload_order),
];

/// Run every built-in case against a fresh sandbox and report per-case
/// outcomes.
pub fn run_cases() -> Vec<CaseResult> {
    CASES
        .iter()
        .map(|&(name, case)| {
            let outcome = match std::panic::catch_unwind(case) {
                Ok(Ok(())) => CaseOutcome::Pass,
                Ok(Err(reason)) => CaseOutcome::Fail(reason),
                Err(panic) => CaseOutcome::Error(panic_message(&panic)),
            };
            tracing::debug!(case = name, ?outcome, "conformance case finished");
            CaseResult { name, outcome }
        })
        .collect()
}

/// Number of passing results in a run.
pub fn passed_count(results: &[CaseResult]) -> usize {
    results.iter().filter(|r| r.outcome.passed()).count()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn ensure(condition: bool, reason: &str) -> Result<(), String> {
    if condition {
        Ok(())
    } else {
        Err(reason.to_string())
    }
}

// ---------------------------------------------------------------------------
// Cases
// ---------------------------------------------------------------------------

fn case_load_unload_leaves_no_handles() -> Result<(), String> {
    let mut host = SandboxHost::new();
    let mut loader = ExtensionLoader::new(default_contributions());

    loader.load(&mut host).map_err(|e| e.to_string())?;
    ensure(loader.state() == ExtensionState::Active, "extension not active after load")?;
    ensure(!loader.outstanding_handles().is_empty(), "no handles registered during load")?;

    loader.unload(&mut host).map_err(|e| e.to_string())?;
    ensure(loader.state() == ExtensionState::Unloaded, "extension not unloaded")?;
    ensure(
        loader.outstanding_handles().is_empty(),
        "handles still outstanding after unload",
    )?;
    ensure(host.is_pristine(), "host not restored to pre-load condition")
}

fn case_deregistration_reverses_registration() -> Result<(), String> {
    let mut host = SandboxHost::new();
    let mut loader = ExtensionLoader::new(default_contributions());
    loader.load(&mut host).map_err(|e| e.to_string())?;
    loader.unload(&mut host).map_err(|e| e.to_string())?;

    let registered: Vec<&str> = host
        .events()
        .iter()
        .filter(|e| e.action == HostAction::Register)
        .map(|e| e.name.as_str())
        .collect();
    let released: Vec<&str> = host
        .events()
        .iter()
        .filter(|e| e.action == HostAction::Unregister)
        .map(|e| e.name.as_str())
        .collect();

    let mut reversed = registered;
    reversed.reverse();
    ensure(released == reversed, "deregistration order is not the reverse of registration")
}

fn case_json_roundtrip_value_model() -> Result<(), String> {
    let value = serde_json::json!({
        "scene": {
            "objects": [
                {"class": "StaticMesh", "label": "Cube_1", "visible": true},
                {"class": "PointLight", "label": "Key Light", "intensity": 5000.0}
            ],
            "selection": null
        },
        "page": 1
    });
    let text = json::serialize(&value).map_err(|e| e.to_string())?;
    let back: serde_json::Value = json::deserialize(&text).map_err(|e| e.to_string())?;
    ensure(back == value, "deserialize(serialize(v)) != v")
}

fn case_cancel_after_completion_is_noop() -> Result<(), String> {
    let mut host = SandboxHost::new();
    let mut loader = ExtensionLoader::new(default_contributions());
    loader.load(&mut host).map_err(|e| e.to_string())?;

    let token = loader.cancellation_token();
    loader.unload(&mut host).map_err(|e| e.to_string())?;
    ensure(token.is_cancelled(), "unload did not cancel the extension token")?;

    // Cancelling again must be a silent no-op.
    token.cancel();
    token.cancel();
    ensure(token.is_cancelled(), "token state changed by repeated cancel")?;

    // A reload hands out a fresh, uncancelled token.
    loader.load(&mut host).map_err(|e| e.to_string())?;
    ensure(
        !loader.cancellation_token().is_cancelled(),
        "reload reused a cancelled token",
    )
}

fn case_failed_registration_rolls_back() -> Result<(), String> {
    let mut host = SandboxHost::new();
    host.reject_name("studiogpt_agent");
    let mut loader = ExtensionLoader::new(default_contributions());

    let result = loader.load(&mut host);
    ensure(result.is_err(), "load succeeded despite injected rejection")?;
    ensure(loader.state() == ExtensionState::Unloaded, "state not Unloaded after failed load")?;
    ensure(loader.outstanding_handles().is_empty(), "handles leaked by failed load")?;
    ensure(host.is_pristine(), "host holds registrations from a failed load")
}

fn case_duplicate_menu_entry_scenario() -> Result<(), String> {
    // Three menu entries register, the fourth collides. Expect entries 1-3
    // rolled back, final state Unloaded, error surfaced to the caller.
    let contributions = vec![
        Contribution::new(ContributionKind::MenuEntry, "entry_one"),
        Contribution::new(ContributionKind::MenuEntry, "entry_two"),
        Contribution::new(ContributionKind::MenuEntry, "entry_three"),
        Contribution::new(ContributionKind::MenuEntry, "entry_three"),
    ];
    let mut host = SandboxHost::new();
    let mut loader = ExtensionLoader::new(contributions);

    let err = match loader.load(&mut host) {
        Ok(()) => return Err("duplicate registration was accepted".into()),
        Err(err) => err,
    };
    ensure(err.to_string().contains("entry_three"), "error does not name the duplicate")?;
    ensure(loader.state() == ExtensionState::Unloaded, "state not Unloaded")?;
    ensure(host.is_pristine(), "entries 1-3 were not rolled back")?;

    let actions: Vec<String> = host
        .events()
        .iter()
        .map(|e| {
            let sign = if e.action == HostAction::Register { "+" } else { "-" };
            format!("{sign}{}", e.name)
        })
        .collect();
    ensure(
        actions
            == vec![
                "+entry_one",
                "+entry_two",
                "+entry_three",
                "-entry_three",
                "-entry_two",
                "-entry_one",
            ],
        "rollback did not unwind in reverse order",
    )
}

fn case_module_graph_load_unload_order() -> Result<(), String> {
    let mut graph = ModuleGraph::new();
    graph
        .insert(ModuleDescriptor::new("capability").with_export("issue_request"))
        .map_err(|e| e.to_string())?;
    graph
        .insert(
            ModuleDescriptor::new("extension")
                .with_public_dep("capability")
                .with_use("capability", "issue_request"),
        )
        .map_err(|e| e.to_string())?;
    graph
        .insert(ModuleDescriptor::new("verification").with_private_dep("extension"))
        .map_err(|e| e.to_string())?;

    let load = graph.load_order().map_err(|e| e.to_string())?;
    let unload = graph.unload_order().map_err(|e| e.to_string())?;
    ensure(load == ["capability", "extension", "verification"], "load order wrong")?;

    let mut reversed = load;
    reversed.reverse();
    ensure(unload == reversed, "unload order is not the reverse of load order")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
