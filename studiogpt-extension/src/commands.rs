//! Typed bridge-command registry.
//!
//! The scripting bridge is not dynamic dispatch: every command is declared
//! with a name, an argument schema, and a handler, and the schema is checked
//! when the command is registered, not when it is first invoked. Arguments
//! are validated against the schema before the handler runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registration::{ContributionKind, RegistrationError};
use crate::settings::StudioGptSettings;

// ---------------------------------------------------------------------------
// Argument schemas
// ---------------------------------------------------------------------------

/// Subset of JSON Schema used for bridge-command arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonSchema {
    Boolean {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(alias = "integer")]
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Array {
        items: Box<JsonSchema>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Object {
        properties: BTreeMap<String, JsonSchema>,
        #[serde(skip_serializing_if = "Option::is_none")]
        required: Option<Vec<String>>,
        #[serde(
            rename = "additionalProperties",
            skip_serializing_if = "Option::is_none"
        )]
        additional_properties: Option<bool>,
    },
}

impl JsonSchema {
    fn string(description: &str) -> Self {
        Self::String {
            description: Some(description.into()),
        }
    }

    fn integer(description: &str) -> Self {
        Self::Number {
            description: Some(description.into()),
        }
    }

    /// Check a value against this schema. Returns a human-readable reason on
    /// mismatch; `path` locates the offending element.
    fn check(&self, value: &Value, path: &str) -> Result<(), String> {
        match self {
            Self::Boolean { .. } => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(format!("{path}: expected boolean"))
                }
            }
            Self::String { .. } => {
                if value.is_string() {
                    Ok(())
                } else {
                    Err(format!("{path}: expected string"))
                }
            }
            Self::Number { .. } => {
                if value.is_number() {
                    Ok(())
                } else {
                    Err(format!("{path}: expected number"))
                }
            }
            Self::Array { items, .. } => {
                let Some(elements) = value.as_array() else {
                    return Err(format!("{path}: expected array"));
                };
                for (idx, element) in elements.iter().enumerate() {
                    items.check(element, &format!("{path}[{idx}]"))?;
                }
                Ok(())
            }
            Self::Object {
                properties,
                required,
                additional_properties,
            } => {
                let Some(map) = value.as_object() else {
                    return Err(format!("{path}: expected object"));
                };
                if let Some(required) = required {
                    for field in required {
                        if !map.contains_key(field) {
                            return Err(format!("{path}: missing required field '{field}'"));
                        }
                    }
                }
                for (key, field_value) in map {
                    match properties.get(key) {
                        Some(schema) => schema.check(field_value, &format!("{path}.{key}"))?,
                        None => {
                            if *additional_properties == Some(false) {
                                return Err(format!("{path}: unknown field '{key}'"));
                            }
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command registry
// ---------------------------------------------------------------------------

/// Declaration of one bridge command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub parameters: JsonSchema,
}

/// Handler invoked with validated arguments. Failures are data, not panics.
pub type CommandHandler = Box<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Errors produced when invoking a bridge command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("invalid arguments for '{command}': {reason}")]
    InvalidArguments { command: String, reason: String },

    #[error("command '{command}' failed: {reason}")]
    HandlerFailed { command: String, reason: String },
}

/// Name -> (schema, handler) registry for the scripting bridge.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<(CommandSpec, CommandHandler)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. The schema is validated here: the top level must
    /// be an object, and the name must be free.
    pub fn register(
        &mut self,
        spec: CommandSpec,
        handler: CommandHandler,
    ) -> Result<(), RegistrationError> {
        if self.commands.iter().any(|(s, _)| s.name == spec.name) {
            return Err(RegistrationError::DuplicateName(spec.name));
        }
        if !matches!(spec.parameters, JsonSchema::Object { .. }) {
            return Err(RegistrationError::Rejected {
                kind: ContributionKind::BridgeCommand,
                name: spec.name,
                reason: "parameters schema must be an object".into(),
            });
        }
        self.commands.push((spec, handler));
        Ok(())
    }

    /// Remove a command by name. Returns whether it was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.commands.len();
        self.commands.retain(|(s, _)| s.name != name);
        self.commands.len() != before
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands
            .iter()
            .map(|(s, _)| s)
            .find(|s| s.name == name)
    }

    /// All registered specs, in registration order.
    pub fn specs(&self) -> Vec<&CommandSpec> {
        self.commands.iter().map(|(s, _)| s).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Validate `args` against the command's schema, then run its handler.
    pub fn invoke(&self, name: &str, args: &Value) -> Result<Value, CommandError> {
        let Some((spec, handler)) = self.commands.iter().find(|(s, _)| s.name == name) else {
            return Err(CommandError::UnknownCommand(name.into()));
        };
        spec.parameters
            .check(args, "arguments")
            .map_err(|reason| CommandError::InvalidArguments {
                command: name.into(),
                reason,
            })?;
        handler(args).map_err(|reason| CommandError::HandlerFailed {
            command: name.into(),
            reason,
        })
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.specs())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in command specs
// ---------------------------------------------------------------------------

/// Execute editor script code and return its structured result.
pub fn script_execute_spec() -> CommandSpec {
    CommandSpec {
        name: "script_execute".into(),
        description: "Run a script in the host's embedded interpreter and return its JSON result"
            .into(),
        parameters: JsonSchema::Object {
            properties: BTreeMap::from([(
                "code".into(),
                JsonSchema::string("Script source to execute"),
            )]),
            required: Some(vec!["code".into()]),
            additional_properties: Some(false),
        },
    }
}

/// Query the open scene for matching objects.
pub fn scene_query_spec() -> CommandSpec {
    CommandSpec {
        name: "scene_query".into(),
        description: "Search the open scene by class, label, name, or component".into(),
        parameters: JsonSchema::Object {
            properties: BTreeMap::from([
                (
                    "class_contains".into(),
                    JsonSchema::string("Substring match on object class"),
                ),
                (
                    "label_contains".into(),
                    JsonSchema::string("Substring match on display label"),
                ),
                (
                    "name_contains".into(),
                    JsonSchema::string("Substring match on internal name"),
                ),
                (
                    "component_class_contains".into(),
                    JsonSchema::string("Substring match on attached component class"),
                ),
                (
                    "max_results".into(),
                    JsonSchema::integer("Cap on returned matches"),
                ),
            ]),
            required: None,
            additional_properties: Some(false),
        },
    }
}

/// Capture the active viewport.
pub fn viewport_screenshot_spec() -> CommandSpec {
    CommandSpec {
        name: "viewport_screenshot".into(),
        description: "Capture the active viewport as an image".into(),
        parameters: JsonSchema::Object {
            properties: BTreeMap::new(),
            required: None,
            additional_properties: Some(false),
        },
    }
}

/// Generate an asset (image, mesh, audio, video) through the configured
/// generation service.
pub fn asset_generate_spec() -> CommandSpec {
    CommandSpec {
        name: "asset_generate".into(),
        description: "Generate an asset from a prompt via the configured generation service"
            .into(),
        parameters: JsonSchema::Object {
            properties: BTreeMap::from([
                (
                    "prompt".into(),
                    JsonSchema::string("What to generate"),
                ),
                (
                    "version".into(),
                    JsonSchema::string("Explicit model identifier, overriding the configured one"),
                ),
                (
                    "output_kind".into(),
                    JsonSchema::string("One of: image, mesh, audio, video"),
                ),
                (
                    "output_subkind".into(),
                    JsonSchema::string("Refinement of the kind, e.g. sfx, music, speech"),
                ),
            ]),
            required: Some(vec!["prompt".into(), "output_kind".into()]),
            additional_properties: Some(false),
        },
    }
}

/// The command set enabled by the given settings, in a stable order.
pub fn built_in_specs(settings: &StudioGptSettings) -> Vec<CommandSpec> {
    let mut specs = Vec::new();
    if settings.enable_script_execution {
        specs.push(script_execute_spec());
    }
    if settings.enable_scene_summary {
        specs.push(scene_query_spec());
    }
    if settings.enable_viewport_screenshot {
        specs.push(viewport_screenshot_spec());
    }
    if settings.enable_asset_generation {
        specs.push(asset_generate_spec());
    }
    specs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
