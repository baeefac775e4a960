use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An external command, either a shell line or an argv list
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Command {
    Single(String),
    Multiple(Vec<String>),
}

impl Command {
    /// Replace every `{key}` placeholder with its value
    pub fn substitute(&self, vars: &[(&str, String)]) -> Command {
        let apply = |s: &str| {
            vars.iter().fold(s.to_string(), |acc, (key, value)| {
                acc.replace(&format!("{{{}}}", key), value)
            })
        };
        match self {
            Command::Single(cmd) => Command::Single(apply(cmd)),
            Command::Multiple(args) => Command::Multiple(args.iter().map(|a| apply(a)).collect()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskConfig {
    pub name: String,
    pub description: Option<String>,
    pub script: Option<String>,
    pub command: Option<Command>,
    pub dependencies: Option<Vec<String>>,
}
