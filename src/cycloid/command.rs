//! Building argv for the Cycloid CLI.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Output format requested from the CLI through `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
    Yaml,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Table => "table",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            "yaml" => Ok(Self::Yaml),
            _ => Err(format!("Invalid output format: {}. Must be 'json', 'table', or 'yaml'", s)),
        }
    }
}

/// Value of a single CLI flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    /// Rendered as a bare `--name` when true, omitted when false.
    Switch(bool),
    /// Rendered as `--name value`.
    Value(String),
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Switch(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::Value(value)
    }
}

impl From<&String> for FlagValue {
    fn from(value: &String) -> Self {
        Self::Value(value.clone())
    }
}

/// One CLI call: `<binary> <subcommand> [args..] [flags..] --output <format>`.
///
/// Flags keep insertion order. Setting a flag that already exists replaces
/// its value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    subcommand: String,
    args: Vec<String>,
    flags: Vec<(String, FlagValue)>,
    output: OutputFormat,
    timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(subcommand: impl Into<String>) -> Self {
        Self {
            subcommand: subcommand.into(),
            args: Vec::new(),
            flags: Vec::new(),
            output: OutputFormat::Json,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn flag(mut self, name: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.flags.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.flags.push((name, value)),
        }
        self
    }

    /// Add a valued flag only when `value` is present.
    pub fn flag_opt(self, name: impl Into<String>, value: Option<impl Into<FlagValue>>) -> Self {
        match value {
            Some(value) => self.flag(name, value),
            None => self,
        }
    }

    pub fn output(mut self, output: OutputFormat) -> Self {
        self.output = output;
        self
    }

    /// Override the runner's default timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn subcommand(&self) -> &str {
        &self.subcommand
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Render the argument vector, starting with `binary`.
    pub fn argv(&self, binary: &str) -> Vec<String> {
        let mut argv = Vec::with_capacity(4 + self.args.len() + self.flags.len() * 2);
        argv.push(binary.to_string());
        argv.push(self.subcommand.clone());
        argv.extend(self.args.iter().cloned());

        for (name, value) in &self.flags {
            match value {
                FlagValue::Switch(true) => argv.push(format!("--{name}")),
                FlagValue::Switch(false) => {}
                FlagValue::Value(value) => {
                    argv.push(format!("--{name}"));
                    argv.push(value.clone());
                }
            }
        }

        argv.push("--output".to_string());
        argv.push(self.output.as_str().to_string());
        argv
    }

    /// Space-joined argv, for logs and error messages.
    pub fn render(&self, binary: &str) -> String {
        self.argv(binary).join(" ")
    }
}
