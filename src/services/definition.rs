//! # Service definition: the engine's input record.
//!
//! A [`ServiceDefinition`] describes one service as declared by the
//! operator. The on-disk loader and the control transport hand these to
//! the engine; the engine never reads definition files itself.
//!
//! Definitions can be built in code with the `with_*` methods or
//! deserialized from the loader's YAML / the transport's JSON:
//!
//! ```rust
//! use sminit::ServiceDefinition;
//!
//! let def = ServiceDefinition::new("api", "server --port 8080")
//!     .with_after(["db"])
//!     .with_health_check("curl -sf http://localhost:8080/health")
//!     .with_log("stdout");
//! assert_eq!(def.name(), "api");
//! ```

use serde::{Deserialize, Serialize};

/// Health command substituted when a definition declares none.
const DEFAULT_HEALTH_CHECK: &str = "sleep 1";

/// Log sink value that routes child output into the engine's log.
const LOG_STDOUT: &str = "stdout";

/// Declaration of one supervised service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Unique, non-empty service name.
    #[serde(default)]
    name: String,
    /// Command to spawn, tokenised on ASCII space. No shell expansion.
    cmd: String,
    /// Names of services that must be ready before this one starts.
    #[serde(default)]
    after: Vec<String>,
    /// If true, a successful exit is terminal; otherwise the child is
    /// restarted after any exit.
    #[serde(default)]
    one_shot: bool,
    /// Readiness command; empty means a one-second sleep gates readiness.
    #[serde(default)]
    health_check: String,
    /// Sink selector: `"stdout"` routes child streams into the engine's
    /// log, anything else discards them.
    #[serde(default)]
    log: String,
}

impl ServiceDefinition {
    /// Creates a definition with the given name and command.
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            after: Vec::new(),
            one_shot: false,
            health_check: String::new(),
            log: String::new(),
        }
    }

    /// Sets the parent services this one waits for.
    pub fn with_after<I, S>(mut self, after: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after = after.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the service one-shot: a successful exit is terminal.
    pub fn with_one_shot(mut self, one_shot: bool) -> Self {
        self.one_shot = one_shot;
        self
    }

    /// Sets the readiness command.
    pub fn with_health_check(mut self, health_check: impl Into<String>) -> Self {
        self.health_check = health_check.into();
        self
    }

    /// Sets the log sink selector.
    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command string to spawn.
    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    /// Parent service names.
    pub fn after(&self) -> &[String] {
        &self.after
    }

    /// Whether a successful exit is terminal.
    pub fn one_shot(&self) -> bool {
        self.one_shot
    }

    /// Readiness command, with the one-second-sleep default applied.
    pub fn health_check(&self) -> &str {
        if self.health_check.is_empty() {
            DEFAULT_HEALTH_CHECK
        } else {
            &self.health_check
        }
    }

    /// True if child stdout/stderr should flow into the engine's log.
    pub fn logs_to_stdout(&self) -> bool {
        self.log == LOG_STDOUT
    }

    /// Fills in the name for definitions loaded from a name-keyed map.
    pub(crate) fn named(mut self, name: &str) -> Self {
        if self.name.is_empty() {
            self.name = name.to_string();
        }
        self
    }
}

/// Splits a command string on ASCII space into program and arguments.
///
/// Consecutive spaces collapse; returns `None` for a blank string.
pub(crate) fn tokenize(cmd: &str) -> Option<(&str, impl Iterator<Item = &str> + '_)> {
    let mut tokens = cmd.split(' ').filter(|t| !t.is_empty());
    let program = tokens.next()?;
    Some((program, tokens))
}
