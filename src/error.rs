//! # Errors surfaced at the engine boundary.
//!
//! Every dispatcher operation answers with success or an [`EngineError`].
//! Each variant maps onto one of two [`ErrorKind`]s the transport can
//! translate into its wire format:
//!
//! - [`ErrorKind::BadRequest`] — the request cannot be satisfied against
//!   the current registry state;
//! - [`ErrorKind::Internal`] — a precondition the engine established for
//!   itself failed. Surfaced to the caller, never fatal to the daemon.
//!
//! Per-service runtime failures (crashes, probe exhaustion, spawn errors)
//! are absorbed by the restart loop and never become an `EngineError`;
//! they are visible through `Status` and the log only.

use thiserror::Error;

use crate::services::Status;

/// The two failure classes at the engine boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller's request is invalid against current registry state.
    BadRequest,
    /// An engine-side precondition failed.
    Internal,
}

/// Failure answering a dispatcher operation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EngineError {
    /// A service with the same name is already tracked.
    #[error("a service named '{name}' is already tracked")]
    AlreadyTracked {
        /// The duplicate name.
        name: String,
    },

    /// No tracked service carries the requested name.
    #[error("there is no tracked service named '{name}'")]
    NotTracked {
        /// The missing name.
        name: String,
    },

    /// A definition names a parent that is not admitted.
    #[error("service '{name}' depends on '{parent}', which is not tracked")]
    MissingParent {
        /// The service being admitted.
        name: String,
        /// The absent parent.
        parent: String,
    },

    /// A declared fleet's `after` relation contains a cycle.
    #[error("dependency cycle involving service '{name}'")]
    DependencyCycle {
        /// A service on the cycle.
        name: String,
    },

    /// Start was requested for a service that has already started.
    #[error("service '{name}' status is {status}")]
    AlreadyStarted {
        /// The targeted service.
        name: String,
        /// Its status at the time of the request.
        status: Status,
    },

    /// The definition cannot be admitted as given.
    #[error("definition of '{name}' is invalid: {reason}")]
    InvalidDefinition {
        /// The offending definition's name (possibly empty).
        name: String,
        /// Human-readable cause.
        reason: String,
    },

    /// The service's supervisor task is gone while a signal was due.
    #[error("supervisor of service '{name}' is gone")]
    SupervisorGone {
        /// The orphaned service.
        name: String,
    },
}

impl EngineError {
    /// The failure class the transport should map this error to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::AlreadyTracked { .. }
            | EngineError::NotTracked { .. }
            | EngineError::MissingParent { .. }
            | EngineError::DependencyCycle { .. }
            | EngineError::AlreadyStarted { .. }
            | EngineError::InvalidDefinition { .. } => ErrorKind::BadRequest,
            EngineError::SupervisorGone { .. } => ErrorKind::Internal,
        }
    }

    /// Short stable label for logs and metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::AlreadyTracked { .. } => "already_tracked",
            EngineError::NotTracked { .. } => "not_tracked",
            EngineError::MissingParent { .. } => "missing_parent",
            EngineError::DependencyCycle { .. } => "dependency_cycle",
            EngineError::AlreadyStarted { .. } => "already_started",
            EngineError::InvalidDefinition { .. } => "invalid_definition",
            EngineError::SupervisorGone { .. } => "supervisor_gone",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_partition_the_variants() {
        let bad = EngineError::NotTracked { name: "x".into() };
        assert_eq!(bad.kind(), ErrorKind::BadRequest);

        let internal = EngineError::SupervisorGone { name: "x".into() };
        assert_eq!(internal.kind(), ErrorKind::Internal);
    }

    #[test]
    fn messages_name_the_service() {
        let err = EngineError::AlreadyStarted {
            name: "db".into(),
            status: Status::Running,
        };
        assert_eq!(err.to_string(), "service 'db' status is running");
    }
}
