use std::fmt;
use std::path::PathBuf;

use jrpc::ServerError;

/// Which registry an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Method,
    Option,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Method => f.write_str("method"),
            EntryKind::Option => f.write_str("option"),
        }
    }
}

/// Errors from plugin registration and startup.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// An entry with this name is already registered.
    #[error("{kind} `{name}` already registered")]
    DuplicateName { kind: EntryKind, name: String },

    /// No entry with this name is registered.
    #[error("no {kind} `{name}` registered")]
    NotFound { kind: EntryKind, name: String },

    /// The entry has no name.
    #[error("can't register an empty {0}")]
    EmptyArgument(EntryKind),

    /// An option value could not be converted to the requested type.
    #[error("option `{name}` has invalid value `{value}`: {reason}")]
    InvalidOptionValue {
        name: String,
        value: String,
        reason: String,
    },

    /// The transport rejected an operation.
    #[error(transparent)]
    Transport(ServerError),

    /// The log file could not be opened, so the plugin must not start.
    #[error("failed to open log file {}: {source}", .path.display())]
    StartupIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PluginError {
    pub(crate) fn duplicate(kind: EntryKind, name: &str) -> Self {
        Self::DuplicateName {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn not_found(kind: EntryKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

impl From<ServerError> for PluginError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::DuplicateMethod(name) => Self::DuplicateName {
                kind: EntryKind::Method,
                name,
            },
            ServerError::UnknownMethod(name) => Self::NotFound {
                kind: EntryKind::Method,
                name,
            },
            other => Self::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_duplicate_maps_to_duplicate_name() {
        let err = PluginError::from(ServerError::DuplicateMethod("ping".into()));
        assert!(matches!(
            err,
            PluginError::DuplicateName { kind: EntryKind::Method, ref name } if name == "ping"
        ));
        assert_eq!(err.to_string(), "method `ping` already registered");
    }

    #[test]
    fn messages_name_the_registry() {
        let err = PluginError::not_found(EntryKind::Option, "fee-rate");
        assert_eq!(err.to_string(), "no option `fee-rate` registered");
        let err = PluginError::EmptyArgument(EntryKind::Method);
        assert_eq!(err.to_string(), "can't register an empty method");
    }
}
