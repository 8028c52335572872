use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::options::OptionRegistry;

/// Host configuration delivered with `init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Host data directory.
    #[serde(rename = "lightning-dir")]
    pub lightning_dir: String,
    /// Host RPC socket, usually relative to [`Config::lightning_dir`].
    #[serde(rename = "rpc-file")]
    pub rpc_file: String,
}

impl Config {
    /// Path of the host RPC socket.
    ///
    /// A relative `rpc-file` is resolved against `lightning-dir`.
    pub fn rpc_path(&self) -> PathBuf {
        let rpc = Path::new(&self.rpc_file);
        if rpc.is_absolute() {
            rpc.to_path_buf()
        } else {
            Path::new(&self.lightning_dir).join(rpc)
        }
    }
}

/// Parameters of the `init` request.
#[derive(Debug, Clone, Deserialize)]
pub struct InitRequest {
    #[serde(default)]
    pub options: Map<String, Value>,
    pub configuration: Config,
}

/// Handshake progress of a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PluginState {
    #[default]
    Uninitialized,
    Initialized { config: Config },
}

impl PluginState {
    pub fn is_initialized(&self) -> bool {
        matches!(self, PluginState::Initialized { .. })
    }

    pub fn config(&self) -> Option<&Config> {
        match self {
            PluginState::Initialized { config } => Some(config),
            PluginState::Uninitialized => None,
        }
    }
}

/// Copies host-supplied values into `registry`.
///
/// Names the plugin never registered are logged and skipped. Returns the
/// number of skipped names.
pub(crate) fn apply_options(registry: &mut OptionRegistry, options: &Map<String, Value>) -> usize {
    let mut skipped = 0;
    for (name, value) in options {
        if !registry.set(name, option_text(value)) {
            warn!(option = %name, "ignoring option the plugin never registered");
            skipped += 1;
        }
    }
    skipped
}

// Hosts send option values as strings, but tolerate bare scalars.
fn option_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PluginOption;
    use serde_json::json;

    #[test]
    fn parses_host_payload() {
        let req: InitRequest = serde_json::from_value(json!({
            "options": {"max-fee": "7"},
            "configuration": {"lightning-dir": "/tmp/x", "rpc-file": "rpc"}
        }))
        .unwrap();
        assert_eq!(req.configuration.lightning_dir, "/tmp/x");
        assert_eq!(req.options["max-fee"], json!("7"));
    }

    #[test]
    fn missing_options_default_to_empty() {
        let req: InitRequest = serde_json::from_value(json!({
            "configuration": {"lightning-dir": "/tmp/x", "rpc-file": "rpc"}
        }))
        .unwrap();
        assert!(req.options.is_empty());
    }

    #[test]
    fn unknown_options_are_skipped() {
        let mut reg = OptionRegistry::new();
        reg.register(PluginOption::new("max-fee", "", "42")).unwrap();
        let opts = json!({"max-fee": 7, "from-the-future": "yes", "flag": true});
        let skipped = apply_options(&mut reg, opts.as_object().unwrap());
        assert_eq!(skipped, 2);
        assert_eq!(reg.get("max-fee").unwrap().value(), "7");
        assert!(reg.get("from-the-future").is_none());
    }

    #[test]
    fn rpc_path_resolves_relative_file() {
        let cfg = Config {
            lightning_dir: "/home/ln/.lightning".into(),
            rpc_file: "lightning-rpc".into(),
        };
        assert_eq!(
            cfg.rpc_path(),
            PathBuf::from("/home/ln/.lightning/lightning-rpc")
        );
        let cfg = Config {
            rpc_file: "/run/ln.sock".into(),
            ..cfg
        };
        assert_eq!(cfg.rpc_path(), PathBuf::from("/run/ln.sock"));
    }

    #[test]
    fn state_exposes_config_only_when_initialized() {
        let state = PluginState::default();
        assert!(!state.is_initialized());
        assert!(state.config().is_none());
        let state = PluginState::Initialized {
            config: Config {
                lightning_dir: "/a".into(),
                rpc_file: "b".into(),
            },
        };
        assert_eq!(state.config().unwrap().lightning_dir, "/a");
    }
}
