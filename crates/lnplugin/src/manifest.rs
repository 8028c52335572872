use serde::{Deserialize, Serialize};

use crate::method::{MethodDescriptor, MethodRegistry};
use crate::options::{OptionRegistry, PluginOption};

/// Name of the built-in discovery method.
pub const GETMANIFEST: &str = "getmanifest";
/// Name of the built-in initialisation method.
pub const INIT: &str = "init";

/// Returns `true` for the reserved handshake methods.
pub fn is_builtin(name: &str) -> bool {
    name == GETMANIFEST || name == INIT
}

/// Capability document returned by `getmanifest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub options: Vec<OptionSpec>,
    pub rpcmethods: Vec<MethodSpec>,
}

/// Wire form of a [`PluginOption`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: String,
    /// Always `"string"`; typed options are not supported.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub description: String,
}

/// Wire form of a [`MethodDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<String>,
}

impl From<&PluginOption> for OptionSpec {
    fn from(option: &PluginOption) -> Self {
        let default = option.default_value();
        Self {
            name: option.name().to_string(),
            kind: "string".to_string(),
            default: (!default.is_empty()).then(|| default.to_string()),
            description: option.description().to_string(),
        }
    }
}

impl From<&MethodDescriptor> for MethodSpec {
    fn from(method: &MethodDescriptor) -> Self {
        Self {
            name: method.name().to_string(),
            description: method.description().to_string(),
            params: method.params().to_vec(),
        }
    }
}

impl Manifest {
    /// Snapshots both registries, leaving out the handshake methods.
    pub fn build(options: &OptionRegistry, methods: &MethodRegistry) -> Self {
        Self {
            options: options.iter().map(OptionSpec::from).collect(),
            rpcmethods: methods
                .iter()
                .filter(|m| !is_builtin(m.name()))
                .map(MethodSpec::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn method(name: &str) -> MethodDescriptor {
        MethodDescriptor::new(name, |_| Ok(Value::Null))
    }

    #[test]
    fn builtins_never_listed() {
        for builtin_first in [true, false] {
            let mut methods = MethodRegistry::new();
            if builtin_first {
                methods.insert(method(GETMANIFEST)).unwrap();
                methods.insert(method(INIT)).unwrap();
            }
            methods.insert(method("a")).unwrap();
            methods.insert(method("b")).unwrap();
            if !builtin_first {
                methods.insert(method(INIT)).unwrap();
                methods.insert(method(GETMANIFEST)).unwrap();
            }
            let manifest = Manifest::build(&OptionRegistry::new(), &methods);
            let names: Vec<&str> = manifest.rpcmethods.iter().map(|m| m.name.as_str()).collect();
            assert_eq!(names, vec!["a", "b"]);
        }
    }

    #[test]
    fn wire_shape_omits_empty_default_and_params() {
        let mut options = OptionRegistry::new();
        options
            .register(PluginOption::new("alias", "", ""))
            .unwrap();
        options
            .register(PluginOption::new("max-fee", "Fee cap", "42"))
            .unwrap();
        let mut methods = MethodRegistry::new();
        methods
            .insert(method("ping").with_description("replies pong"))
            .unwrap();
        methods
            .insert(method("pay").with_params(["bolt11", "amount_msat"]))
            .unwrap();

        let value = serde_json::to_value(Manifest::build(&options, &methods)).unwrap();
        assert_eq!(
            value,
            json!({
                "options": [
                    {"name": "alias", "type": "string", "description": "A lightning plugin option."},
                    {"name": "max-fee", "type": "string", "default": "42", "description": "Fee cap"},
                ],
                "rpcmethods": [
                    {"name": "ping", "description": "replies pong"},
                    {
                        "name": "pay",
                        "description": "A lightning plugin RPC method.",
                        "params": ["bolt11", "amount_msat"],
                    },
                ],
            })
        );
    }

    #[test]
    fn empty_registries_produce_empty_lists() {
        let value =
            serde_json::to_value(Manifest::build(&OptionRegistry::new(), &MethodRegistry::new()))
                .unwrap();
        assert_eq!(value, json!({"options": [], "rpcmethods": []}));
    }
}
