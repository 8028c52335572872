//! RPC methods exposed by the plugin.
//!
//! A [`MethodDescriptor`] couples a transport [`Handler`] with the metadata
//! advertised in the manifest. Parameter names are declared up front rather
//! than derived from the handler, so the manifest is fixed at registration.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use jrpc::{Handler, RpcError};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{EntryKind, PluginError};

/// Description used when a method is registered without one.
pub const DEFAULT_METHOD_DESCRIPTION: &str = "A lightning plugin RPC method.";

/// A method whose parameters are bound by deserialising the request.
///
/// The request `params` are decoded into `Self` and [`RpcMethod::call`] is
/// invoked on the result. `null` params decode as an empty object, so types
/// without required fields accept a bare request.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Greet {
///     #[serde(default)]
///     name: Option<String>,
/// }
///
/// impl RpcMethod for Greet {
///     const NAME: &'static str = "greet";
///     const DESCRIPTION: &'static str = "Says hello";
///     const PARAMS: &'static [&'static str] = &["name"];
///
///     fn call(self) -> anyhow::Result<Value> {
///         Ok(json!(format!("hello {}", self.name.as_deref().unwrap_or("world"))))
///     }
/// }
/// ```
pub trait RpcMethod: DeserializeOwned + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str = "";
    const PARAMS: &'static [&'static str] = &[];

    /// Runs the method with the bound parameters.
    ///
    /// Returning an [`RpcError`] inside the `anyhow::Error` preserves its
    /// code; any other error is reported as an internal error.
    fn call(self) -> anyhow::Result<Value>;
}

/// Method handler plus the metadata published in the manifest.
#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    description: String,
    params: Vec<String>,
    handler: Handler,
}

impl MethodDescriptor {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            params: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Builds a descriptor for a typed [`RpcMethod`].
    pub fn typed<M: RpcMethod>() -> Self {
        Self::new(M::NAME, |params: Value| {
            let params = if params.is_null() {
                Value::Object(Map::new())
            } else {
                params
            };
            let method: M = serde_json::from_value(params).map_err(RpcError::invalid_params)?;
            method.call().map_err(RpcError::from)
        })
        .with_description(M::DESCRIPTION)
        .with_params(M::PARAMS.iter().copied())
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends one documented parameter name.
    pub fn with_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    pub fn with_params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        if self.description.is_empty() {
            DEFAULT_METHOD_DESCRIPTION
        } else {
            &self.description
        }
    }

    /// Declared parameter names, in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn handler(&self) -> Handler {
        Arc::clone(&self.handler)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Descriptors keyed by method name, in registration order.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    methods: IndexMap<String, MethodDescriptor>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// # Errors
    ///
    /// [`PluginError::DuplicateName`] if the name is taken.
    pub fn insert(&mut self, method: MethodDescriptor) -> Result<(), PluginError> {
        if self.methods.contains_key(&method.name) {
            return Err(PluginError::duplicate(EntryKind::Method, &method.name));
        }
        self.methods.insert(method.name.clone(), method);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<MethodDescriptor, PluginError> {
        self.methods
            .shift_remove(name)
            .ok_or_else(|| PluginError::not_found(EntryKind::Method, name))
    }

    pub fn get(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Invoice {
        amount_msat: u64,
        #[serde(default)]
        label: Option<String>,
    }

    impl RpcMethod for Invoice {
        const NAME: &'static str = "invoice";
        const DESCRIPTION: &'static str = "Creates an invoice";
        const PARAMS: &'static [&'static str] = &["amount_msat", "label"];

        fn call(self) -> anyhow::Result<Value> {
            if self.amount_msat == 0 {
                return Err(RpcError::invalid_params("amount_msat must be positive").into());
            }
            Ok(json!({
                "amount_msat": self.amount_msat,
                "label": self.label.unwrap_or_default(),
            }))
        }
    }

    #[derive(Deserialize)]
    struct Stop {}

    impl RpcMethod for Stop {
        const NAME: &'static str = "stop";

        fn call(self) -> anyhow::Result<Value> {
            Ok(json!("stopping"))
        }
    }

    #[test]
    fn typed_descriptor_carries_declared_params() {
        let desc = MethodDescriptor::typed::<Invoice>();
        assert_eq!(desc.name(), "invoice");
        assert_eq!(desc.description(), "Creates an invoice");
        assert_eq!(desc.params(), ["amount_msat", "label"]);
    }

    #[test]
    fn typed_handler_binds_named_and_positional_params() {
        let handler = MethodDescriptor::typed::<Invoice>().handler();
        let res = handler(json!({"amount_msat": 1000, "label": "coffee"})).unwrap();
        assert_eq!(res, json!({"amount_msat": 1000, "label": "coffee"}));
        let res = handler(json!([5, "tea"])).unwrap();
        assert_eq!(res["label"], json!("tea"));
    }

    #[test]
    fn typed_handler_rejects_bad_params() {
        let handler = MethodDescriptor::typed::<Invoice>().handler();
        let err = handler(json!({"label": "x"})).unwrap_err();
        assert_eq!(err.code, RpcError::INVALID_PARAMS);
        let err = handler(json!({"amount_msat": 0})).unwrap_err();
        assert_eq!(err.code, RpcError::INVALID_PARAMS);
        assert!(err.message.contains("must be positive"));
    }

    #[test]
    fn method_without_fields_accepts_null_params() {
        let desc = MethodDescriptor::typed::<Stop>();
        assert!(desc.params().is_empty());
        assert_eq!(desc.description(), DEFAULT_METHOD_DESCRIPTION);
        assert_eq!(desc.handler()(Value::Null).unwrap(), json!("stopping"));
    }

    #[test]
    fn registry_rejects_duplicates_and_unknown_removals() {
        let mut reg = MethodRegistry::new();
        reg.insert(MethodDescriptor::new("ping", |_| Ok(json!("pong"))))
            .unwrap();
        let err = reg
            .insert(MethodDescriptor::new("ping", |_| Ok(Value::Null)))
            .unwrap_err();
        assert!(matches!(err, PluginError::DuplicateName { .. }));
        assert_eq!(reg.len(), 1);
        assert!(matches!(
            reg.remove("pong"),
            Err(PluginError::NotFound { kind: EntryKind::Method, .. })
        ));
        assert!(reg.contains("ping"));
    }
}
