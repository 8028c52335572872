//! Plugin controller.
//!
//! [`Plugin`] owns the option and method registries, the handshake state and
//! the transport. Methods and options are registered before [`Plugin::start`];
//! `start` then injects the `getmanifest` and `init` handlers and blocks in the
//! transport loop until the host closes the input stream.
//!
//! The method registry and the transport's method table always agree on which
//! names are live: every registration and removal is mirrored on both sides
//! while the registry lock is held.

use std::io::{BufReader, BufWriter, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use jrpc::{RpcError, Server, Transport};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::{EntryKind, PluginError};
use crate::init::{apply_options, Config, InitRequest, PluginState};
use crate::manifest::{Manifest, GETMANIFEST, INIT};
use crate::method::{MethodDescriptor, MethodRegistry, RpcMethod};
use crate::options::{OptionRegistry, OptionValues, PluginOption};
use crate::settings::PluginSettings;

/// Callback run once the host has sent `init`.
pub type InitCallback = dyn Fn(&Plugin, &OptionValues, &Config) + Send + Sync;

#[derive(Default)]
struct Registry {
    options: OptionRegistry,
    methods: MethodRegistry,
}

struct Inner {
    transport: Arc<dyn Transport>,
    registry: Mutex<Registry>,
    state: Mutex<PluginState>,
    settings: PluginSettings,
    on_init: Box<InitCallback>,
}

/// Handle to a plugin. Clones share the same registries and state.
#[derive(Clone)]
pub struct Plugin {
    inner: Arc<Inner>,
}

impl Plugin {
    /// Creates a plugin served by a [`jrpc::Server`], with settings taken
    /// from the environment.
    pub fn new<F>(on_init: F) -> Self
    where
        F: Fn(&Plugin, &OptionValues, &Config) + Send + Sync + 'static,
    {
        Self::with_settings(PluginSettings::from_env(), on_init)
    }

    pub fn with_settings<F>(settings: PluginSettings, on_init: F) -> Self
    where
        F: Fn(&Plugin, &OptionValues, &Config) + Send + Sync + 'static,
    {
        Self::with_transport(Arc::new(Server::new()), settings, on_init)
    }

    pub fn with_transport<F>(
        transport: Arc<dyn Transport>,
        settings: PluginSettings,
        on_init: F,
    ) -> Self
    where
        F: Fn(&Plugin, &OptionValues, &Config) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                transport,
                registry: Mutex::new(Registry::default()),
                state: Mutex::new(PluginState::Uninitialized),
                settings,
                on_init: Box::new(on_init),
            }),
        }
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.inner.settings
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn state_guard(&self) -> MutexGuard<'_, PluginState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a method with the transport and records its descriptor.
    ///
    /// # Errors
    ///
    /// [`PluginError::DuplicateName`] if the name is already live,
    /// [`PluginError::EmptyArgument`] for a blank name. Nothing is
    /// registered on either side when an error is returned.
    pub fn register_method(&self, method: MethodDescriptor) -> Result<(), PluginError> {
        let name = method.name().to_string();
        if name.trim().is_empty() {
            return Err(PluginError::EmptyArgument(EntryKind::Method));
        }
        let mut registry = self.registry();
        if registry.methods.contains(&name) {
            return Err(PluginError::duplicate(EntryKind::Method, &name));
        }
        self.inner.transport.register(&name, method.handler())?;
        registry.methods.insert(method)?;
        info!(method = %name, "registered method");
        Ok(())
    }

    /// Registers a typed method.
    pub fn register<M: RpcMethod>(&self) -> Result<(), PluginError> {
        self.register_method(MethodDescriptor::typed::<M>())
    }

    /// Removes a method from the registry and the transport.
    ///
    /// The transport removal is attempted even when the registry does not
    /// know the name; a failed transport removal is only logged.
    ///
    /// # Errors
    ///
    /// [`PluginError::NotFound`] if the registry did not know the name.
    pub fn unregister_method(&self, name: &str) -> Result<MethodDescriptor, PluginError> {
        let mut registry = self.registry();
        let removed = registry.methods.remove(name);
        if let Err(err) = self.inner.transport.unregister(name) {
            if removed.is_ok() {
                warn!(method = name, error = %err, "transport kept a method the registry dropped");
            } else {
                debug!(method = name, error = %err, "transport did not hold method");
            }
        }
        if removed.is_ok() {
            info!(method = name, "unregistered method");
        }
        removed
    }

    pub fn register_option(&self, option: PluginOption) -> Result<(), PluginError> {
        let name = option.name().to_string();
        self.registry().options.register(option)?;
        info!(option = %name, "registered option");
        Ok(())
    }

    pub fn unregister_option(&self, name: &str) -> Result<PluginOption, PluginError> {
        self.registry().options.unregister(name)
    }

    pub fn get_option(&self, name: &str) -> Option<PluginOption> {
        self.registry().options.get(name).cloned()
    }

    /// Current value of every registered option.
    pub fn option_values(&self) -> OptionValues {
        self.registry().options.snapshot_values()
    }

    /// Names of registered methods, built-ins included once started.
    pub fn method_names(&self) -> Vec<String> {
        self.registry()
            .methods
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    pub fn manifest(&self) -> Manifest {
        let registry = self.registry();
        Manifest::build(&registry.options, &registry.methods)
    }

    pub fn state(&self) -> PluginState {
        self.state_guard().clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state_guard().is_initialized()
    }

    /// Host configuration, once `init` has been received.
    pub fn config(&self) -> Option<Config> {
        self.state_guard().config().cloned()
    }

    /// Applies an `init` request and runs the user callback.
    ///
    /// No lock is held while the callback runs, so it may use the full
    /// plugin API, including registering further methods.
    pub fn handle_init(&self, request: InitRequest) {
        let values = {
            let mut registry = self.registry();
            apply_options(&mut registry.options, &request.options);
            registry.options.snapshot_values()
        };
        let previous = std::mem::replace(
            &mut *self.state_guard(),
            PluginState::Initialized {
                config: request.configuration.clone(),
            },
        );
        if previous.is_initialized() {
            warn!("init received again, configuration replaced");
        }
        info!(
            lightning_dir = %request.configuration.lightning_dir,
            rpc_file = %request.configuration.rpc_file,
            options = values.len(),
            "plugin initialized"
        );
        (self.inner.on_init)(self, &values, &request.configuration);
    }

    fn weak(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    fn manifest_method(&self) -> MethodDescriptor {
        let weak = self.weak();
        MethodDescriptor::new(GETMANIFEST, move |_params| {
            let plugin = upgrade(&weak)?;
            serde_json::to_value(plugin.manifest()).map_err(RpcError::internal)
        })
        .with_description("Generate manifest for plugin")
    }

    fn init_method(&self) -> MethodDescriptor {
        let weak = self.weak();
        MethodDescriptor::new(INIT, move |params| {
            let plugin = upgrade(&weak)?;
            let request: InitRequest =
                serde_json::from_value(params).map_err(RpcError::invalid_params)?;
            plugin.handle_init(request);
            // The host discards the init result.
            Ok(json!("ok"))
        })
        .with_description("Receive host configuration and option values")
    }

    fn register_builtins(&self) -> Result<(), PluginError> {
        self.register_method(self.manifest_method())?;
        if let Err(err) = self.register_method(self.init_method()) {
            if let Err(undo) = self.unregister_method(GETMANIFEST) {
                warn!(method = GETMANIFEST, error = %undo, "failed to roll back built-in");
            }
            return Err(err);
        }
        // Handshake requests are answered even without an id.
        self.inner.transport.reply_without_id(GETMANIFEST);
        self.inner.transport.reply_without_id(INIT);
        Ok(())
    }

    /// Runs the plugin until `input` is exhausted.
    ///
    /// The log sink is opened and installed before the built-in methods are
    /// registered and before the transport writes anything to `output`.
    ///
    /// # Errors
    ///
    /// [`PluginError::StartupIo`] if the log file cannot be opened,
    /// [`PluginError::DuplicateName`] if a built-in name was taken, or the
    /// transport's error if the loop fails. A failed start leaves the
    /// registered methods as they were.
    pub fn start<R, W>(&self, input: R, output: W) -> Result<(), PluginError>
    where
        R: Read,
        W: Write,
    {
        self.inner.settings.install_logging()?;
        self.register_builtins()?;
        info!(methods = self.registry().methods.len(), "plugin started");

        let mut input = BufReader::new(input);
        let mut output = BufWriter::new(output);
        let outcome = self.inner.transport.run(&mut input, &mut output);
        info!("host closed the connection, plugin stopping");
        outcome.map_err(PluginError::Transport)
    }
}

fn upgrade(weak: &Weak<Inner>) -> Result<Plugin, RpcError> {
    weak.upgrade()
        .map(|inner| Plugin { inner })
        .ok_or_else(|| RpcError::internal("plugin has shut down"))
}
