//! Building blocks for lightning node plugins.
//!
//! A plugin is a child process that talks JSON-RPC with its host over
//! stdin/stdout. Before normal operation the host performs a two-step
//! handshake: `getmanifest` asks which methods and options the plugin
//! offers, then `init` hands over option values and the host configuration.
//! [`Plugin`] implements both steps on top of a [`jrpc::Transport`].
//!
//! ```ignore
//! let plugin = Plugin::new(|_plugin, _options, config| {
//!     tracing::info!(rpc = %config.rpc_path().display(), "ready");
//! });
//! plugin.register_method(
//!     MethodDescriptor::new("ping", |_| Ok(json!("pong"))).with_description("replies pong"),
//! )?;
//! plugin.start(std::io::stdin(), std::io::stdout())?;
//! ```

mod error;
pub mod init;
pub mod manifest;
pub mod method;
pub mod options;
pub mod plugin;
pub mod settings;

pub use error::{EntryKind, PluginError};
pub use init::{Config, InitRequest, PluginState};
pub use manifest::{is_builtin, Manifest, MethodSpec, OptionSpec, GETMANIFEST, INIT};
pub use method::{MethodDescriptor, MethodRegistry, RpcMethod, DEFAULT_METHOD_DESCRIPTION};
pub use options::{OptionRegistry, OptionValues, PluginOption, DEFAULT_OPTION_DESCRIPTION};
pub use plugin::{InitCallback, Plugin};
pub use settings::{LogSink, PluginSettings, DEFAULT_LOG_FILE, HOST_MARKER_ENV};

pub use jrpc::{Handler, RpcError, Transport};
