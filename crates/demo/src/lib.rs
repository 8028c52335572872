//! Example plugin wired on top of `lnplugin`.

use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use lnplugin::{MethodDescriptor, Plugin, PluginOption, PluginSettings, RpcMethod};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

pub mod args;

pub const GREETING_OPTION: &str = "greeting";
const DEFAULT_GREETING: &str = "hello";

/// Repeats its `message` parameter.
#[derive(Debug, Deserialize)]
pub struct Echo {
    message: String,
}

impl RpcMethod for Echo {
    const NAME: &'static str = "echo";
    const DESCRIPTION: &'static str = "Repeats the given message";
    const PARAMS: &'static [&'static str] = &["message"];

    fn call(self) -> anyhow::Result<Value> {
        Ok(json!({ "message": self.message }))
    }
}

#[derive(Debug, Deserialize)]
struct GreetParams {
    #[serde(default)]
    name: Option<String>,
}

/// Builds the demo plugin with its methods and options registered.
pub fn build_plugin(settings: PluginSettings) -> Result<Plugin> {
    let greeting = Arc::new(RwLock::new(DEFAULT_GREETING.to_string()));

    let configured = Arc::clone(&greeting);
    let plugin = Plugin::with_settings(settings, move |_plugin, options, config| {
        if let Some(value) = options.get(GREETING_OPTION) {
            *configured
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = value.to_string();
        }
        info!(rpc = %config.rpc_path().display(), "demo plugin ready");
    });

    plugin.register_option(PluginOption::new(
        GREETING_OPTION,
        "Word used by `greet`",
        DEFAULT_GREETING,
    ))?;
    plugin.register_method(
        MethodDescriptor::new("ping", |_| Ok(json!("pong"))).with_description("replies pong"),
    )?;
    plugin.register_method(
        MethodDescriptor::new("greet", move |params: Value| {
            let params: GreetParams = if params.is_null() {
                GreetParams { name: None }
            } else {
                serde_json::from_value(params).map_err(lnplugin::RpcError::invalid_params)?
            };
            let word = greeting
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone();
            let name = params.name.as_deref().unwrap_or("world");
            Ok(json!(format!("{word} {name}")))
        })
        .with_description("Greets someone using the configured greeting")
        .with_param("name"),
    )?;
    plugin.register::<Echo>()?;
    Ok(plugin)
}

/// Serves the host over stdin/stdout until it disconnects.
pub fn run(cli: args::Cli) -> Result<()> {
    let settings = cli.resolve_settings()?;
    let plugin = build_plugin(settings)?;
    plugin
        .start(std::io::stdin().lock(), std::io::stdout().lock())
        .context("plugin failed")
}
