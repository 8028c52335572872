use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lnplugin::{LogSink, PluginSettings};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Example lightning plugin answering `ping`, `greet` and `echo` over stdin/stdout"
)]
pub struct Cli {
    /// TOML file with plugin settings
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Write logs to this file instead of the default sink
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Settings file if given, environment otherwise; `--log-file` wins over both.
    pub fn resolve_settings(&self) -> Result<PluginSettings> {
        let settings = match &self.settings {
            Some(path) => PluginSettings::load(path)?,
            None => PluginSettings::from_env(),
        };
        Ok(match &self.log_file {
            Some(path) => settings.with_log_sink(LogSink::File(path.clone())),
            None => settings,
        })
    }
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_flag_overrides_sink() {
        let cli = Cli::parse_from(["lnplugin-demo", "--log-file", "/tmp/demo.log"]);
        let settings = cli.resolve_settings().unwrap();
        assert_eq!(
            settings.log_sink,
            LogSink::File(PathBuf::from("/tmp/demo.log"))
        );
    }

    #[test]
    fn missing_settings_file_is_an_error() {
        let cli = Cli::parse_from(["lnplugin-demo", "--settings", "/nonexistent/settings.toml"]);
        assert!(cli.resolve_settings().is_err());
    }
}
