//! String-valued configuration options.
//!
//! Options are declared by the plugin before startup, advertised to the host
//! in the manifest, and assigned once the host sends `init`. Values travel as
//! strings; [`OptionValues::parse`] converts them on demand.

use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::{EntryKind, PluginError};

/// Description used when an option is registered without one.
pub const DEFAULT_OPTION_DESCRIPTION: &str = "A lightning plugin option.";

/// A named configuration knob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOption {
    name: String,
    default: String,
    description: String,
    value: Option<String>,
}

impl PluginOption {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            description: description.into(),
            value: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> &str {
        &self.default
    }

    pub fn description(&self) -> &str {
        if self.description.is_empty() {
            DEFAULT_OPTION_DESCRIPTION
        } else {
            &self.description
        }
    }

    /// Current value, or the default when the host never set one.
    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.default)
    }

    /// Returns `true` once the host has assigned a value.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }
}

/// Options keyed by name, in registration order.
#[derive(Debug, Default)]
pub struct OptionRegistry {
    options: IndexMap<String, PluginOption>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// [`PluginError::EmptyArgument`] for a blank name and
    /// [`PluginError::DuplicateName`] if the name is taken. The registry is
    /// left unchanged on error.
    pub fn register(&mut self, option: PluginOption) -> Result<(), PluginError> {
        if option.name.trim().is_empty() {
            return Err(PluginError::EmptyArgument(EntryKind::Option));
        }
        if self.options.contains_key(&option.name) {
            return Err(PluginError::duplicate(EntryKind::Option, &option.name));
        }
        self.options.insert(option.name.clone(), option);
        Ok(())
    }

    /// Removes and returns the option registered under `name`.
    pub fn unregister(&mut self, name: &str) -> Result<PluginOption, PluginError> {
        self.options
            .shift_remove(name)
            .ok_or_else(|| PluginError::not_found(EntryKind::Option, name))
    }

    pub fn get(&self, name: &str) -> Option<&PluginOption> {
        self.options.get(name)
    }

    /// Assigns `value` to the option named `name`.
    ///
    /// Returns `false` if no such option is registered.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.options.get_mut(name) {
            Some(option) => {
                option.set(value);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginOption> {
        self.options.values()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Current value of every option, keyed by name.
    pub fn snapshot_values(&self) -> OptionValues {
        OptionValues(
            self.options
                .values()
                .map(|o| (o.name.clone(), o.value().to_string()))
                .collect(),
        )
    }
}

/// Point-in-time copy of option values handed to user code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionValues(IndexMap<String, String>);

impl OptionValues {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Converts the value of `name` with [`FromStr`].
    ///
    /// Conversion failures are reported rather than replaced by a zero
    /// value, so callers decide whether a malformed value is fatal.
    pub fn parse<T>(&self, name: &str) -> Result<T, PluginError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self
            .get(name)
            .ok_or_else(|| PluginError::not_found(EntryKind::Option, name))?;
        value
            .trim()
            .parse()
            .map_err(|err: T::Err| PluginError::InvalidOptionValue {
                name: name.to_string(),
                value: value.to_string(),
                reason: err.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
