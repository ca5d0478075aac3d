//! Shared configuration loader for the objxml toolchain.
//!
//! `defaults/objxml.default.toml` is embedded into every binary so that docs
//! and runtime behavior stay in sync. Applications layer user-specific files
//! on top of those defaults via [`Loader`] before deserializing into
//! [`ObjxmlConfig`], then convert the sections into the option types of
//! `objxml-core`.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use objxml_core::transform::{FileResolver, Params};
use objxml_core::{Encoding, Exclusions, RenderOptions, SerializerOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/objxml.default.toml");

/// Name of the optional per-project configuration file.
pub const PROJECT_CONFIG_FILE: &str = "objxml.toml";

/// Top-level configuration consumed by objxml applications.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjxmlConfig {
    pub serialize: SerializeConfig,
    pub render: RenderConfig,
    pub transform: TransformConfig,
}

/// Options of the tree serializer.
#[derive(Debug, Clone, Deserialize)]
pub struct SerializeConfig {
    pub root_tag_name: String,
    /// Entries of the form `Kind.relationship`.
    #[serde(default)]
    pub exclusions: Vec<String>,
}

impl SerializeConfig {
    pub fn exclusions(&self) -> Result<Exclusions, ConfigError> {
        self.exclusions
            .iter()
            .map(|entry| parse_exclusion(entry))
            .collect()
    }
}

impl TryFrom<&SerializeConfig> for SerializerOptions {
    type Error = ConfigError;

    fn try_from(config: &SerializeConfig) -> Result<Self, Self::Error> {
        Ok(SerializerOptions::default()
            .with_root_tag_name(config.root_tag_name.clone())
            .with_exclusions(config.exclusions()?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub encoding: String,
    pub pretty: bool,
}

impl TryFrom<&RenderConfig> for RenderOptions {
    type Error = ConfigError;

    fn try_from(config: &RenderConfig) -> Result<Self, Self::Error> {
        let encoding: Encoding = config
            .encoding
            .parse()
            .map_err(|e| ConfigError::Message(format!("render.encoding: {e}")))?;
        Ok(RenderOptions::new(encoding, config.pretty))
    }
}

/// Stylesheet lookup and parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct TransformConfig {
    /// Empty when absolute hrefs should be read unchanged.
    #[serde(default)]
    pub base_path: String,
    /// Entries of the form `name=value`.
    #[serde(default)]
    pub params: Vec<String>,
}

impl TransformConfig {
    pub fn base_path(&self) -> Option<PathBuf> {
        let trimmed = self.base_path.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    /// Configured parameters, passed to the stylesheet as strings.
    pub fn params(&self) -> Result<Params, ConfigError> {
        self.params.iter().map(|entry| parse_param(entry)).collect()
    }

    /// A filesystem resolver anchored at the configured base path.
    pub fn resolver(&self) -> std::io::Result<FileResolver> {
        let resolver = FileResolver::new()?;
        Ok(match self.base_path() {
            Some(base) => resolver.with_base_path(base),
            None => resolver,
        })
    }
}

impl ObjxmlConfig {
    pub fn serializer_options(&self) -> Result<SerializerOptions, ConfigError> {
        SerializerOptions::try_from(&self.serialize)
    }

    pub fn render_options(&self) -> Result<RenderOptions, ConfigError> {
        RenderOptions::try_from(&self.render)
    }
}

/// Parse an exclusion written as `Kind.relationship`.
pub fn parse_exclusion(entry: &str) -> Result<(String, String), ConfigError> {
    let invalid = || {
        ConfigError::Message(format!(
            "invalid exclusion '{entry}': expected 'Kind.relationship'"
        ))
    };
    let (kind, relationship) = entry.trim().split_once('.').ok_or_else(invalid)?;
    if kind.is_empty() || relationship.is_empty() || relationship.contains('.') {
        return Err(invalid());
    }
    Ok((kind.to_string(), relationship.to_string()))
}

/// Parse a stylesheet parameter written as `name=value`. Only the first `=`
/// separates; the value may be empty.
pub fn parse_param(entry: &str) -> Result<(String, String), ConfigError> {
    match entry.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::Message(format!(
            "invalid parameter '{entry}': expected 'name=value'"
        ))),
    }
}

/// Builds an [`ObjxmlConfig`] from the embedded defaults plus whatever
/// project files and flag overrides the caller layers on.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start from `defaults/objxml.default.toml`.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer an `objxml.toml` given explicitly, e.g. through `--config`.
    /// The file must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer the project file from the working directory, if there is one.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Override one dotted key such as `render.encoding`. Overrides win over
    /// every file.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge the layers into an [`ObjxmlConfig`]. Section values are only
    /// checked later, by the conversions into core options.
    pub fn build(self) -> Result<ObjxmlConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The built-in settings, with nothing layered on top.
pub fn load_defaults() -> Result<ObjxmlConfig, ConfigError> {
    Loader::new().build()
}
