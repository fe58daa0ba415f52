//! Merge configuration (`dmerge.toml`).
//!
//! Selects the schema, the default strategy and per-tag strategies:
//!
//! ```toml
//! schema = "web-app"
//! default = "overwrite"
//!
//! [[tags]]
//! name = "jsp-config"
//! multiple = false
//!
//! [strategies]
//! servlet = "preserve"
//! context-param = { strategy = "choose-by-name", default = "overwrite", choices = { debug = "preserve" } }
//! filter = { strategy = "node-merge", file = "filter-template.xml" }
//! ```
//!
//! Strategy names are case-insensitive. Template files are resolved against
//! the directory of the configuration file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::merge::{
    BuiltinStrategy, ChooseByName, DescriptorMergerByTag, MergeStrategy, NodeMergeStrategy,
    StrictStrategy,
};
use crate::node::Element;
use crate::schema::{DescriptorSchema, DescriptorTag, Identifier};
use crate::xml::{parse_file, parse_str};

/// Strategy names understood by the configuration, besides the built-ins.
pub const STRATEGY_NAMES: &[&str] = &[
    "ignore",
    "overwrite",
    "preserve",
    "strict",
    "choose-by-name",
    "node-merge",
];

/// Top-level merge configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Preset schema name (`web-app`, `application`).
    #[serde(default)]
    pub schema: Option<String>,

    /// Strategy for tags without an entry in `strategies`.
    #[serde(default)]
    pub default: Option<StrategyEntry>,

    /// Extra tags, appended to the preset (or replacing a preset tag of the
    /// same name). Without a preset they form the whole schema.
    #[serde(default)]
    pub tags: Vec<TagConfig>,

    /// Strategy per tag name.
    #[serde(default)]
    pub strategies: BTreeMap<String, StrategyEntry>,

    /// Directory relative template paths resolve against.
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

/// An inline tag definition.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagConfig {
    pub name: String,

    /// Whether the tag may repeat (default: true).
    #[serde(default = "default_multiple")]
    pub multiple: bool,

    /// Identifier expression, e.g. `servlet-name` or `@id`.
    #[serde(default)]
    pub identifier: Option<String>,
}

const fn default_multiple() -> bool {
    true
}

/// A strategy given either by name or as a table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StrategyEntry {
    Name(String),
    Detailed(StrategyConfig),
}

/// A strategy with parameters.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    pub strategy: String,

    /// `choose-by-name`: fallback for unlisted identifiers.
    #[serde(default)]
    pub default: Option<Box<StrategyEntry>>,

    /// `choose-by-name`: strategy per identifier value.
    #[serde(default)]
    pub choices: BTreeMap<String, StrategyEntry>,

    /// `node-merge`: inline template element.
    #[serde(default)]
    pub template: Option<String>,

    /// `node-merge`: file holding the template element.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl StrategyEntry {
    fn config(&self) -> StrategyConfig {
        match self {
            StrategyEntry::Name(name) => StrategyConfig {
                strategy: name.clone(),
                default: None,
                choices: BTreeMap::new(),
                template: None,
                file: None,
            },
            StrategyEntry::Detailed(config) => config.clone(),
        }
    }
}

impl FromStr for MergeConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

impl MergeConfig {
    /// Loads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading merge configuration");
        let contents = std::fs::read_to_string(path)?;
        let mut config: MergeConfig = contents.parse()?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Sets the directory relative template paths resolve against.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Builds the configured schema.
    pub fn schema(&self) -> Result<DescriptorSchema> {
        let mut schema = match &self.schema {
            Some(name) => DescriptorSchema::preset(name)?,
            None if !self.tags.is_empty() => DescriptorSchema::new("custom"),
            None => {
                return Err(Error::Config(
                    "no schema: set `schema` or define `[[tags]]`".to_string(),
                ))
            }
        };
        for tag in &self.tags {
            schema.push_tag(tag.to_descriptor_tag()?);
        }
        Ok(schema)
    }

    /// Builds a tag merger with every configured strategy registered.
    pub fn build_merger(&self) -> Result<DescriptorMergerByTag> {
        let mut merger = DescriptorMergerByTag::new(self.schema()?);
        if let Some(default) = &self.default {
            merger.set_shared_default_strategy(self.build_strategy(default)?);
        }
        for (tag, entry) in &self.strategies {
            debug!(tag = %tag, "configuring strategy");
            merger.set_shared_strategy(tag.clone(), self.build_strategy(entry)?);
        }
        Ok(merger)
    }

    /// Turns a strategy entry into a strategy.
    pub fn build_strategy(&self, entry: &StrategyEntry) -> Result<Arc<dyn MergeStrategy>> {
        let config = entry.config();
        let name = config.strategy.trim().to_ascii_lowercase();
        let takes_choices = name == "choose-by-name";
        let takes_template = name == "node-merge";
        if !takes_choices && (config.default.is_some() || !config.choices.is_empty()) {
            return Err(Error::Config(format!(
                "strategy '{}' does not take `default` or `choices`",
                config.strategy
            )));
        }
        if !takes_template && (config.template.is_some() || config.file.is_some()) {
            return Err(Error::Config(format!(
                "strategy '{}' does not take `template` or `file`",
                config.strategy
            )));
        }

        match name.as_str() {
            "strict" => Ok(Arc::new(StrictStrategy)),
            "choose-by-name" => {
                let default: Arc<dyn MergeStrategy> = match &config.default {
                    Some(default) => self.build_strategy(default)?,
                    None => Arc::new(BuiltinStrategy::Overwrite),
                };
                let mut strategy = ChooseByName::new(default);
                for (key, choice) in &config.choices {
                    strategy = strategy.choice(key.clone(), self.build_strategy(choice)?);
                }
                Ok(Arc::new(strategy))
            }
            "node-merge" => Ok(Arc::new(NodeMergeStrategy::new(self.template(&config)?))),
            _ => match config.strategy.parse::<BuiltinStrategy>() {
                Ok(builtin) => Ok(Arc::new(builtin)),
                Err(_) => Err(Error::Config(format!(
                    "unknown merge strategy '{}' (expected one of: {})",
                    config.strategy,
                    STRATEGY_NAMES.join(", ")
                ))),
            },
        }
    }

    fn template(&self, config: &StrategyConfig) -> Result<Element> {
        let document = match (&config.template, &config.file) {
            (Some(inline), None) => parse_str(inline)?,
            (None, Some(file)) => {
                let path = match &self.base_dir {
                    Some(dir) if file.is_relative() => dir.join(file),
                    _ => file.clone(),
                };
                parse_file(path)?
            }
            _ => {
                return Err(Error::Config(
                    "node-merge needs exactly one of `template` or `file`".to_string(),
                ))
            }
        };
        Ok(document.into_root())
    }
}

impl TagConfig {
    /// Converts to a schema tag, parsing the identifier expression.
    pub fn to_descriptor_tag(&self) -> Result<DescriptorTag> {
        let tag = if self.multiple {
            DescriptorTag::repeatable(&self.name)
        } else {
            DescriptorTag::singleton(&self.name)
        };
        match &self.identifier {
            Some(expr) => Ok(tag.with_identifier(Identifier::parse(expr)?)),
            None => Ok(tag),
        }
    }
}
