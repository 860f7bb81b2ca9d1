use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::corpus::{
    CorpusLayout, DEFAULT_ACTUAL_DIR, DEFAULT_EXPLICIT_DIR, DEFAULT_MODULE_PATTERN,
};
use crate::external::ToolCommand;

pub const DEFAULT_CONFIG_FILENAME: &str = "roundtrip.toml";

pub const CONFIG_TEMPLATE: &str = r#"version = 1

[corpus]
root = "test262-parser-tests"
actual_dir = "pass"
explicit_dir = "pass-explicit"
include = ["*.js"]
module_pattern = '\.module\.js$'

[parser]
# Reads source on stdin, receives `--source-type script|module`, prints the tree as JSON.
command = ["node", "tools/parse.js"]

[generator]
# Reads {"tree": ..., "options": ...} on stdin, prints generated source.
command = ["node", "tools/generate.js"]

[xfail]
path = "xfails/pass.toml"
"#;

#[derive(Debug, Clone)]
pub struct Config {
    pub corpus: CorpusLayout,
    pub parser: ToolCommand,
    pub generator: ToolCommand,
    pub xfail_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    version: u32,
    corpus: CorpusSection,
    parser: ToolSection,
    generator: ToolSection,
    #[serde(default)]
    xfail: Option<XfailSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CorpusSection {
    root: PathBuf,
    #[serde(default = "default_actual_dir")]
    actual_dir: String,
    #[serde(default = "default_explicit_dir")]
    explicit_dir: String,
    #[serde(default = "default_include")]
    include: Vec<String>,
    #[serde(default = "default_module_pattern")]
    module_pattern: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolSection {
    command: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XfailSection {
    path: PathBuf,
}

fn default_actual_dir() -> String {
    DEFAULT_ACTUAL_DIR.to_string()
}

fn default_explicit_dir() -> String {
    DEFAULT_EXPLICIT_DIR.to_string()
}

fn default_include() -> Vec<String> {
    vec!["*.js".to_string()]
}

fn default_module_pattern() -> String {
    DEFAULT_MODULE_PATTERN.to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
                template: CONFIG_TEMPLATE.to_string(),
            });
        }
        let body = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&body, base)
    }

    /// Parses a configuration whose relative paths resolve against `base`.
    pub fn from_toml_str(body: &str, base: &Path) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(body).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        if file.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                file.version
            )));
        }

        let parser = ToolCommand::from_argv(&file.parser.command)
            .ok_or_else(|| ConfigError::Invalid("parser.command must not be empty".to_string()))?;
        let generator = ToolCommand::from_argv(&file.generator.command).ok_or_else(|| {
            ConfigError::Invalid("generator.command must not be empty".to_string())
        })?;

        Ok(Self {
            corpus: CorpusLayout {
                root: base.join(file.corpus.root),
                actual_dir: file.corpus.actual_dir,
                explicit_dir: file.corpus.explicit_dir,
                include: file.corpus.include,
                module_pattern: file.corpus.module_pattern,
            },
            parser,
            generator,
            xfail_path: file.xfail.map(|section| base.join(section.path)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("config file {} not found", path.display())]
    Missing { path: PathBuf, template: String },
    #[error("failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "E-IO",
            _ => "E-CONFIG",
        }
    }
}
