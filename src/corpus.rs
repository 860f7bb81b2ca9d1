use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use thiserror::Error;

use crate::tree::SourceType;
use crate::verify::TestCase;

pub const DEFAULT_ACTUAL_DIR: &str = "pass";
pub const DEFAULT_EXPLICIT_DIR: &str = "pass-explicit";
pub const DEFAULT_MODULE_PATTERN: &str = r"\.module\.js$";

/// Two parallel directories of sources sharing file names: the cases as
/// written, and an explicit rewrite of each one.
#[derive(Debug, Clone)]
pub struct Corpus {
    actual_dir: PathBuf,
    explicit_dir: PathBuf,
    include: GlobSet,
    module_pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct CorpusLayout {
    pub root: PathBuf,
    pub actual_dir: String,
    pub explicit_dir: String,
    pub include: Vec<String>,
    pub module_pattern: String,
}

impl CorpusLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            actual_dir: DEFAULT_ACTUAL_DIR.to_string(),
            explicit_dir: DEFAULT_EXPLICIT_DIR.to_string(),
            include: vec!["*.js".to_string()],
            module_pattern: DEFAULT_MODULE_PATTERN.to_string(),
        }
    }
}

impl Corpus {
    pub fn open(layout: &CorpusLayout) -> Result<Self, CorpusError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &layout.include {
            let glob = Glob::new(pattern).map_err(|err| CorpusError::Pattern {
                pattern: pattern.clone(),
                message: err.to_string(),
            })?;
            builder.add(glob);
        }
        let include = builder.build().map_err(|err| CorpusError::Pattern {
            pattern: layout.include.join(", "),
            message: err.to_string(),
        })?;
        let module_pattern =
            Regex::new(&layout.module_pattern).map_err(|err| CorpusError::Pattern {
                pattern: layout.module_pattern.clone(),
                message: err.to_string(),
            })?;

        let actual_dir = layout.root.join(&layout.actual_dir);
        if !actual_dir.is_dir() {
            return Err(CorpusError::MissingDir { path: actual_dir });
        }
        let explicit_dir = layout.root.join(&layout.explicit_dir);
        if !explicit_dir.is_dir() {
            return Err(CorpusError::MissingDir { path: explicit_dir });
        }

        Ok(Self {
            actual_dir,
            explicit_dir,
            include,
            module_pattern,
        })
    }

    pub fn source_type_for(&self, id: &str) -> SourceType {
        if self.module_pattern.is_match(id) {
            SourceType::Module
        } else {
            SourceType::Script
        }
    }

    /// Case identifiers in lexicographic order.
    pub fn case_ids(&self) -> Result<BTreeSet<String>, CorpusError> {
        let entries = fs::read_dir(&self.actual_dir).map_err(|err| io_error(&self.actual_dir, err))?;
        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|err| io_error(&self.actual_dir, err))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if self.include.is_match(name) {
                ids.insert(name.to_string());
            }
        }
        Ok(ids)
    }

    pub fn load_case(&self, id: &str) -> Result<TestCase, CorpusError> {
        let actual = read_source(&self.actual_dir.join(id))?;
        let explicit_path = self.explicit_dir.join(id);
        if !explicit_path.is_file() {
            return Err(CorpusError::MissingExplicit {
                id: id.to_string(),
                path: explicit_path,
            });
        }
        let explicit = read_source(&explicit_path)?;
        Ok(TestCase::new(id, actual, explicit, self.source_type_for(id)))
    }
}

fn read_source(path: &Path) -> Result<String, CorpusError> {
    fs::read_to_string(path).map_err(|err| io_error(path, err))
}

fn io_error(path: &Path, err: std::io::Error) -> CorpusError {
    CorpusError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorpusError {
    #[error("corpus directory {} does not exist", path.display())]
    MissingDir { path: PathBuf },
    #[error("case `{id}` has no explicit variant at {}", path.display())]
    MissingExplicit { id: String, path: PathBuf },
    #[error("invalid pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
    #[error("failed to read {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl CorpusError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pattern { .. } => "E-CONFIG",
            _ => "E-IO",
        }
    }
}
