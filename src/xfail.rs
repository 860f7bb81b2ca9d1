//! Expected-failure bookkeeping.
//!
//! A registry maps case identifiers to the outcome a known, tracked defect
//! produces. Checking an outcome against it turns a matching failure into a
//! pass and reports regressions (different cause), untracked failures and
//! silently fixed cases (unexpected pass) as hard errors.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::verify::{Outcome, SourceGenerator, SourceParser, TestCase, Verifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XfailEntry {
    pub id: String,
    pub expect: Outcome,
    pub reason: Option<String>,
}

impl XfailEntry {
    pub fn new(id: impl Into<String>, expect: Outcome) -> Self {
        Self {
            id: id.into(),
            expect,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XfailRegistry {
    entries: BTreeMap<String, XfailEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XfailFile {
    #[serde(default)]
    xfail: Vec<XfailRow>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct XfailRow {
    id: String,
    expect: Outcome,
    #[serde(default)]
    reason: Option<String>,
}

impl XfailRegistry {
    pub fn new(entries: impl IntoIterator<Item = XfailEntry>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for (index, entry) in entries.into_iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(RegistryError::EmptyId { index });
            }
            if entry.expect.is_success() {
                return Err(RegistryError::ExpectsSuccess { id: entry.id });
            }
            if map.contains_key(&entry.id) {
                return Err(RegistryError::DuplicateId { id: entry.id });
            }
            map.insert(entry.id.clone(), entry);
        }
        Ok(Self { entries: map })
    }

    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, Outcome)>,
    ) -> Result<Self, RegistryError> {
        Self::new(
            pairs
                .into_iter()
                .map(|(id, expect)| XfailEntry::new(id, expect)),
        )
    }

    pub fn from_toml_str(src: &str) -> Result<Self, RegistryError> {
        let file: XfailFile =
            toml::from_str(src).map_err(|err| RegistryError::Syntax(err.to_string()))?;
        Self::new(file.xfail.into_iter().map(|row| XfailEntry {
            id: row.id,
            expect: row.expect,
            reason: row.reason,
        }))
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let body = fs::read_to_string(path).map_err(|err| RegistryError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::from_toml_str(&body)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&XfailEntry> {
        self.entries.get(id)
    }

    pub fn expected(&self, id: &str) -> Option<Outcome> {
        self.get(id).map(|entry| entry.expect)
    }

    pub fn entries(&self) -> impl Iterator<Item = &XfailEntry> {
        self.entries.values()
    }

    /// Entries naming cases that do not exist; they can never match.
    pub fn stale_entries<'a>(&'a self, known_ids: &BTreeSet<String>) -> Vec<&'a XfailEntry> {
        self.entries
            .values()
            .filter(|entry| !known_ids.contains(&entry.id))
            .collect()
    }

    pub fn check(&self, case_id: &str, outcome: Outcome) -> Result<Verdict, ExpectationError> {
        match (outcome, self.expected(case_id)) {
            (Outcome::Success, None) => Ok(Verdict::Passed),
            (Outcome::Success, Some(_)) => Err(ExpectationError::UnexpectedPass {
                case: case_id.to_string(),
            }),
            (got, None) => Err(ExpectationError::UnexpectedFailure {
                case: case_id.to_string(),
                got,
            }),
            (got, Some(want)) if got == want => Ok(Verdict::ExpectedFailure(got)),
            (got, Some(want)) => Err(ExpectationError::WrongCause {
                case: case_id.to_string(),
                got,
                want,
            }),
        }
    }
}

/// Result of a case that met its expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    ExpectedFailure(Outcome),
}

pub fn verify_with_expectations<P: SourceParser, G: SourceGenerator>(
    verifier: &Verifier<P, G>,
    registry: &XfailRegistry,
    case: &TestCase,
) -> Result<Verdict, ExpectationError> {
    registry.check(&case.id, verifier.verify(case))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpectationError {
    #[error("{case}: unexpectedly failed with cause {got}")]
    UnexpectedFailure { case: String, got: Outcome },
    #[error("{case}: failed as expected but wrong cause: got {got}, want {want}")]
    WrongCause {
        case: String,
        got: Outcome,
        want: Outcome,
    },
    #[error("{case}: unexpectedly passed")]
    UnexpectedPass { case: String },
}

impl ExpectationError {
    pub fn case(&self) -> &str {
        match self {
            Self::UnexpectedFailure { case, .. }
            | Self::WrongCause { case, .. }
            | Self::UnexpectedPass { case } => case,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::UnexpectedFailure { .. } => "E-UNEXPECTED-FAIL",
            Self::WrongCause { .. } => "E-WRONG-CAUSE",
            Self::UnexpectedPass { .. } => "E-UNEXPECTED-PASS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("xfail entry #{index} has an empty identifier")]
    EmptyId { index: usize },
    #[error("xfail entry `{id}` is listed more than once")]
    DuplicateId { id: String },
    #[error("xfail entry `{id}` expects SUCCESS; passing cases need no entry")]
    ExpectsSuccess { id: String },
    #[error("invalid xfail table: {0}")]
    Syntax(String),
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "E-IO",
            _ => "E-XFAIL-TABLE",
        }
    }
}
