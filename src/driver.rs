use std::collections::BTreeSet;

use thiserror::Error;

use crate::corpus::{Corpus, CorpusError};
use crate::verify::{FailureReport, Outcome, SourceGenerator, SourceParser, Verifier};
use crate::xfail::{ExpectationError, Verdict, XfailRegistry, verify_with_expectations};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub expected_failures: usize,
}

/// First case whose outcome did not meet its expectation, with the report of
/// a traced re-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub error: ExpectationError,
    pub outcome: Outcome,
    pub report: Option<FailureReport>,
    pub summary: RunSummary,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{}", .0.error)]
    Unexpected(Box<RunFailure>),
    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

impl DriverError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unexpected(failure) => failure.error.code(),
            Self::Corpus(err) => err.code(),
        }
    }
}

pub struct Driver<'a, P, G> {
    corpus: &'a Corpus,
    verifier: &'a Verifier<P, G>,
    registry: &'a XfailRegistry,
}

impl<'a, P: SourceParser, G: SourceGenerator> Driver<'a, P, G> {
    pub fn new(
        corpus: &'a Corpus,
        verifier: &'a Verifier<P, G>,
        registry: &'a XfailRegistry,
    ) -> Self {
        Self {
            corpus,
            verifier,
            registry,
        }
    }

    /// Runs every case in the corpus in sorted order, or only the cases in
    /// `only`, in the order given, when it is non-empty.
    pub fn run(&self, only: &[String]) -> Result<RunSummary, DriverError> {
        if !only.is_empty() {
            let mut seen = BTreeSet::new();
            let picked = only.iter().filter(|id| seen.insert(*id));
            return self.run_cases(picked.map(String::as_str));
        }
        let ids = self.corpus.case_ids()?;
        for entry in self.registry.stale_entries(&ids) {
            tracing::warn!(case = %entry.id, expect = %entry.expect, "xfail entry matches no corpus case");
        }
        self.run_cases(ids.iter().map(String::as_str))
    }

    /// Runs cases in order and stops at the first unexpected result.
    pub fn run_cases<'i>(
        &self,
        ids: impl IntoIterator<Item = &'i str>,
    ) -> Result<RunSummary, DriverError> {
        let mut summary = RunSummary::default();
        for id in ids {
            let case = self.corpus.load_case(id)?;
            summary.total += 1;
            match verify_with_expectations(self.verifier, self.registry, &case) {
                Ok(Verdict::Passed) => {
                    summary.passed += 1;
                    tracing::debug!(case = id, "passed");
                }
                Ok(Verdict::ExpectedFailure(outcome)) => {
                    summary.expected_failures += 1;
                    tracing::debug!(case = id, %outcome, "failed as expected");
                }
                Err(error) => {
                    tracing::debug!(case = id, code = error.code(), "re-running traced");
                    let traced = self.verifier.verify_traced(&case);
                    return Err(DriverError::Unexpected(Box::new(RunFailure {
                        error,
                        outcome: traced.outcome,
                        report: traced.report,
                        summary,
                    })));
                }
            }
        }
        tracing::info!(
            total = summary.total,
            passed = summary.passed,
            expected_failures = summary.expected_failures,
            "round-trip run finished"
        );
        Ok(summary)
    }
}
