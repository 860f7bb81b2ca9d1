use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canonical::serialize;
use crate::tree::{Node, SourceType};

/// How far a test case got through the round trip. Variants are ordered by
/// the stage that produces them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    ParseFailed,
    ParseExplicitFailed,
    ExplicitTreesNotEqual,
    GenerateFailed,
    GeneratedNotParsed,
    GeneratedTreesNotEqual,
    Success,
}

impl Outcome {
    pub const ALL: [Outcome; 7] = [
        Outcome::ParseFailed,
        Outcome::ParseExplicitFailed,
        Outcome::ExplicitTreesNotEqual,
        Outcome::GenerateFailed,
        Outcome::GeneratedNotParsed,
        Outcome::GeneratedTreesNotEqual,
        Outcome::Success,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Outcome::ParseFailed => "PARSE_FAILED",
            Outcome::ParseExplicitFailed => "PARSE_EXPLICIT_FAILED",
            Outcome::ExplicitTreesNotEqual => "EXPLICIT_TREES_NOT_EQUAL",
            Outcome::GenerateFailed => "GENERATE_FAILED",
            Outcome::GeneratedNotParsed => "GENERATED_NOT_PARSED",
            Outcome::GeneratedTreesNotEqual => "GENERATED_TREES_NOT_EQUAL",
            Outcome::Success => "SUCCESS",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Outcome::ParseFailed => "failed to parse",
            Outcome::ParseExplicitFailed => "explicit version failed to parse",
            Outcome::ExplicitTreesNotEqual => "explicit tree not equal to regular tree",
            Outcome::GenerateFailed => "failed to generate",
            Outcome::GeneratedNotParsed => "generated source failed to parse",
            Outcome::GeneratedTreesNotEqual => "generated tree differs from parsed tree",
            Outcome::Success => "success!",
        }
    }

    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::ALL
            .into_iter()
            .find(|outcome| outcome.code() == s)
            .ok_or_else(|| format!("unknown outcome code `{s}`"))
    }
}

/// Failure reported by a parser or generator collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait SourceParser {
    fn parse(&self, source: &str, source_type: SourceType) -> Result<Node, ToolError>;
}

pub trait SourceGenerator {
    fn generate(&self, tree: &Node, options: &GenerateOptions) -> Result<String, ToolError>;
}

impl<T: SourceParser + ?Sized> SourceParser for &T {
    fn parse(&self, source: &str, source_type: SourceType) -> Result<Node, ToolError> {
        (**self).parse(source, source_type)
    }
}

impl<T: SourceGenerator + ?Sized> SourceGenerator for &T {
    fn generate(&self, tree: &Node, options: &GenerateOptions) -> Result<String, ToolError> {
        (**self).generate(tree, options)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOptions {
    pub retain_lines: bool,
    pub retain_function_parens: bool,
    pub comments: bool,
    pub compact: bool,
}

impl GenerateOptions {
    /// Drops every kind of formatting fidelity and asks for the most compact
    /// output, so reparsing sees as little incidental formatting as possible.
    pub const ROUND_TRIP: GenerateOptions = GenerateOptions {
        retain_lines: false,
        retain_function_parens: false,
        comments: false,
        compact: true,
    };
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::ROUND_TRIP
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub id: String,
    pub actual: String,
    pub explicit: String,
    pub source_type: SourceType,
}

impl TestCase {
    pub fn new(
        id: impl Into<String>,
        actual: impl Into<String>,
        explicit: impl Into<String>,
        source_type: SourceType,
    ) -> Self {
        Self {
            id: id.into(),
            actual: actual.into(),
            explicit: explicit.into(),
            source_type,
        }
    }
}

/// Debugging material gathered for the stage that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailureReport {
    pub source: Option<String>,
    pub explicit_source: Option<String>,
    pub generated: Option<String>,
    pub expected_tree: Option<String>,
    pub actual_tree: Option<String>,
    pub tool_error: Option<String>,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("source", &self.source),
            ("explicit source", &self.explicit_source),
            ("generated", &self.generated),
            ("tool error", &self.tool_error),
            ("expected tree", &self.expected_tree),
            ("actual tree", &self.actual_tree),
        ];
        let mut first = true;
        for (title, body) in sections {
            let Some(body) = body else {
                continue;
            };
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "--- {title}")?;
            writeln!(f, "{body}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub outcome: Outcome,
    pub report: Option<FailureReport>,
}

pub struct Verifier<P, G> {
    parser: P,
    generator: G,
    options: GenerateOptions,
}

impl<P: SourceParser, G: SourceGenerator> Verifier<P, G> {
    pub fn new(parser: P, generator: G) -> Self {
        Self {
            parser,
            generator,
            options: GenerateOptions::ROUND_TRIP,
        }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn verify(&self, case: &TestCase) -> Outcome {
        self.run(case, false).outcome
    }

    /// Same protocol as [`Verifier::verify`], also collecting a report for
    /// the failing stage.
    pub fn verify_traced(&self, case: &TestCase) -> Verification {
        self.run(case, true)
    }

    fn run(&self, case: &TestCase, traced: bool) -> Verification {
        let fail = |outcome: Outcome, report: FailureReport| Verification {
            outcome,
            report: traced.then_some(report),
        };

        let actual_tree = match self.parser.parse(&case.actual, case.source_type) {
            Ok(tree) => tree,
            Err(err) => {
                return fail(
                    Outcome::ParseFailed,
                    FailureReport {
                        source: Some(case.actual.clone()),
                        tool_error: Some(err.message),
                        ..FailureReport::default()
                    },
                );
            }
        };

        let explicit_tree = match self.parser.parse(&case.explicit, case.source_type) {
            Ok(tree) => tree,
            Err(err) => {
                return fail(
                    Outcome::ParseExplicitFailed,
                    FailureReport {
                        explicit_source: Some(case.explicit.clone()),
                        tool_error: Some(err.message),
                        ..FailureReport::default()
                    },
                );
            }
        };

        let actual_canonical = serialize(&actual_tree);
        let explicit_canonical = serialize(&explicit_tree);
        if actual_canonical != explicit_canonical {
            return fail(
                Outcome::ExplicitTreesNotEqual,
                FailureReport {
                    source: Some(case.actual.clone()),
                    explicit_source: Some(case.explicit.clone()),
                    expected_tree: Some(actual_canonical),
                    actual_tree: Some(explicit_canonical),
                    ..FailureReport::default()
                },
            );
        }

        let generated = match self.generator.generate(&actual_tree, &self.options) {
            Ok(text) => text,
            Err(err) => {
                return fail(
                    Outcome::GenerateFailed,
                    FailureReport {
                        source: Some(case.actual.clone()),
                        tool_error: Some(err.message),
                        ..FailureReport::default()
                    },
                );
            }
        };

        let reparsed = match self.parser.parse(&generated, case.source_type) {
            Ok(tree) => tree,
            Err(err) => {
                return fail(
                    Outcome::GeneratedNotParsed,
                    FailureReport {
                        source: Some(case.actual.clone()),
                        generated: Some(generated),
                        tool_error: Some(err.message),
                        ..FailureReport::default()
                    },
                );
            }
        };

        let reparsed_canonical = serialize(&reparsed);
        if actual_canonical != reparsed_canonical {
            return fail(
                Outcome::GeneratedTreesNotEqual,
                FailureReport {
                    source: Some(case.actual.clone()),
                    generated: Some(generated),
                    expected_tree: Some(actual_canonical),
                    actual_tree: Some(reparsed_canonical),
                    ..FailureReport::default()
                },
            );
        }

        Verification {
            outcome: Outcome::Success,
            report: None,
        }
    }
}
