pub mod canonical;
pub mod config;
pub mod corpus;
pub mod diagnostics;
pub mod driver;
pub mod external;
pub mod normalize;
pub mod tree;
pub mod verify;
pub mod xfail;

pub use canonical::{serialize, trees_equal};
pub use config::{CONFIG_TEMPLATE, Config, ConfigError, DEFAULT_CONFIG_FILENAME};
pub use corpus::{Corpus, CorpusError, CorpusLayout};
pub use diagnostics::Diagnostic;
pub use driver::{Driver, DriverError, RunFailure, RunSummary};
pub use external::{CommandGenerator, CommandParser, ToolCommand};
pub use normalize::normalize;
pub use tree::{Node, NodeKind, SourceType, Span, TreeError, Value};
pub use verify::{
    FailureReport, GenerateOptions, Outcome, SourceGenerator, SourceParser, TestCase, ToolError,
    Verification, Verifier,
};
pub use xfail::{
    ExpectationError, RegistryError, Verdict, XfailEntry, XfailRegistry, verify_with_expectations,
};
