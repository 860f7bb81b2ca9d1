//! Parser and generator collaborators backed by external commands.
//!
//! A parser command receives the source on stdin and `--source-type
//! <script|module>` as its last argument, and prints the tree as JSON. A
//! generator command receives `{"tree": ..., "options": ...}` on stdin and
//! prints the generated source. A non-zero exit status is a tool failure.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use serde_json::json;

use crate::tree::{Node, SourceType};
use crate::verify::{GenerateOptions, SourceGenerator, SourceParser, ToolError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn run(&self, extra_args: &[&str], stdin: &[u8]) -> Result<String, ToolError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .args(extra_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| ToolError::new(format!("failed to start `{}`: {err}", self.program)))?;

        // Feed stdin from its own thread so a tool that streams output before
        // draining its input cannot block on a full pipe.
        let writer = child.stdin.take().map(|mut pipe| {
            let input = stdin.to_vec();
            thread::spawn(move || pipe.write_all(&input))
        });
        let output = child
            .wait_with_output()
            .map_err(|err| ToolError::new(format!("failed to wait for `{}`: {err}", self.program)))?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(err)) => {
                    return Err(ToolError::new(format!(
                        "failed to write to `{}`: {err}",
                        self.program
                    )));
                }
                Err(_) => {
                    return Err(ToolError::new(format!(
                        "stdin writer for `{}` panicked",
                        self.program
                    )));
                }
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(program = %self.program, status = %output.status, "tool reported failure");
            return Err(ToolError::new(stderr.trim().to_string()));
        }
        String::from_utf8(output.stdout)
            .map_err(|err| ToolError::new(format!("`{}` printed invalid UTF-8: {err}", self.program)))
    }
}

#[derive(Debug, Clone)]
pub struct CommandParser {
    command: ToolCommand,
}

impl CommandParser {
    pub fn new(command: ToolCommand) -> Self {
        Self { command }
    }
}

impl SourceParser for CommandParser {
    fn parse(&self, source: &str, source_type: SourceType) -> Result<Node, ToolError> {
        let stdout = self
            .command
            .run(&["--source-type", source_type.as_str()], source.as_bytes())?;
        Node::from_json_str(&stdout)
            .map_err(|err| ToolError::new(format!("parser output is not a tree: {err}")))
    }
}

#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: ToolCommand,
}

impl CommandGenerator {
    pub fn new(command: ToolCommand) -> Self {
        Self { command }
    }
}

impl SourceGenerator for CommandGenerator {
    fn generate(&self, tree: &Node, options: &GenerateOptions) -> Result<String, ToolError> {
        let request = json!({
            "tree": tree.to_json(),
            "options": options,
        });
        let body = serde_json::to_vec(&request)
            .map_err(|err| ToolError::new(format!("failed to encode generator request: {err}")))?;
        self.command.run(&[], &body)
    }
}
