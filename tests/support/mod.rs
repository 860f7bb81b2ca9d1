#![allow(dead_code)]

pub mod toy_grammar;

use std::fs;
use std::path::{Path, PathBuf};

use roundtrip::{Node, SourceParser, SourceType, TestCase, serialize};

use toy_grammar::ToyParser;

pub fn xfail_table_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("xfails")
        .join("pass.toml")
}

pub fn parse(src: &str) -> Node {
    ToyParser
        .parse(src, SourceType::Script)
        .expect("source should parse")
}

pub fn canonical(src: &str) -> String {
    serialize(&parse(src))
}

pub fn case(id: &str, actual: &str, explicit: &str) -> TestCase {
    let source_type = if id.ends_with(".module.js") {
        SourceType::Module
    } else {
        SourceType::Script
    };
    TestCase::new(id, actual, explicit, source_type)
}

/// Writes `pass/` and `pass-explicit/` under `root`.
pub fn write_corpus(root: &Path, cases: &[(&str, &str, &str)]) {
    fs::create_dir_all(root.join("pass")).expect("mkdir pass");
    fs::create_dir_all(root.join("pass-explicit")).expect("mkdir pass-explicit");
    for (id, actual, explicit) in cases {
        fs::write(root.join("pass").join(id), actual).expect("write actual");
        fs::write(root.join("pass-explicit").join(id), explicit).expect("write explicit");
    }
}
