use std::collections::BTreeMap;

use crate::normalize::normalize;
use crate::tree::{Node, Value, is_metadata_field, js_number_text};

/// Renders `tree` as a canonical string: normalized, metadata dropped, fields
/// in lexicographic order after the leading `type`. Two trees are
/// semantically equal iff their canonical strings are equal.
pub fn serialize(tree: &Node) -> String {
    let normalized = normalize(tree);
    let mut out = String::new();
    write_node(&mut out, &normalized);
    out
}

pub fn trees_equal(left: &Node, right: &Node) -> bool {
    serialize(left) == serialize(right)
}

fn write_node(out: &mut String, node: &Node) {
    out.push_str("{\"type\":");
    write_string(out, node.kind.as_str());
    for (name, value) in semantic_entries(&node.fields) {
        out.push(',');
        write_string(out, name);
        out.push(':');
        write_value(out, value);
    }
    out.push('}');
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&js_number_text(*n)),
        Value::String(s) => write_string(out, s),
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Map(map) => {
            out.push('{');
            for (i, (name, value)) in semantic_entries(map).enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, name);
                out.push(':');
                write_value(out, value);
            }
            out.push('}');
        }
        Value::Node(node) => write_node(out, node),
    }
}

fn semantic_entries(map: &BTreeMap<String, Value>) -> impl Iterator<Item = (&String, &Value)> {
    map.iter().filter(|(name, _)| !is_metadata_field(name))
}

fn write_string(out: &mut String, s: &str) {
    out.push_str(&serde_json::Value::from(s).to_string());
}
