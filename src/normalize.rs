//! Canonical reshaping of syntax trees before comparison.
//!
//! Two rewrites erase representation choices a parser/generator pair may
//! make differently without changing meaning:
//!
//! - a `SequenceExpression` with three or more expressions becomes a
//!   left-nested chain of binary sequences (`a, b, c` => `(a, b), c`);
//! - a `NumericLiteral` key, or a non-computed, non-shorthand `Identifier`
//!   key, of an object property, object method or class method becomes a
//!   `StringLiteral` key (`{1: x}`, `{[1]: x}` and `{a: x}` => `{"1": x}`,
//!   `{["1"]: x}`, `{"a": x}`).
//!
//! Every other node is copied with its children normalized, so node kinds
//! without a rule are still walked.

use crate::tree::{Node, NodeKind, Value, js_number_text};

pub fn normalize(node: &Node) -> Node {
    let mut out = Node {
        kind: node.kind.clone(),
        span: node.span,
        fields: node
            .fields
            .iter()
            .map(|(name, value)| (name.clone(), normalize_value(value)))
            .collect(),
        meta: node.meta.clone(),
    };

    if out.kind == NodeKind::SequenceExpression {
        nest_sequence(&mut out);
    } else if out.kind.is_keyed_member() {
        canonicalize_key(&mut out);
    }
    out
}

pub fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Node(node) => Value::Node(normalize(node)),
        Value::List(items) => Value::List(items.iter().map(normalize_value).collect()),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(name, value)| (name.clone(), normalize_value(value)))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

fn nest_sequence(node: &mut Node) {
    let Some(Value::List(expressions)) = node.fields.get_mut("expressions") else {
        return;
    };
    if expressions.len() <= 2 {
        return;
    }

    let mut rest = std::mem::take(expressions).into_iter();
    let mut pair: Vec<Value> = rest.by_ref().take(2).collect();
    for next in rest {
        let inner = Node::new(NodeKind::SequenceExpression).with_field("expressions", pair);
        pair = vec![Value::Node(inner), next];
    }
    *expressions = pair;
}

fn canonicalize_key(node: &mut Node) {
    let plain = !node.flag("shorthand") && !node.flag("computed");
    let Some(key) = node.field_node("key") else {
        return;
    };

    let text = match &key.kind {
        NodeKind::NumericLiteral => key
            .field("value")
            .and_then(Value::as_number)
            .map(js_number_text),
        NodeKind::Identifier if plain => {
            key.field("name").and_then(Value::as_str).map(str::to_string)
        }
        _ => None,
    };

    if let Some(text) = text {
        let replacement = Node::new(NodeKind::StringLiteral).with_field("value", text);
        node.fields
            .insert("key".to_string(), Value::Node(replacement));
    }
}
