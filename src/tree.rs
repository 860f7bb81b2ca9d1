use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Number, Value as JsonValue};
use thiserror::Error;

/// Keys that carry source positions or comment attachments. They are kept
/// on a node as metadata and never take part in tree comparison.
pub const METADATA_FIELDS: &[&str] = &[
    "start",
    "end",
    "extra",
    "loc",
    "leadingComments",
    "trailingComments",
    "innerComments",
    "comments",
];

pub fn is_metadata_field(name: &str) -> bool {
    METADATA_FIELDS.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// Parse goal of a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    Script,
    Module,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Module => "module",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    SequenceExpression,
    ObjectProperty,
    ObjectMethod,
    ClassMethod,
    NumericLiteral,
    StringLiteral,
    Identifier,
    Other(String),
}

impl NodeKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "SequenceExpression" => Self::SequenceExpression,
            "ObjectProperty" => Self::ObjectProperty,
            "ObjectMethod" => Self::ObjectMethod,
            "ClassMethod" => Self::ClassMethod,
            "NumericLiteral" => Self::NumericLiteral,
            "StringLiteral" => Self::StringLiteral,
            "Identifier" => Self::Identifier,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SequenceExpression => "SequenceExpression",
            Self::ObjectProperty => "ObjectProperty",
            Self::ObjectMethod => "ObjectMethod",
            Self::ClassMethod => "ClassMethod",
            Self::NumericLiteral => "NumericLiteral",
            Self::StringLiteral => "StringLiteral",
            Self::Identifier => "Identifier",
            Self::Other(name) => name,
        }
    }

    /// Object and class members whose `key` is subject to canonicalization.
    pub fn is_keyed_member(&self) -> bool {
        matches!(
            self,
            Self::ObjectProperty | Self::ObjectMethod | Self::ClassMethod
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    /// An untyped object such as a template element's `{ raw, cooked }`.
    Map(BTreeMap<String, Value>),
    Node(Node),
}

impl Value {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn from_json(json: &JsonValue) -> Result<Self, TreeError> {
        Ok(match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => Value::Number(n.as_f64().ok_or_else(|| {
                TreeError::UnrepresentableNumber {
                    text: n.to_string(),
                }
            })?),
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::List(
                items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            JsonValue::Object(map) if map.contains_key("type") => {
                Value::Node(Node::from_json_object(map)?)
            }
            JsonValue::Object(map) => Value::Map(
                map.iter()
                    .map(|(key, value)| Ok((key.clone(), Value::from_json(value)?)))
                    .collect::<Result<BTreeMap<_, _>, TreeError>>()?,
            ),
        })
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Node(node) => node.to_json(),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// A kind-tagged syntax tree node. Each node owns its children.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Option<Span>,
    pub fields: BTreeMap<String, Value>,
    pub meta: BTreeMap<String, Value>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            span: None,
            fields: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some(Span { start, end });
        self
    }

    pub fn with_meta(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_node(&self, name: &str) -> Option<&Node> {
        self.field(name).and_then(Value::as_node)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.field(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn from_json(json: &JsonValue) -> Result<Self, TreeError> {
        match json {
            JsonValue::Object(map) if map.contains_key("type") => Self::from_json_object(map),
            _ => Err(TreeError::RootNotNode),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, TreeError> {
        let json: JsonValue =
            serde_json::from_str(text).map_err(|err| TreeError::Json(err.to_string()))?;
        Self::from_json(&json)
    }

    fn from_json_object(map: &Map<String, JsonValue>) -> Result<Self, TreeError> {
        let kind = match map.get("type") {
            Some(JsonValue::String(name)) => NodeKind::from_name(name),
            _ => return Err(TreeError::NonStringType),
        };
        let mut node = Node::new(kind);
        let start = map.get("start").and_then(JsonValue::as_u64);
        let end = map.get("end").and_then(JsonValue::as_u64);
        if let (Some(start), Some(end)) = (start, end) {
            node.span = Some(Span {
                start: start as usize,
                end: end as usize,
            });
        }

        for (key, value) in map {
            if key == "type" {
                continue;
            }
            if (key == "start" || key == "end") && node.span.is_some() {
                continue;
            }
            let value = Value::from_json(value)?;
            if is_metadata_field(key) {
                node.meta.insert(key.clone(), value);
            } else {
                node.fields.insert(key.clone(), value);
            }
        }
        Ok(node)
    }

    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert(
            "type".to_string(),
            JsonValue::String(self.kind.as_str().to_string()),
        );
        if let Some(span) = self.span {
            map.insert("start".to_string(), JsonValue::from(span.start));
            map.insert("end".to_string(), JsonValue::from(span.end));
        }
        for (key, value) in self.meta.iter().chain(self.fields.iter()) {
            map.insert(key.clone(), value.to_json());
        }
        JsonValue::Object(map)
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return JsonValue::from(n as i64);
    }
    Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

/// Renders a number the way a JavaScript engine converts it to a string.
pub fn js_number_text(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let e = n - 1;
        let exp_sign = if e < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{lead}e{exp_sign}{}", e.abs())
        } else {
            format!("{lead}.{rest}e{exp_sign}{}", e.abs())
        }
    };
    format!("{sign}{body}")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("tree JSON is malformed: {0}")]
    Json(String),
    #[error("tree root must be an object with a \"type\" key")]
    RootNotNode,
    #[error("node \"type\" must be a string")]
    NonStringType,
    #[error("number {text} has no floating-point representation")]
    UnrepresentableNumber { text: String },
}
