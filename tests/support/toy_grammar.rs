//! A tiny expression-statement language standing in for the external parser
//! and generator. Trees follow the Babel node shapes the normalizer knows.
//!
//! ```text
//! program  := (expr ";")*
//! expr     := operand ("," operand)*
//! operand  := NUMBER | STRING | IDENT | "(" expr ")" | object
//! object   := "{" (prop ("," prop)*)? "}"
//! prop     := (IDENT | NUMBER | STRING) ":" operand | IDENT | "[" expr "]" ":" operand
//! ```
//!
//! `await` is reserved in module code. `//` comments run to end of line.

use std::cell::RefCell;
use std::collections::BTreeMap;

use roundtrip::tree::js_number_text;
use roundtrip::{
    GenerateOptions, Node, NodeKind, SourceGenerator, SourceParser, SourceType, ToolError, Value,
};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64, String),
    Str(String, String),
    Ident(String),
    Punct(char),
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToyParser;

impl SourceParser for ToyParser {
    fn parse(&self, source: &str, source_type: SourceType) -> Result<Node, ToolError> {
        let (tokens, comments) = lex(source)?;
        let mut cursor = Cursor {
            tokens,
            pos: 0,
            source_type,
        };
        let mut body = Vec::new();
        while !cursor.at_end() {
            let start = cursor.offset();
            let expression = cursor.expression()?;
            cursor.expect(';')?;
            body.push(Value::Node(
                Node::new(NodeKind::Other("ExpressionStatement".to_string()))
                    .with_field("expression", expression)
                    .with_span(start, cursor.prev_end()),
            ));
        }
        let mut program = Node::new(NodeKind::Other("Program".to_string()))
            .with_field("body", body)
            .with_field("sourceType", source_type.as_str())
            .with_span(0, source.len());
        if !comments.is_empty() {
            program = program.with_meta("comments", comments);
        }
        Ok(program)
    }
}

fn lex(source: &str) -> Result<(Vec<Token>, Vec<Value>), ToolError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut i = 0usize;
    let offset_at = |i: usize| chars.get(i).map(|(o, _)| *o).unwrap_or(source.len());

    while i < chars.len() {
        let (start, ch) = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }
        if ch == '/' && chars.get(i + 1).map(|(_, c)| *c) == Some('/') {
            let mut j = i + 2;
            while j < chars.len() && chars[j].1 != '\n' {
                j += 1;
            }
            let text = &source[offset_at(i + 2)..offset_at(j)];
            comments.push(Value::Node(
                Node::new(NodeKind::Other("CommentLine".to_string()))
                    .with_field("value", text)
                    .with_span(start, offset_at(j)),
            ));
            i = j;
            continue;
        }
        if ch.is_ascii_digit() {
            let mut j = i;
            while j < chars.len() && chars[j].1.is_ascii_digit() {
                j += 1;
            }
            if j + 1 < chars.len() && chars[j].1 == '.' && chars[j + 1].1.is_ascii_digit() {
                j += 1;
                while j < chars.len() && chars[j].1.is_ascii_digit() {
                    j += 1;
                }
            }
            let raw = &source[start..offset_at(j)];
            let value: f64 = raw
                .parse()
                .map_err(|_| ToolError::new(format!("bad number `{raw}` at {start}")))?;
            tokens.push(Token {
                tok: Tok::Num(value, raw.to_string()),
                start,
                end: offset_at(j),
            });
            i = j;
            continue;
        }
        if ch == '"' || ch == '\'' {
            let mut j = i + 1;
            let mut value = String::new();
            loop {
                let Some((_, c)) = chars.get(j).copied() else {
                    return Err(ToolError::new(format!("unterminated string at {start}")));
                };
                if c == ch {
                    break;
                }
                if c == '\\' {
                    let Some((_, escaped)) = chars.get(j + 1).copied() else {
                        return Err(ToolError::new(format!("unterminated string at {start}")));
                    };
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    j += 2;
                    continue;
                }
                value.push(c);
                j += 1;
            }
            let end = offset_at(j + 1);
            tokens.push(Token {
                tok: Tok::Str(value, source[start..end].to_string()),
                start,
                end,
            });
            i = j + 1;
            continue;
        }
        if ch.is_ascii_alphabetic() || ch == '_' || ch == '$' {
            let mut j = i;
            while j < chars.len()
                && (chars[j].1.is_ascii_alphanumeric() || chars[j].1 == '_' || chars[j].1 == '$')
            {
                j += 1;
            }
            tokens.push(Token {
                tok: Tok::Ident(source[start..offset_at(j)].to_string()),
                start,
                end: offset_at(j),
            });
            i = j;
            continue;
        }
        if "(){}[],:;".contains(ch) {
            tokens.push(Token {
                tok: Tok::Punct(ch),
                start,
                end: start + ch.len_utf8(),
            });
            i += 1;
            continue;
        }
        return Err(ToolError::new(format!(
            "unexpected character `{ch}` at {start}"
        )));
    }
    Ok((tokens, comments))
}

struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    source_type: SourceType,
}

impl Cursor {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn peek_second(&self) -> Option<&Tok> {
        self.tokens.get(self.pos + 1).map(|t| &t.tok)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.start).unwrap_or(0)
    }

    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|p| self.tokens.get(p))
            .map(|t| t.end)
            .unwrap_or(0)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, punct: char) -> bool {
        if self.peek() == Some(&Tok::Punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: char) -> Result<(), ToolError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(ToolError::new(format!(
                "expected `{punct}` at {}",
                self.offset()
            )))
        }
    }

    fn expression(&mut self) -> Result<Node, ToolError> {
        let start = self.offset();
        let first = self.operand()?;
        if self.peek() != Some(&Tok::Punct(',')) {
            return Ok(first);
        }
        let mut expressions = vec![Value::Node(first)];
        while self.eat(',') {
            expressions.push(Value::Node(self.operand()?));
        }
        Ok(Node::new(NodeKind::SequenceExpression)
            .with_field("expressions", expressions)
            .with_span(start, self.prev_end()))
    }

    fn identifier(&self, name: String, start: usize, end: usize) -> Result<Node, ToolError> {
        if self.source_type == SourceType::Module && name == "await" {
            return Err(ToolError::new(format!(
                "`await` is reserved in module code at {start}"
            )));
        }
        Ok(Node::new(NodeKind::Identifier)
            .with_field("name", name)
            .with_span(start, end))
    }

    fn operand(&mut self) -> Result<Node, ToolError> {
        let Some(token) = self.bump() else {
            return Err(ToolError::new("unexpected end of input"));
        };
        match token.tok {
            Tok::Num(value, raw) => Ok(numeric(value, raw, token.start, token.end)),
            Tok::Str(value, raw) => Ok(string(value, raw, token.start, token.end)),
            Tok::Ident(name) => self.identifier(name, token.start, token.end),
            Tok::Punct('(') => {
                let mut inner = self.expression()?;
                self.expect(')')?;
                mark_parenthesized(&mut inner);
                Ok(inner)
            }
            Tok::Punct('{') => self.object(token.start),
            Tok::Punct(other) => Err(ToolError::new(format!(
                "unexpected `{other}` at {}",
                token.start
            ))),
        }
    }

    fn object(&mut self, start: usize) -> Result<Node, ToolError> {
        let mut properties = Vec::new();
        if !self.eat('}') {
            loop {
                properties.push(Value::Node(self.property()?));
                if self.eat('}') {
                    break;
                }
                self.expect(',')?;
            }
        }
        Ok(Node::new(NodeKind::Other("ObjectExpression".to_string()))
            .with_field("properties", properties)
            .with_span(start, self.prev_end()))
    }

    fn property(&mut self) -> Result<Node, ToolError> {
        let start = self.offset();
        if self.eat('[') {
            let key = self.expression()?;
            self.expect(']')?;
            self.expect(':')?;
            let value = self.operand()?;
            return Ok(property(key, value, true, false).with_span(start, self.prev_end()));
        }

        let shorthand = matches!(self.peek(), Some(Tok::Ident(_)))
            && self.peek_second() != Some(&Tok::Punct(':'));
        let Some(token) = self.bump() else {
            return Err(ToolError::new("unexpected end of input in object"));
        };
        let key = match token.tok {
            Tok::Ident(name) => self.identifier(name, token.start, token.end)?,
            Tok::Num(value, raw) => numeric(value, raw, token.start, token.end),
            Tok::Str(value, raw) => string(value, raw, token.start, token.end),
            Tok::Punct(other) => {
                return Err(ToolError::new(format!(
                    "unexpected `{other}` in object at {}",
                    token.start
                )));
            }
        };
        if shorthand {
            let value = key.clone();
            return Ok(property(key, value, false, true).with_span(start, self.prev_end()));
        }
        self.expect(':')?;
        let value = self.operand()?;
        Ok(property(key, value, false, false).with_span(start, self.prev_end()))
    }
}

fn numeric(value: f64, raw: String, start: usize, end: usize) -> Node {
    Node::new(NodeKind::NumericLiteral)
        .with_field("value", value)
        .with_meta("extra", extra_raw(raw))
        .with_span(start, end)
}

fn string(value: String, raw: String, start: usize, end: usize) -> Node {
    Node::new(NodeKind::StringLiteral)
        .with_field("value", value)
        .with_meta("extra", extra_raw(raw))
        .with_span(start, end)
}

fn extra_raw(raw: String) -> Value {
    Value::Map(BTreeMap::from([("raw".to_string(), Value::String(raw))]))
}

fn property(key: Node, value: Node, computed: bool, shorthand: bool) -> Node {
    Node::new(NodeKind::ObjectProperty)
        .with_field("key", key)
        .with_field("value", value)
        .with_field("computed", computed)
        .with_field("shorthand", shorthand)
}

fn mark_parenthesized(node: &mut Node) {
    match node.meta.get_mut("extra") {
        Some(Value::Map(extra)) => {
            extra.insert("parenthesized".to_string(), Value::Bool(true));
        }
        _ => {
            node.meta.insert(
                "extra".to_string(),
                Value::Map(BTreeMap::from([(
                    "parenthesized".to_string(),
                    Value::Bool(true),
                )])),
            );
        }
    }
}

/// Deliberate generator bugs used to drive each verification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorDefect {
    /// `{a}` is printed as `{a:a}`.
    ExpandShorthand,
    /// `{1:x}` is printed as `{"1":x}`.
    QuoteNumericKeys,
    /// Nested sequences are printed without parentheses.
    FlattenSequences,
    /// A stray `)` is appended to the output.
    TrailingParen,
    /// Object literals cannot be generated at all.
    RejectObjects,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToyGenerator {
    pub defect: Option<GeneratorDefect>,
}

impl ToyGenerator {
    pub fn with_defect(defect: GeneratorDefect) -> Self {
        Self {
            defect: Some(defect),
        }
    }

    fn has(&self, defect: GeneratorDefect) -> bool {
        self.defect == Some(defect)
    }

    fn expression(&self, node: &Node, nested: bool, out: &mut String) -> Result<(), ToolError> {
        match &node.kind {
            NodeKind::SequenceExpression => {
                let items = node
                    .field("expressions")
                    .and_then(Value::as_list)
                    .ok_or_else(|| ToolError::new("sequence without expressions"))?;
                if nested {
                    out.push('(');
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let child = expect_node(item)?;
                    let wrap = child.kind == NodeKind::SequenceExpression
                        && !self.has(GeneratorDefect::FlattenSequences);
                    self.expression(child, wrap, out)?;
                }
                if nested {
                    out.push(')');
                }
            }
            NodeKind::Identifier => out.push_str(text_field(node, "name")?),
            NodeKind::StringLiteral => push_quoted(out, text_field(node, "value")?),
            NodeKind::NumericLiteral => {
                let value = node
                    .field("value")
                    .and_then(Value::as_number)
                    .ok_or_else(|| ToolError::new("numeric literal without value"))?;
                out.push_str(&js_number_text(value));
            }
            NodeKind::Other(name) if name == "ObjectExpression" => self.object(node, out)?,
            other => {
                return Err(ToolError::new(format!("cannot generate {other}")));
            }
        }
        Ok(())
    }

    fn object(&self, node: &Node, out: &mut String) -> Result<(), ToolError> {
        if self.has(GeneratorDefect::RejectObjects) {
            return Err(ToolError::new("object literals are not supported"));
        }
        let properties = node
            .field("properties")
            .and_then(Value::as_list)
            .ok_or_else(|| ToolError::new("object without properties"))?;
        out.push('{');
        for (i, prop) in properties.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let prop = expect_node(prop)?;
            let key = prop
                .field_node("key")
                .ok_or_else(|| ToolError::new("property without key"))?;
            let value = prop
                .field_node("value")
                .ok_or_else(|| ToolError::new("property without value"))?;

            if prop.flag("shorthand") && !self.has(GeneratorDefect::ExpandShorthand) {
                self.expression(key, false, out)?;
                continue;
            }
            if prop.flag("computed") {
                out.push('[');
                self.expression(key, false, out)?;
                out.push(']');
            } else if key.kind == NodeKind::NumericLiteral
                && self.has(GeneratorDefect::QuoteNumericKeys)
            {
                let value = key.field("value").and_then(Value::as_number).unwrap_or(0.0);
                push_quoted(out, &js_number_text(value));
            } else {
                self.expression(key, false, out)?;
            }
            out.push(':');
            self.expression(value, true, out)?;
        }
        out.push('}');
        Ok(())
    }
}

impl SourceGenerator for ToyGenerator {
    fn generate(&self, tree: &Node, options: &GenerateOptions) -> Result<String, ToolError> {
        let body = tree
            .field("body")
            .and_then(Value::as_list)
            .ok_or_else(|| ToolError::new("program without body"))?;
        let mut out = String::new();
        for statement in body {
            let statement = expect_node(statement)?;
            let expression = statement
                .field_node("expression")
                .ok_or_else(|| ToolError::new("statement without expression"))?;
            self.expression(expression, false, &mut out)?;
            out.push(';');
            if !options.compact {
                out.push('\n');
            }
        }
        if self.has(GeneratorDefect::TrailingParen) {
            out.push(')');
        }
        Ok(out)
    }
}

fn expect_node(value: &Value) -> Result<&Node, ToolError> {
    value
        .as_node()
        .ok_or_else(|| ToolError::new("expected a node"))
}

fn text_field<'a>(node: &'a Node, name: &str) -> Result<&'a str, ToolError> {
    node.field(name)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::new(format!("{} without {name}", node.kind)))
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Wraps a parser and remembers the goal of every call.
#[derive(Debug, Default)]
pub struct RecordingParser {
    pub goals: RefCell<Vec<SourceType>>,
}

impl SourceParser for RecordingParser {
    fn parse(&self, source: &str, source_type: SourceType) -> Result<Node, ToolError> {
        self.goals.borrow_mut().push(source_type);
        ToyParser.parse(source, source_type)
    }
}
