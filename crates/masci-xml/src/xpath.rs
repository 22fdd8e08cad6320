// masci-xml - schema-driven editing of FLEUR input files
//
// Copyright (c) 2025 masci-xml contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! XPath evaluation over [`XmlTree`].
//!
//! Supports the subset of XPath 1.0 produced by the path builder and used by
//! the setters:
//!
//! - absolute and relative location paths, `//`, `.`, `..`, `*`
//! - attribute steps (`@name`, `@*`)
//! - predicates with `and`, `or`, comparisons (`=`, `!=`, `<`, `<=`, `>`, `>=`)
//!   and numeric positions (`[2]`, `[last()-1]`)
//! - functions `not`, `true`, `false`, `contains`, `starts-with`,
//!   `ends-with`, `concat`, `string`, `number`, `count`, `normalize-space`,
//!   `name`, `position` and `last`
//!
//! Tag names may contain `-` (`row-1`), so `a-1` is a name, not a subtraction.
//! Node sets are always returned in document order without duplicates.

use crate::error::{Error, Result};
use crate::tree::{NodeId, NodeKind, XmlTree};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// A node selected by an XPath expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Item {
    /// The document node above the root element.
    Document,
    /// An element.
    Element(NodeId),
    /// The attribute with the given index on an element.
    Attribute(NodeId, usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Dot,
    DotDot,
    Star,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Name(String),
    Literal(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ArithOp {
    Add,
    Sub,
}

#[derive(Debug, Clone)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Literal(String),
    Number(f64),
    Call(String, Vec<Expr>),
    Path(LocationPath),
}

#[derive(Debug, Clone)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    Attribute,
    SelfAxis,
    Parent,
    DescendantOrSelf,
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    Any,
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: SmallVec<[Expr; 2]>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Step {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Any,
            predicates: SmallVec::new(),
        }
    }
}

fn syntax_error(source: &str, message: impl std::fmt::Display) -> Error {
    Error::parse(format!("invalid XPath '{}': {}", source, message))
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == ':'
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '[' | ']' | '(' | ')' | '@' | ',' | '*' | '+' | '-' | '=' => {
                tokens.push(match c {
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '@' => Token::At,
                    ',' => Token::Comma,
                    '*' => Token::Star,
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    _ => Token::Eq,
                });
                i += 1;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::NotEq);
                i += 2;
            }
            '<' | '>' => {
                let with_eq = next == Some('=');
                tokens.push(match (c, with_eq) {
                    ('<', true) => Token::Le,
                    ('<', false) => Token::Lt,
                    (_, true) => Token::Ge,
                    (_, false) => Token::Gt,
                });
                i += if with_eq { 2 } else { 1 };
            }
            '.' if next == Some('.') => {
                tokens.push(Token::DotDot);
                i += 2;
            }
            '.' if !next.map_or(false, |n| n.is_ascii_digit()) => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '\'' | '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&q| q == c)
                    .ok_or_else(|| syntax_error(source, "unterminated string literal"))?;
                tokens.push(Token::Literal(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| syntax_error(source, format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(number));
            }
            c if is_name_start(c) => {
                let start = i;
                while i < chars.len() && is_name_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Name(chars[start..i].iter().collect()));
            }
            other => {
                return Err(syntax_error(source, format!("unexpected character '{}'", other)));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(ref token) if *token == expected => Ok(()),
            Some(token) => Err(syntax_error(
                self.source,
                format!("expected {:?}, found {:?}", expected, token),
            )),
            None => Err(syntax_error(
                self.source,
                format!("expected {:?}, found end of expression", expected),
            )),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(name)) if name == keyword)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.peek_keyword("and") {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CmpOp::Eq,
                Some(Token::NotEq) => CmpOp::NotEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Arith(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Minus) {
            self.advance();
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek().cloned() {
            Some(Token::Literal(text)) => {
                self.advance();
                Ok(Expr::Literal(text))
            }
            Some(Token::Number(n)) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::LParen) => {
                self.advance();
                self.advance();
                let mut args = Vec::new();
                if self.peek() != Some(&Token::RParen) {
                    args.push(self.parse_or()?);
                    while self.peek() == Some(&Token::Comma) {
                        self.advance();
                        args.push(self.parse_or()?);
                    }
                }
                self.expect(Token::RParen)?;
                Ok(Expr::Call(name, args))
            }
            Some(_) => Ok(Expr::Path(self.parse_location_path()?)),
            None => Err(syntax_error(self.source, "unexpected end of expression")),
        }
    }

    fn can_start_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
        )
    }

    fn parse_location_path(&mut self) -> Result<LocationPath> {
        let mut path = LocationPath {
            absolute: false,
            steps: Vec::new(),
        };
        match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                path.absolute = true;
                if !self.can_start_step() {
                    return Ok(path);
                }
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                path.absolute = true;
                path.steps.push(Step::descendant_or_self());
            }
            _ => {}
        }

        loop {
            path.steps.push(self.parse_step()?);
            match self.peek() {
                Some(Token::Slash) => {
                    self.advance();
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    path.steps.push(Step::descendant_or_self());
                }
                _ => return Ok(path),
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step> {
        let (axis, test) = match self.advance() {
            Some(Token::Dot) => (Axis::SelfAxis, NodeTest::Any),
            Some(Token::DotDot) => (Axis::Parent, NodeTest::Any),
            Some(Token::Star) => (Axis::Child, NodeTest::Any),
            Some(Token::Name(name)) => (Axis::Child, NodeTest::Name(name)),
            Some(Token::At) => match self.advance() {
                Some(Token::Name(name)) => (Axis::Attribute, NodeTest::Name(name)),
                Some(Token::Star) => (Axis::Attribute, NodeTest::Any),
                _ => return Err(syntax_error(self.source, "expected attribute name after '@'")),
            },
            Some(token) => {
                return Err(syntax_error(self.source, format!("unexpected {:?}", token)));
            }
            None => return Err(syntax_error(self.source, "expected a location step")),
        };

        let mut predicates = SmallVec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.advance();
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }
}

/// A compiled XPath expression.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    expr: Expr,
}

impl XPath {
    /// Parse an expression.
    pub fn compile(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(syntax_error(source, "empty expression"));
        }
        let mut parser = Parser {
            source,
            tokens,
            pos: 0,
        };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(syntax_error(source, format!("unexpected trailing {:?}", token)));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The expression text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Select nodes relative to `context`. Fails if the expression does not
    /// evaluate to a node set.
    pub fn select(&self, tree: &XmlTree, context: NodeId) -> Result<Vec<Item>> {
        let evaluator = Evaluator::new(tree);
        let focus = Focus {
            item: Item::Element(context),
            position: 1,
            size: 1,
        };
        match evaluator.eval(&self.expr, &focus)? {
            XValue::Nodes(items) => Ok(items),
            _ => Err(syntax_error(&self.source, "expression does not select nodes")),
        }
    }
}

/// Elements selected by `xpath`, evaluated from the root element.
pub fn select_elements(tree: &XmlTree, xpath: &str) -> Result<Vec<NodeId>> {
    select_elements_from(tree, tree.root(), xpath)
}

/// Elements selected by `xpath`, evaluated from `context`.
pub fn select_elements_from(tree: &XmlTree, context: NodeId, xpath: &str) -> Result<Vec<NodeId>> {
    let items = XPath::compile(xpath)?.select(tree, context)?;
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Item::Element(id) => Some(id),
            _ => None,
        })
        .collect())
}

/// String values of the nodes selected by `xpath` (attribute values or
/// element texts).
pub fn select_values(tree: &XmlTree, xpath: &str) -> Result<Vec<String>> {
    let items = XPath::compile(xpath)?.select(tree, tree.root())?;
    let evaluator = Evaluator::new(tree);
    Ok(items.iter().map(|&item| evaluator.string_value(item)).collect())
}

/// Split the position of the last `/` separating steps (ignoring slashes inside
/// predicates). Returns `(parent, last_step)`; `parent` is empty for a single
/// step.
pub fn split_last_step(xpath: &str) -> (&str, &str) {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut split = None;
    for (index, c) in xpath.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => split = Some(index),
            _ => {}
        }
    }
    match split {
        Some(index) => {
            let parent = &xpath[..index];
            let parent = parent.strip_suffix('/').unwrap_or(parent);
            (parent, &xpath[index + 1..])
        }
        None => ("", xpath),
    }
}

/// Split a trailing attribute step: `/a/b/@c` gives `("/a/b", Some("c"))`.
pub fn split_attribute(xpath: &str) -> (&str, Option<&str>) {
    let (parent, last) = split_last_step(xpath);
    match last.strip_prefix('@') {
        Some(name) => (parent, Some(name)),
        None => (xpath, None),
    }
}

/// Remove all predicates from a path.
pub fn strip_predicates(xpath: &str) -> String {
    let mut out = String::with_capacity(xpath.len());
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in xpath.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if depth > 0 => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, c) if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Tag name of a step, without predicates.
pub fn step_name(step: &str) -> &str {
    step.split('[').next().unwrap_or(step).trim()
}

#[derive(Debug, Clone)]
enum XValue {
    Nodes(Vec<Item>),
    Str(String),
    Num(f64),
    Bool(bool),
}

struct Focus {
    item: Item,
    position: usize,
    size: usize,
}

struct Evaluator<'t> {
    tree: &'t XmlTree,
    ranks: Vec<usize>,
}

impl<'t> Evaluator<'t> {
    fn new(tree: &'t XmlTree) -> Self {
        Self {
            tree,
            ranks: tree.document_order(),
        }
    }

    fn sort_key(&self, item: &Item) -> (usize, usize) {
        match *item {
            Item::Document => (0, 0),
            Item::Element(id) => (self.ranks[id].saturating_add(1), 0),
            Item::Attribute(id, index) => (self.ranks[id].saturating_add(1), index + 1),
        }
    }

    fn document_order(&self, mut items: Vec<Item>) -> Vec<Item> {
        items.sort_by_key(|item| self.sort_key(item));
        items.dedup();
        items
    }

    fn eval(&self, expr: &Expr, focus: &Focus) -> Result<XValue> {
        Ok(match expr {
            Expr::Literal(text) => XValue::Str(text.clone()),
            Expr::Number(n) => XValue::Num(*n),
            Expr::Or(left, right) => {
                XValue::Bool(self.eval_bool(left, focus)? || self.eval_bool(right, focus)?)
            }
            Expr::And(left, right) => {
                XValue::Bool(self.eval_bool(left, focus)? && self.eval_bool(right, focus)?)
            }
            Expr::Compare(op, left, right) => {
                let left = self.eval(left, focus)?;
                let right = self.eval(right, focus)?;
                XValue::Bool(self.compare(*op, &left, &right))
            }
            Expr::Arith(op, left, right) => {
                let left = self.number(&self.eval(left, focus)?);
                let right = self.number(&self.eval(right, focus)?);
                XValue::Num(match op {
                    ArithOp::Add => left + right,
                    ArithOp::Sub => left - right,
                })
            }
            Expr::Negate(inner) => XValue::Num(-self.number(&self.eval(inner, focus)?)),
            Expr::Call(name, args) => self.call(name, args, focus)?,
            Expr::Path(path) => XValue::Nodes(self.eval_path(path, focus)?),
        })
    }

    fn eval_bool(&self, expr: &Expr, focus: &Focus) -> Result<bool> {
        Ok(self.boolean(&self.eval(expr, focus)?))
    }

    fn eval_path(&self, path: &LocationPath, focus: &Focus) -> Result<Vec<Item>> {
        let mut current = if path.absolute {
            vec![Item::Document]
        } else {
            vec![focus.item]
        };
        for step in &path.steps {
            let mut next = Vec::new();
            for &context in &current {
                let mut candidates = self.axis(context, step);
                for predicate in &step.predicates {
                    candidates = self.filter(candidates, predicate)?;
                }
                next.extend(candidates);
            }
            current = self.document_order(next);
        }
        Ok(current)
    }

    fn filter(&self, items: Vec<Item>, predicate: &Expr) -> Result<Vec<Item>> {
        let size = items.len();
        let mut kept = Vec::with_capacity(size);
        for (index, item) in items.into_iter().enumerate() {
            let focus = Focus {
                item,
                position: index + 1,
                size,
            };
            let keep = match self.eval(predicate, &focus)? {
                XValue::Num(n) => n == (index + 1) as f64,
                other => self.boolean(&other),
            };
            if keep {
                kept.push(item);
            }
        }
        Ok(kept)
    }

    fn element_matches(&self, id: NodeId, test: &NodeTest) -> bool {
        match test {
            NodeTest::Any => self.tree.is_element(id),
            NodeTest::Name(name) => self.tree.name(id) == Some(name.as_str()),
        }
    }

    fn axis(&self, context: Item, step: &Step) -> Vec<Item> {
        let tree = self.tree;
        match step.axis {
            Axis::Child => match context {
                Item::Document => {
                    let root = tree.root();
                    if self.element_matches(root, &step.test) {
                        vec![Item::Element(root)]
                    } else {
                        Vec::new()
                    }
                }
                Item::Element(id) => tree
                    .element_children(id)
                    .filter(|&child| self.element_matches(child, &step.test))
                    .map(Item::Element)
                    .collect(),
                Item::Attribute(..) => Vec::new(),
            },
            Axis::Attribute => match context {
                Item::Element(id) => tree
                    .attributes(id)
                    .iter()
                    .enumerate()
                    .filter(|(_, (key, _))| match &step.test {
                        NodeTest::Any => true,
                        NodeTest::Name(name) => key == name,
                    })
                    .map(|(index, _)| Item::Attribute(id, index))
                    .collect(),
                _ => Vec::new(),
            },
            Axis::SelfAxis => match (context, &step.test) {
                (_, NodeTest::Any) => vec![context],
                (Item::Element(id), test) if self.element_matches(id, test) => vec![context],
                _ => Vec::new(),
            },
            Axis::Parent => match context {
                Item::Element(id) if id == tree.root() => vec![Item::Document],
                Item::Element(id) => tree.parent(id).map(Item::Element).into_iter().collect(),
                Item::Attribute(id, _) => vec![Item::Element(id)],
                Item::Document => Vec::new(),
            },
            Axis::DescendantOrSelf => {
                let (mut items, start) = match context {
                    Item::Document => (vec![Item::Document], tree.root()),
                    Item::Element(id) => (Vec::new(), id),
                    Item::Attribute(..) => return vec![context],
                };
                items.extend(
                    tree.descendants(start)
                        .into_iter()
                        .filter(|&id| tree.is_element(id))
                        .map(Item::Element),
                );
                items
            }
        }
    }

    fn string_value(&self, item: Item) -> String {
        match item {
            Item::Document => self.string_value(Item::Element(self.tree.root())),
            Item::Element(id) => self
                .tree
                .descendants(id)
                .into_iter()
                .filter_map(|node| match self.tree.kind(node) {
                    NodeKind::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            Item::Attribute(id, index) => self
                .tree
                .attributes(id)
                .get(index)
                .map(|(_, value)| value.clone())
                .unwrap_or_default(),
        }
    }

    fn string(&self, value: &XValue) -> String {
        match value {
            XValue::Nodes(items) => items
                .first()
                .map(|&item| self.string_value(item))
                .unwrap_or_default(),
            XValue::Str(text) => text.clone(),
            XValue::Num(n) => format_number(*n),
            XValue::Bool(b) => b.to_string(),
        }
    }

    fn number(&self, value: &XValue) -> f64 {
        match value {
            XValue::Num(n) => *n,
            XValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => self.string(other).trim().parse().unwrap_or(f64::NAN),
        }
    }

    fn boolean(&self, value: &XValue) -> bool {
        match value {
            XValue::Nodes(items) => !items.is_empty(),
            XValue::Str(text) => !text.is_empty(),
            XValue::Num(n) => *n != 0.0 && !n.is_nan(),
            XValue::Bool(b) => *b,
        }
    }

    fn compare(&self, op: CmpOp, left: &XValue, right: &XValue) -> bool {
        match (left, right) {
            (XValue::Nodes(a), XValue::Nodes(b)) => a.iter().any(|&x| {
                let x = XValue::Str(self.string_value(x));
                b.iter()
                    .any(|&y| self.compare_atoms(op, &x, &XValue::Str(self.string_value(y))))
            }),
            (XValue::Nodes(a), XValue::Bool(_)) => {
                self.compare_atoms(op, &XValue::Bool(!a.is_empty()), right)
            }
            (XValue::Bool(_), XValue::Nodes(b)) => {
                self.compare_atoms(op, left, &XValue::Bool(!b.is_empty()))
            }
            (XValue::Nodes(a), other) => a
                .iter()
                .any(|&x| self.compare_atoms(op, &XValue::Str(self.string_value(x)), other)),
            (other, XValue::Nodes(b)) => b
                .iter()
                .any(|&y| self.compare_atoms(op, other, &XValue::Str(self.string_value(y)))),
            (a, b) => self.compare_atoms(op, a, b),
        }
    }

    fn compare_atoms(&self, op: CmpOp, left: &XValue, right: &XValue) -> bool {
        match op {
            CmpOp::Eq | CmpOp::NotEq => {
                let equal = match (left, right) {
                    (XValue::Bool(_), _) | (_, XValue::Bool(_)) => {
                        self.boolean(left) == self.boolean(right)
                    }
                    (XValue::Num(_), _) | (_, XValue::Num(_)) => {
                        self.number(left) == self.number(right)
                    }
                    _ => self.string(left) == self.string(right),
                };
                (op == CmpOp::Eq) == equal
            }
            _ => {
                let ordering = self.number(left).partial_cmp(&self.number(right));
                match (op, ordering) {
                    (_, None) => false,
                    (CmpOp::Lt, Some(o)) => o == Ordering::Less,
                    (CmpOp::Le, Some(o)) => o != Ordering::Greater,
                    (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
                    (_, Some(o)) => o != Ordering::Less,
                }
            }
        }
    }

    fn call(&self, name: &str, args: &[Expr], focus: &Focus) -> Result<XValue> {
        let arity = |expected: std::ops::RangeInclusive<usize>| -> Result<()> {
            if expected.contains(&args.len()) {
                Ok(())
            } else {
                Err(Error::parse(format!(
                    "XPath function {}() called with {} arguments",
                    name,
                    args.len()
                )))
            }
        };
        let string_arg = |index: usize| -> Result<String> {
            match args.get(index) {
                Some(expr) => Ok(self.string(&self.eval(expr, focus)?)),
                None => Ok(self.string_value(focus.item)),
            }
        };

        Ok(match name {
            "position" => {
                arity(0..=0)?;
                XValue::Num(focus.position as f64)
            }
            "last" => {
                arity(0..=0)?;
                XValue::Num(focus.size as f64)
            }
            "true" | "false" => {
                arity(0..=0)?;
                XValue::Bool(name == "true")
            }
            "not" => {
                arity(1..=1)?;
                XValue::Bool(!self.eval_bool(&args[0], focus)?)
            }
            "contains" | "starts-with" | "ends-with" => {
                arity(2..=2)?;
                let haystack = string_arg(0)?;
                let needle = string_arg(1)?;
                XValue::Bool(match name {
                    "contains" => haystack.contains(&needle),
                    "starts-with" => haystack.starts_with(&needle),
                    _ => haystack.ends_with(&needle),
                })
            }
            "concat" => {
                arity(2..=usize::MAX)?;
                let mut out = String::new();
                for index in 0..args.len() {
                    out.push_str(&string_arg(index)?);
                }
                XValue::Str(out)
            }
            "string" => {
                arity(0..=1)?;
                XValue::Str(string_arg(0)?)
            }
            "normalize-space" => {
                arity(0..=1)?;
                XValue::Str(string_arg(0)?.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            "number" => {
                arity(0..=1)?;
                XValue::Num(string_arg(0)?.trim().parse().unwrap_or(f64::NAN))
            }
            "count" => {
                arity(1..=1)?;
                match self.eval(&args[0], focus)? {
                    XValue::Nodes(items) => XValue::Num(items.len() as f64),
                    _ => return Err(Error::parse("XPath function count() expects a node set")),
                }
            }
            "name" => {
                arity(0..=0)?;
                XValue::Str(match focus.item {
                    Item::Element(id) => self.tree.name(id).unwrap_or_default().to_string(),
                    Item::Attribute(id, index) => self
                        .tree
                        .attributes(id)
                        .get(index)
                        .map(|(key, _)| key.clone())
                        .unwrap_or_default(),
                    Item::Document => String::new(),
                })
            }
            other => return Err(Error::parse(format!("unknown XPath function {}()", other))),
        })
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<fleurInput>
  <atomSpecies>
    <species name="Fe-1" element="Fe"><mtSphere radius="2.2"/></species>
    <species name="Pt-1" element="Pt"><mtSphere radius="2.5"/></species>
    <species name="Fe'2" element="Fe"><mtSphere radius="2.1"/></species>
  </atomSpecies>
  <cell><bulkLattice><bravaisMatrix><row-1>1.0 0.0 0.0</row-1></bravaisMatrix></bulkLattice></cell>
</fleurInput>"#;

    fn names(tree: &XmlTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| tree.attribute(id, "name").unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn test_absolute_path() {
        let tree = XmlTree::parse(DOC).unwrap();
        let species = select_elements(&tree, "/fleurInput/atomSpecies/species").unwrap();
        assert_eq!(names(&tree, &species), vec!["Fe-1", "Pt-1", "Fe'2"]);
    }

    #[test]
    fn test_attribute_predicates() {
        let tree = XmlTree::parse(DOC).unwrap();
        let found = select_elements(&tree, "/fleurInput/atomSpecies/species[@name='Pt-1']").unwrap();
        assert_eq!(names(&tree, &found), vec!["Pt-1"]);

        let found = select_elements(
            &tree,
            "/fleurInput/atomSpecies/species[contains(@name, 'Fe') and @element = \"Fe\"]",
        )
        .unwrap();
        assert_eq!(found.len(), 2);

        let found = select_elements(&tree, "//species[not(starts-with(@name, 'Fe'))]").unwrap();
        assert_eq!(names(&tree, &found), vec!["Pt-1"]);

        let found =
            select_elements(&tree, "//species[@name=concat('Fe', \"'\", '2')]").unwrap();
        assert_eq!(names(&tree, &found), vec!["Fe'2"]);
    }

    #[test]
    fn test_numeric_comparison() {
        let tree = XmlTree::parse(DOC).unwrap();
        let found = select_elements(&tree, "//species[mtSphere/@radius > 2.15]").unwrap();
        assert_eq!(names(&tree, &found), vec!["Fe-1", "Pt-1"]);
        let found = select_elements(&tree, "//species[mtSphere/@radius <= 2.2]").unwrap();
        assert_eq!(names(&tree, &found), vec!["Fe-1", "Fe'2"]);
    }

    #[test]
    fn test_positions() {
        let tree = XmlTree::parse(DOC).unwrap();
        let found = select_elements(&tree, "/fleurInput/atomSpecies/species[2]").unwrap();
        assert_eq!(names(&tree, &found), vec!["Pt-1"]);
        let found = select_elements(&tree, "/fleurInput/atomSpecies/species[last()]").unwrap();
        assert_eq!(names(&tree, &found), vec!["Fe'2"]);
        let found = select_elements(&tree, "/fleurInput/atomSpecies/species[last()-1]").unwrap();
        assert_eq!(names(&tree, &found), vec!["Pt-1"]);
        let found =
            select_elements(&tree, "/fleurInput/atomSpecies/species[@element='Fe'][2]").unwrap();
        assert_eq!(names(&tree, &found), vec!["Fe'2"]);
    }

    #[test]
    fn test_relative_and_parent_steps() {
        let tree = XmlTree::parse(DOC).unwrap();
        let species = select_elements(&tree, "/fleurInput/atomSpecies/species").unwrap();
        let sphere = select_elements_from(&tree, species[1], "./mtSphere").unwrap();
        assert_eq!(sphere.len(), 1);
        let back = select_elements_from(&tree, sphere[0], "..").unwrap();
        assert_eq!(back, vec![species[1]]);
    }

    #[test]
    fn test_values_and_dashed_names() {
        let tree = XmlTree::parse(DOC).unwrap();
        let radii = select_values(&tree, "//mtSphere/@radius").unwrap();
        assert_eq!(radii, vec!["2.2", "2.5", "2.1"]);
        let rows = select_values(&tree, "/fleurInput/cell/bulkLattice/bravaisMatrix/row-1").unwrap();
        assert_eq!(rows, vec!["1.0 0.0 0.0"]);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(XPath::compile("/a/b[").is_err());
        assert!(XPath::compile("/a/b[@x='1]").is_err());
        assert!(XPath::compile("").is_err());
        let tree = XmlTree::parse(DOC).unwrap();
        assert!(select_elements(&tree, "//species[bogus()]").is_err());
        assert!(select_elements(&tree, "1 + 2").is_err());
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(
            split_attribute("/a/b[@x='1/2']/@c"),
            ("/a/b[@x='1/2']", Some("c"))
        );
        assert_eq!(split_attribute("/a/b"), ("/a/b", None));
        assert_eq!(split_last_step("/a//b"), ("/a", "b"));
        assert_eq!(split_last_step("/a"), ("", "a"));
        assert_eq!(strip_predicates("/a/b[@x='[1]'][2]/c"), "/a/b/c");
        assert_eq!(step_name("species[@name='Fe']"), "species");
    }
}
