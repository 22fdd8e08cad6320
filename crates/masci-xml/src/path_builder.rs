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

//! Concrete XPath construction from canonical paths and per-tag filters.
//!
//! Filters are keyed by tag name. Each tag filter holds conditions on
//! attributes of that tag and an optional position:
//!
//! ```rust
//! use masci_xml::path_builder::{build_xpath, PathFilters};
//!
//! let filters: PathFilters = serde_json::from_str(r#"{
//!     "species": {"name": {"contains": "Fe"}, "atomicNumber": {">": 20}},
//!     "lo": {"index": -1}
//! }"#)?;
//! let xpath = build_xpath("/fleurInput/atomSpecies/species/lo/@l", &filters, true)?;
//! assert_eq!(
//!     xpath,
//!     "/fleurInput/atomSpecies/species[@atomicNumber > 20 and contains(@name, 'Fe')]/lo[last()]/@l"
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{Error, Result};
use crate::types::{format_float, Value};
use crate::xpath::step_name;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Filters keyed by tag name.
pub type PathFilters = BTreeMap<String, TagFilter>;

/// Conditions on one tag of a path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagFilter {
    /// 1-based position among the matches; negative values count from the end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    /// Conditions keyed by attribute name.
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Condition>,
}

impl TagFilter {
    /// Filter requiring `attribute` to equal `value`.
    pub fn equals(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut filter = TagFilter::default();
        filter
            .attributes
            .insert(attribute.into(), Condition::Equals(value.into()));
        filter
    }

    /// Filter selecting the n-th match.
    pub fn at(index: i64) -> Self {
        TagFilter {
            index: Some(index),
            ..Default::default()
        }
    }
}

/// Condition on one attribute: a plain value means equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Operators(BTreeMap<CompareOp, Value>),
    Equals(Value),
}

/// Comparison operators usable in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "not-contains")]
    NotContains,
    #[serde(rename = "starts-with")]
    StartsWith,
    #[serde(rename = "ends-with")]
    EndsWith,
    #[serde(rename = "has")]
    Has,
}

/// Quote a string as an XPath literal.
pub fn escape_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{}'", text);
    }
    if !text.contains('"') {
        return format!("\"{}\"", text);
    }
    let parts: Vec<String> = text
        .split('\'')
        .map(|part| format!("'{}'", part))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn literal(value: &Value) -> Result<String> {
    match value {
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(format_float(*f)),
        Value::Bool(b) => Ok(escape_literal(&b.to_string())),
        Value::Str(s) => Ok(escape_literal(s)),
        Value::List(_) => Err(Error::InvalidArgument(
            "lists cannot be used in path filters".to_string(),
        )),
    }
}

fn number(attribute: &str, value: &Value) -> Result<String> {
    match value {
        Value::Int(_) | Value::Float(_) => literal(value),
        other => other
            .as_f64()
            .map(format_float)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "comparison of '{}' needs a number, got '{}'",
                    attribute, other
                ))
            }),
    }
}

fn predicate(attribute: &str, op: CompareOp, value: &Value) -> Result<String> {
    let attr = format!("@{}", attribute);
    Ok(match op {
        CompareOp::Eq => format!("{} = {}", attr, literal(value)?),
        CompareOp::Ne => format!("{} != {}", attr, literal(value)?),
        CompareOp::Lt => format!("{} < {}", attr, number(attribute, value)?),
        CompareOp::Le => format!("{} <= {}", attr, number(attribute, value)?),
        CompareOp::Gt => format!("{} > {}", attr, number(attribute, value)?),
        CompareOp::Ge => format!("{} >= {}", attr, number(attribute, value)?),
        CompareOp::Contains => format!("contains({}, {})", attr, escape_literal(&value.to_string())),
        CompareOp::NotContains => {
            format!("not(contains({}, {}))", attr, escape_literal(&value.to_string()))
        }
        CompareOp::StartsWith => {
            format!("starts-with({}, {})", attr, escape_literal(&value.to_string()))
        }
        CompareOp::EndsWith => format!("ends-with({}, {})", attr, escape_literal(&value.to_string())),
        CompareOp::Has => match value {
            Value::Bool(true) => attr,
            Value::Bool(false) => format!("not({})", attr),
            other => {
                return Err(Error::InvalidArgument(format!(
                    "'has' expects true or false, got '{}'",
                    other
                )))
            }
        },
    })
}

fn index_predicate(index: i64) -> Result<String> {
    match index {
        0 => Err(Error::InvalidArgument(
            "filter index is 1-based, 0 is not allowed".to_string(),
        )),
        -1 => Ok("last()".to_string()),
        i if i < 0 => Ok(format!("last()-{}", -i - 1)),
        i => Ok(i.to_string()),
    }
}

/// Predicates for one tag filter, without surrounding brackets.
fn filter_predicates(filter: &TagFilter) -> Result<Vec<String>> {
    let mut conditions = Vec::new();
    for (attribute, condition) in &filter.attributes {
        match condition {
            Condition::Equals(value) => conditions.push(predicate(attribute, CompareOp::Eq, value)?),
            Condition::Operators(operators) => {
                for (op, value) in operators {
                    conditions.push(predicate(attribute, *op, value)?);
                }
            }
        }
    }

    let mut predicates = Vec::new();
    if !conditions.is_empty() {
        predicates.push(conditions.join(" and "));
    }
    if let Some(index) = filter.index {
        predicates.push(index_predicate(index)?);
    }
    Ok(predicates)
}

/// Split a path into its steps at top level `/` separators.
fn split_steps(xpath: &str) -> Vec<&str> {
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (index, c) in xpath.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => {
                steps.push(&xpath[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    steps.push(&xpath[start..]);
    steps
}

/// Add the predicates of `filters` to `base`.
///
/// A filter applies to the last step of `base` with that tag name. With
/// `strict`, a filter for a tag that does not occur in `base` fails with
/// `PathNotFound`; otherwise it is ignored.
pub fn build_xpath(base: &str, filters: &PathFilters, strict: bool) -> Result<String> {
    let steps = split_steps(base);
    let mut built: Vec<String> = steps.iter().map(|s| s.to_string()).collect();

    for (tag, filter) in filters {
        let position = steps
            .iter()
            .rposition(|step| step_name(step).eq_ignore_ascii_case(tag));
        let position = match position {
            Some(position) => position,
            None if strict => {
                return Err(Error::not_found(
                    tag.as_str(),
                    format!("filter for tag '{}' does not apply to '{}'", tag, base),
                ))
            }
            None => {
                tracing::debug!(tag = %tag, base, "ignoring filter for tag not in path");
                continue;
            }
        };
        for predicate in filter_predicates(filter)? {
            built[position].push('[');
            built[position].push_str(&predicate);
            built[position].push(']');
        }
    }
    Ok(built.join("/"))
}
