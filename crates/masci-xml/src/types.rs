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

//! Values written into documents and the schema types they are checked against.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A value supplied by the caller for an attribute or a text.
///
/// Serialized untagged, so `true`, `4`, `3.9`, `"Fe-1"` and `[0.0, 0.5, 0.5]`
/// are all valid JSON forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub(crate) fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Float)),
            serde_json::Value::String(s) => Some(Value::Str(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Value::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::List),
            _ => None,
        }
    }

    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// Kind of a single (non-list) schema value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    Str,
    /// String restricted to the given values.
    Enum(Vec<String>),
}

/// Type of an attribute or of the text content of a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttribType {
    Scalar(ScalarType),
    /// Whitespace separated list of scalars.
    List(ScalarType),
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Bool => f.write_str("bool"),
            ScalarType::Int => f.write_str("int"),
            ScalarType::Float => f.write_str("float"),
            ScalarType::Str => f.write_str("str"),
            ScalarType::Enum(values) => write!(f, "one of [{}]", values.join(", ")),
        }
    }
}

impl fmt::Display for AttribType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttribType::Scalar(kind) => write!(f, "{}", kind),
            AttribType::List(kind) => write!(f, "list of {}", kind),
        }
    }
}

const TRUE_LITERALS: [&str; 4] = ["T", "t", "true", "1"];
const FALSE_LITERALS: [&str; 4] = ["F", "f", "false", "0"];

pub(crate) fn is_bool_literal(text: &str) -> bool {
    TRUE_LITERALS.contains(&text) || FALSE_LITERALS.contains(&text)
}

/// Format a float the way it is written into documents.
///
/// The value is rounded to 10 significant digits to drop binary noise of
/// arithmetic (`3.9 * 1.1` is written as `4.29`); integral values keep a
/// trailing `.0`.
pub fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded: f64 = format!("{:.9e}", value).parse().unwrap_or(value);
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let mut text = rounded.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

/// Convert a caller value to its textual form for the given schema type.
///
/// `name` is only used for error messages.
pub fn convert_value(name: &str, value: &Value, kind: &AttribType) -> Result<String> {
    match kind {
        AttribType::Scalar(scalar) => convert_scalar(name, value, scalar),
        AttribType::List(item) => match value {
            Value::List(items) => {
                let parts = items
                    .iter()
                    .map(|v| convert_scalar(name, v, item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(parts.join(" "))
            }
            Value::Str(text) => {
                let parts = text
                    .split_whitespace()
                    .map(|token| convert_scalar(name, &Value::Str(token.to_string()), item))
                    .collect::<Result<Vec<_>>>()?;
                Ok(parts.join(" "))
            }
            other => convert_scalar(name, other, item),
        },
    }
}

fn convert_scalar(name: &str, value: &Value, kind: &ScalarType) -> Result<String> {
    let mismatch = || Error::type_mismatch(name, value, kind.to_string());
    match kind {
        ScalarType::Bool => match value {
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(1) => Ok("true".to_string()),
            Value::Int(0) => Ok("false".to_string()),
            Value::Str(s) if TRUE_LITERALS.contains(&s.trim()) => Ok("true".to_string()),
            Value::Str(s) if FALSE_LITERALS.contains(&s.trim()) => Ok("false".to_string()),
            _ => Err(mismatch()),
        },
        ScalarType::Int => match value {
            Value::Int(i) => Ok(i.to_string()),
            Value::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| i.to_string())
                .map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        ScalarType::Float => match value {
            Value::Int(i) => Ok(format_float(*i as f64)),
            Value::Float(f) => Ok(format_float(*f)),
            Value::Str(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<f64>()
                    .map(|_| trimmed.to_string())
                    .map_err(|_| mismatch())
            }
            _ => Err(mismatch()),
        },
        ScalarType::Str => match value {
            Value::List(_) => Err(mismatch()),
            other => Ok(other.to_string()),
        },
        ScalarType::Enum(allowed) => {
            let text = match value {
                Value::List(_) => return Err(mismatch()),
                other => other.to_string(),
            };
            allowed
                .iter()
                .find(|candidate| candidate.eq_ignore_ascii_case(text.trim()))
                .cloned()
                .ok_or_else(mismatch)
        }
    }
}

/// Read the current text of an attribute as a typed value.
pub fn parse_scalar(name: &str, text: &str, kind: &ScalarType) -> Result<Value> {
    let trimmed = text.trim();
    match kind {
        ScalarType::Bool => {
            if TRUE_LITERALS.contains(&trimmed) {
                Ok(Value::Bool(true))
            } else if FALSE_LITERALS.contains(&trimmed) {
                Ok(Value::Bool(false))
            } else {
                Err(Error::type_mismatch(name, text, "bool"))
            }
        }
        ScalarType::Int => trimmed
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::type_mismatch(name, text, "int")),
        ScalarType::Float => trimmed
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::type_mismatch(name, text, "float")),
        ScalarType::Str | ScalarType::Enum(_) => Ok(Value::Str(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float() -> AttribType {
        AttribType::Scalar(ScalarType::Float)
    }

    #[test]
    fn test_format_float_drops_noise() {
        assert_eq!(format_float(3.9 * 1.1), "4.29");
        assert_eq!(format_float(4.0), "4.0");
        assert_eq!(format_float(-0.0), "0.0");
        assert_eq!(format_float(0.1 + 0.2), "0.3");
        assert_eq!(format_float(3.333), "3.333");
    }

    #[test]
    fn test_bool_conversion() {
        let kind = AttribType::Scalar(ScalarType::Bool);
        assert_eq!(convert_value("l_soc", &Value::from("T"), &kind).unwrap(), "true");
        assert_eq!(convert_value("l_soc", &Value::from(false), &kind).unwrap(), "false");
        assert_eq!(convert_value("l_soc", &Value::Int(1), &kind).unwrap(), "true");
        let err = convert_value("l_soc", &Value::from("maybe"), &kind).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_string_kept_literally() {
        let kind = AttribType::Scalar(ScalarType::Str);
        assert_eq!(convert_value("name", &Value::from("T"), &kind).unwrap(), "T");
    }

    #[test]
    fn test_numeric_widening_only() {
        assert_eq!(convert_value("Kmax", &Value::Int(4), &float()).unwrap(), "4.0");
        let int = AttribType::Scalar(ScalarType::Int);
        assert!(convert_value("itmax", &Value::Float(2.5), &int).is_err());
        assert_eq!(convert_value("itmax", &Value::from("15"), &int).unwrap(), "15");
    }

    #[test]
    fn test_enum_canonical_casing() {
        let kind = AttribType::Scalar(ScalarType::Enum(vec![
            "straight".to_string(),
            "Broyden1".to_string(),
        ]));
        assert_eq!(convert_value("imix", &Value::from("broyden1"), &kind).unwrap(), "Broyden1");
        assert!(convert_value("imix", &Value::from("Pulay"), &kind).is_err());
    }

    #[test]
    fn test_list_conversion() {
        let kind = AttribType::List(ScalarType::Float);
        let value = Value::from(vec![0.0, 0.5, 1.0]);
        assert_eq!(convert_value("qss", &value, &kind).unwrap(), "0.0 0.5 1.0");
        assert_eq!(convert_value("qss", &Value::from("0 0.5  1"), &kind).unwrap(), "0 0.5 1");
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("Kmax", " 4.0 ", &ScalarType::Float).unwrap(), Value::Float(4.0));
        assert_eq!(parse_scalar("ctail", "F", &ScalarType::Bool).unwrap(), Value::Bool(false));
        assert!(parse_scalar("itmax", "x", &ScalarType::Int).is_err());
    }

    #[test]
    fn test_value_json_forms() {
        let value: Value = serde_json::from_str("[1, 2.5, \"a\", true]").unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::Str("a".to_string()),
                Value::Bool(true)
            ])
        );
        assert_eq!(Value::from_json(&value.to_json()), Some(value));
    }
}
