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

//! Nested attribute payloads for complex tags.
//!
//! An [`AttribTree`] describes changes to a tag: leaves are attribute (or
//! simple subtag) values, branches are subtags. Its JSON form is a plain
//! object:
//!
//! ```rust
//! use masci_xml::{AttribNode, AttribTree, Value};
//!
//! let changes: AttribTree = serde_json::from_str(
//!     r#"{"mtSphere": {"radius": 2.2}, "lo": [{"type": "SCLO", "l": 1, "n": 3}]}"#,
//! )?;
//! assert!(matches!(changes.get("mtSphere"), Some(AttribNode::Tag(_))));
//! assert!(matches!(changes.get("lo"), Some(AttribNode::Tags(tags)) if tags.len() == 1));
//!
//! let built = AttribTree::new()
//!     .with_tag("mtSphere", AttribTree::new().with_value("radius", 2.2));
//! assert_eq!(built.get("mtSphere").and_then(|n| n.as_tag()).and_then(|t| t.value("radius")), Some(&Value::Float(2.2)));
//! # Ok::<(), serde_json::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of an [`AttribTree`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttribNode {
    /// Attribute value, or text of a simple subtag.
    Value(Value),
    /// One subtag.
    Tag(AttribTree),
    /// Several subtags of the same name, one tree each.
    Tags(Vec<AttribTree>),
}

impl AttribNode {
    pub fn as_tag(&self) -> Option<&AttribTree> {
        match self {
            AttribNode::Tag(tree) => Some(tree),
            _ => None,
        }
    }
}

/// Ordered, name-unique mapping of attribute and subtag changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct AttribTree {
    entries: Vec<(String, AttribNode)>,
}

impl AttribTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Fails on empty or duplicate names.
    pub fn insert(&mut self, name: impl Into<String>, node: AttribNode) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("empty name in attribute tree".to_string()));
        }
        if self.entries.iter().any(|(existing, _)| *existing == name) {
            return Err(Error::InvalidArgument(format!(
                "'{}' appears twice in attribute tree",
                name
            )));
        }
        self.entries.push((name, node));
        Ok(())
    }

    fn replace(mut self, name: &str, node: AttribNode) -> Self {
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = node,
            None => self.entries.push((name.to_string(), node)),
        }
        self
    }

    /// Set an attribute value (replacing an entry of the same name).
    pub fn with_value(self, name: &str, value: impl Into<Value>) -> Self {
        self.replace(name, AttribNode::Value(value.into()))
    }

    /// Set the changes of one subtag.
    pub fn with_tag(self, name: &str, tree: AttribTree) -> Self {
        self.replace(name, AttribNode::Tag(tree))
    }

    /// Set the changes of several subtags of the same name.
    pub fn with_tags(self, name: &str, trees: Vec<AttribTree>) -> Self {
        self.replace(name, AttribNode::Tags(trees))
    }

    pub fn get(&self, name: &str) -> Option<&AttribNode> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, node)| node)
    }

    /// Value of a leaf entry.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            AttribNode::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttribNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn node_from_json(name: &str, value: serde_json::Value) -> Result<AttribNode> {
    let malformed = |what: &str| Error::InvalidArgument(format!("'{}': {}", name, what));
    match value {
        serde_json::Value::Object(_) => Ok(AttribNode::Tag(AttribTree::try_from(value)?)),
        serde_json::Value::Array(items) if items.iter().all(|item| item.is_object()) => {
            if items.is_empty() {
                return Err(malformed("empty list is neither values nor subtags"));
            }
            items
                .into_iter()
                .map(AttribTree::try_from)
                .collect::<Result<Vec<_>>>()
                .map(AttribNode::Tags)
        }
        serde_json::Value::Null => Err(malformed("null is not a value")),
        other => Value::from_json(&other)
            .map(AttribNode::Value)
            .ok_or_else(|| malformed("lists may only contain values or only objects")),
    }
}

impl TryFrom<serde_json::Value> for AttribTree {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        let object = match value {
            serde_json::Value::Object(object) => object,
            other => {
                return Err(Error::InvalidArgument(format!(
                    "attribute tree must be an object, got {}",
                    other
                )))
            }
        };
        let mut tree = AttribTree::new();
        for (name, value) in object {
            let node = node_from_json(&name, value)?;
            tree.insert(name, node)?;
        }
        Ok(tree)
    }
}

impl From<AttribTree> for serde_json::Value {
    fn from(tree: AttribTree) -> Self {
        let object = tree
            .entries
            .into_iter()
            .map(|(name, node)| {
                let value = match node {
                    AttribNode::Value(value) => value.to_json(),
                    AttribNode::Tag(tree) => tree.into(),
                    AttribNode::Tags(trees) => {
                        serde_json::Value::Array(trees.into_iter().map(Into::into).collect())
                    }
                };
                (name, value)
            })
            .collect();
        serde_json::Value::Object(object)
    }
}

impl fmt::Display for AttribTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::Value::from(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_payloads() {
        for json in [
            r#"[1, 2]"#,
            r#"{"a": null}"#,
            r#"{"a": [1, {"b": 2}]}"#,
            r#"{"a": []}"#,
            r#"{"": 1}"#,
            r#"{"a": {"b": {"c": [[1, {"x": 1}]]}}}"#,
        ] {
            assert!(
                serde_json::from_str::<AttribTree>(json).is_err(),
                "accepted {}",
                json
            );
        }
    }

    #[test]
    fn test_values_and_lists() {
        let tree: AttribTree =
            serde_json::from_str(r#"{"radius": 2.2, "posScale": [1, 0.5], "lmax": 10, "flag": "T"}"#).unwrap();
        assert_eq!(tree.value("radius"), Some(&Value::Float(2.2)));
        assert_eq!(tree.value("lmax"), Some(&Value::Int(10)));
        assert_eq!(tree.value("flag"), Some(&Value::from("T")));
        assert_eq!(
            tree.value("posScale"),
            Some(&Value::List(vec![Value::Int(1), Value::Float(0.5)]))
        );
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut tree = AttribTree::new();
        tree.insert("radius", AttribNode::Value(Value::Float(1.0))).unwrap();
        let err = tree
            .insert("radius", AttribNode::Value(Value::Float(2.0)))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_json_round_trip() {
        let tree = AttribTree::new()
            .with_value("name", "Fe-1")
            .with_tags(
                "lo",
                vec![
                    AttribTree::new().with_value("l", 0),
                    AttribTree::new().with_value("l", 1),
                ],
            )
            .with_tag("mtSphere", AttribTree::new().with_value("radius", 2.2));
        let json = serde_json::to_string(&tree).unwrap();
        let back: AttribTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("lo"), tree.get("lo"));
        assert_eq!(back.get("mtSphere"), tree.get("mtSphere"));
        assert_eq!(back.value("name"), tree.value("name"));
    }
}
