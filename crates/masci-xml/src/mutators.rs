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

//! XPath-level tree mutations without schema knowledge.
//!
//! Every function takes a concrete XPath. Values are already converted to
//! text; the schema-aware setters take care of types and canonical paths.

use crate::error::{Error, Result};
use crate::tree::{NodeId, WriteConfig, XmlTree};
use crate::xpath::{select_elements, split_last_step, step_name};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Where a created tag goes among the element children of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Follow the sibling order if one is given, otherwise append.
    #[default]
    Auto,
    First,
    Last,
    /// Position among the element children; negative values count from the
    /// end (`-1` inserts before the last child).
    Index(i64),
}

/// A tag to create: a bare name or a complete subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum NewTag {
    Name(String),
    Fragment(XmlTree),
}

impl NewTag {
    /// Tag name of the element to create.
    pub fn name(&self) -> &str {
        match self {
            NewTag::Name(name) => name,
            NewTag::Fragment(tree) => tree.name(tree.root()).unwrap_or_default(),
        }
    }

    fn instantiate(&self, tree: &mut XmlTree) -> NodeId {
        match self {
            NewTag::Name(name) => tree.new_element(name),
            NewTag::Fragment(fragment) => tree.import(fragment, fragment.root()),
        }
    }
}

impl From<&str> for NewTag {
    fn from(name: &str) -> Self {
        NewTag::Name(name.to_string())
    }
}

impl From<XmlTree> for NewTag {
    fn from(tree: XmlTree) -> Self {
        NewTag::Fragment(tree)
    }
}

impl FromStr for NewTag {
    type Err = Error;

    /// Text starting with `<` is parsed as an XML fragment, anything else is
    /// a tag name.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.starts_with('<') {
            Ok(NewTag::Fragment(XmlTree::parse(trimmed)?))
        } else if !trimmed.is_empty() && !trimmed.contains(char::is_whitespace) {
            Ok(NewTag::Name(trimmed.to_string()))
        } else {
            Err(Error::InvalidArgument(format!("'{}' is not a tag name", s)))
        }
    }
}

impl Serialize for NewTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            NewTag::Name(name) => serializer.serialize_str(name),
            NewTag::Fragment(tree) => {
                let text = tree
                    .to_xml_string(&WriteConfig::compact())
                    .map_err(serde::ser::Error::custom)?;
                serializer.serialize_str(text.trim_end())
            }
        }
    }
}

impl<'de> Deserialize<'de> for NewTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Options of [`xml_create_tag`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateOptions {
    pub place: Placement,
    /// Allowed order of the sibling tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
    /// Indices (0-based, negative from the end) of the parents to create in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<Vec<i64>>,
    pub create_parents: bool,
}

/// Pick the nodes at the given 0-based indices; negative indices count from
/// the end. The result keeps the order of `nodes`.
pub fn select_occurrences(nodes: &[NodeId], occurrences: Option<&[i64]>) -> Result<Vec<NodeId>> {
    let occurrences = match occurrences {
        None => return Ok(nodes.to_vec()),
        Some(occurrences) => occurrences,
    };
    let len = nodes.len() as i64;
    let mut indices = Vec::with_capacity(occurrences.len());
    for &occurrence in occurrences {
        let index = if occurrence < 0 { len + occurrence } else { occurrence };
        if index < 0 || index >= len {
            return Err(Error::InvalidArgument(format!(
                "occurrence {} out of range for {} matches",
                occurrence, len
            )));
        }
        indices.push(index as usize);
    }
    indices.sort_unstable();
    indices.dedup();
    Ok(indices.into_iter().map(|i| nodes[i]).collect())
}

fn order_index(order: &[String], name: &str) -> Option<usize> {
    order.iter().position(|candidate| candidate == name)
}

/// Index in the full child list for inserting a tag named `name`.
fn insertion_index(
    tree: &XmlTree,
    parent: NodeId,
    name: &str,
    place: Placement,
    order: Option<&[String]>,
) -> Result<usize> {
    let children = tree.children(parent);
    let elements: Vec<usize> = children
        .iter()
        .enumerate()
        .filter(|(_, &child)| tree.is_element(child))
        .map(|(index, _)| index)
        .collect();
    let before_element = |n: usize| elements.get(n).copied().unwrap_or(children.len());

    Ok(match (place, order) {
        (Placement::Auto, Some(order)) => {
            let rank = order_index(order, name).ok_or_else(|| {
                Error::InvalidArgument(format!("'{}' is not part of the tag order {:?}", name, order))
            })?;
            // After the last sibling that may precede the new tag
            let after = elements.iter().rev().find(|&&index| {
                tree.name(children[index])
                    .and_then(|sibling| order_index(order, sibling))
                    .map_or(false, |sibling_rank| sibling_rank <= rank)
            });
            match after {
                Some(&index) => index + 1,
                None => before_element(0),
            }
        }
        (Placement::Auto, None) | (Placement::Last, _) => children.len(),
        (Placement::First, _) => before_element(0),
        (Placement::Index(index), _) => {
            let count = elements.len() as i64;
            let position = if index < 0 { (count + index).max(0) } else { index.min(count) };
            before_element(position as usize)
        }
    })
}

fn check_order(tree: &XmlTree, parent: NodeId, order: &[String]) -> Result<()> {
    let ranks: Vec<Option<usize>> = tree
        .element_children(parent)
        .map(|child| tree.name(child).and_then(|name| order_index(order, name)))
        .collect();
    let mut last = 0;
    for rank in ranks.into_iter().flatten() {
        if rank < last {
            return Err(Error::InvalidArgument(format!(
                "placement violates the tag order {:?}",
                order
            )));
        }
        last = rank;
    }
    Ok(())
}

/// Create a tag below every element matched by `xpath`.
///
/// Returns the created nodes. Fails with `ParentMissing` if `xpath` matches
/// nothing and `create_parents` is not set.
///
/// # Examples
///
/// ```rust
/// use masci_xml::mutators::{xml_create_tag, CreateOptions, NewTag};
/// use masci_xml::XmlTree;
///
/// let mut tree: XmlTree = "<species><mtSphere/><lo/></species>".parse()?;
/// let options = CreateOptions {
///     order: Some(vec!["mtSphere".into(), "atomicCutoffs".into(), "lo".into()]),
///     ..Default::default()
/// };
/// xml_create_tag(&mut tree, "/species", &NewTag::from("atomicCutoffs"), &options)?;
/// assert_eq!(tree.to_string(), "<species><mtSphere/><atomicCutoffs/><lo/></species>");
/// # Ok::<(), masci_xml::Error>(())
/// ```
pub fn xml_create_tag(
    tree: &mut XmlTree,
    xpath: &str,
    element: &NewTag,
    options: &CreateOptions,
) -> Result<Vec<NodeId>> {
    let mut parents = select_elements(tree, xpath)?;

    if parents.is_empty() && options.create_parents {
        let (grandparent, step) = split_last_step(xpath);
        if !grandparent.is_empty() {
            let parent_options = CreateOptions {
                create_parents: true,
                ..Default::default()
            };
            xml_create_tag(tree, grandparent, &NewTag::Name(step_name(step).to_string()), &parent_options)?;
            parents = select_elements(tree, xpath)?;
        }
    }
    if parents.is_empty() {
        return Err(Error::ParentMissing {
            tag: element.name().to_string(),
            xpath: xpath.to_string(),
        });
    }

    let targets = select_occurrences(&parents, options.occurrences.as_deref())?;
    let name = element.name().to_string();
    let order = options.order.as_deref();
    let mut created = Vec::with_capacity(targets.len());
    for parent in targets {
        let index = insertion_index(tree, parent, &name, options.place, order)?;
        let node = element.instantiate(tree);
        tree.insert_child(parent, index, node);
        if let (Some(order), false) = (order, options.place == Placement::Auto) {
            if let Err(err) = check_order(tree, parent, order) {
                tree.detach(node);
                return Err(err);
            }
        }
        created.push(node);
    }
    Ok(created)
}

/// Delete the elements matched by `xpath`. Returns the number removed.
pub fn xml_delete_tag(
    tree: &mut XmlTree,
    xpath: &str,
    occurrences: Option<&[i64]>,
    must_exist: bool,
) -> Result<usize> {
    let nodes = select_elements(tree, xpath)?;
    if nodes.is_empty() {
        return if must_exist {
            Err(Error::not_found(xpath, "no tag to delete"))
        } else {
            Ok(0)
        };
    }
    let targets = select_occurrences(&nodes, occurrences)?;
    let root = tree.root();
    if targets.contains(&root) {
        return Err(Error::InvalidArgument("the root element cannot be deleted".to_string()));
    }
    for &node in &targets {
        tree.detach(node);
    }
    Ok(targets.len())
}

/// Delete attribute `name` from the elements matched by `xpath`. Returns the
/// number of attributes removed.
pub fn xml_delete_att(
    tree: &mut XmlTree,
    xpath: &str,
    name: &str,
    occurrences: Option<&[i64]>,
    must_exist: bool,
) -> Result<usize> {
    let nodes = select_elements(tree, xpath)?;
    if nodes.is_empty() && must_exist {
        return Err(Error::not_found(xpath, format!("no tag to delete '{}' from", name)));
    }
    let targets = select_occurrences(&nodes, occurrences)?;
    Ok(targets
        .into_iter()
        .filter(|&node| tree.remove_attribute(node, name).is_some())
        .count())
}

/// Replace the elements matched by `xpath` by copies of `replacement`.
/// Surrounding text is kept.
pub fn xml_replace_tag(
    tree: &mut XmlTree,
    xpath: &str,
    replacement: &XmlTree,
    occurrences: Option<&[i64]>,
) -> Result<usize> {
    let nodes = select_elements(tree, xpath)?;
    if nodes.is_empty() {
        return Err(Error::not_found(xpath, "no tag to replace"));
    }
    let targets = select_occurrences(&nodes, occurrences)?;
    for &old in &targets {
        let new = tree.import(replacement, replacement.root());
        tree.replace_node(old, new);
    }
    Ok(targets.len())
}

/// Pair selected nodes with values: one value is used for all nodes,
/// surplus values are dropped and surplus nodes left alone.
fn align<'v>(xpath: &str, nodes: Vec<NodeId>, values: &'v [String]) -> Vec<(NodeId, &'v str)> {
    match values {
        [single] => nodes.into_iter().map(|node| (node, single.as_str())).collect(),
        _ => {
            if values.len() > nodes.len() {
                tracing::warn!(
                    xpath,
                    values = values.len(),
                    matches = nodes.len(),
                    "more values than matching tags, dropping the rest"
                );
            }
            nodes
                .into_iter()
                .zip(values.iter().map(String::as_str))
                .collect()
        }
    }
}

/// Set attribute `name` on existing elements matched by `xpath`.
///
/// Returns the number of elements written. Fails with `PathNotFound` when
/// nothing matches.
pub fn xml_set_attrib_value_no_create(
    tree: &mut XmlTree,
    xpath: &str,
    name: &str,
    values: &[String],
    occurrences: Option<&[i64]>,
) -> Result<usize> {
    if values.is_empty() {
        return Err(Error::InvalidArgument(format!("no value given for '{}'", name)));
    }
    let nodes = select_elements(tree, xpath)?;
    if nodes.is_empty() {
        return Err(Error::not_found(xpath, format!("no tag to set '{}' on", name)));
    }
    let targets = select_occurrences(&nodes, occurrences)?;
    let pairs = align(xpath, targets, values);
    for &(node, value) in &pairs {
        tree.set_attribute(node, name, value);
    }
    Ok(pairs.len())
}

/// Set the text of existing elements matched by `xpath`.
pub fn xml_set_text_no_create(
    tree: &mut XmlTree,
    xpath: &str,
    values: &[String],
    occurrences: Option<&[i64]>,
) -> Result<usize> {
    if values.is_empty() {
        return Err(Error::InvalidArgument(format!("no text given for '{}'", xpath)));
    }
    let nodes = select_elements(tree, xpath)?;
    if nodes.is_empty() {
        return Err(Error::not_found(xpath, "no tag to set the text of"));
    }
    let targets = select_occurrences(&nodes, occurrences)?;
    let pairs = align(xpath, targets, values);
    for &(node, value) in &pairs {
        tree.set_text(node, value);
    }
    Ok(pairs.len())
}
