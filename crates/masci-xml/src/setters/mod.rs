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

//! Schema-aware setters.
//!
//! Setters address tags and attributes by name. The name is resolved to a
//! canonical path through the [`SchemaDescriptor`], values are converted to
//! the declared type, and the change is carried out by the
//! [`mutators`](crate::mutators).
//!
//! # Examples
//!
//! ```rust
//! use masci_xml::schema::{SchemaKind, SchemaRegistry};
//! use masci_xml::setters::{set_attrib_value, Target};
//! use masci_xml::{xpath, Value, XmlTree};
//!
//! # let xml = masci_test::fixtures::fe_pt_inp();
//! let registry = SchemaRegistry::default();
//! let schema = registry.get(SchemaKind::Input, "0.34")?;
//! let mut tree = XmlTree::parse(&xml)?;
//!
//! set_attrib_value(&mut tree, &schema, "itmax", &Value::Int(30), &Target::default(), false)?;
//! assert_eq!(
//!     xpath::select_values(&tree, "/fleurInput/calculationSetup/scfLoop/@itmax")?,
//!     vec!["30"]
//! );
//! # Ok::<(), masci_xml::Error>(())
//! ```

mod atom_groups;
mod basic;
mod kpoints;
mod species;

pub use atom_groups::{set_atomgroup, set_atomgroup_label, shift_value_species_label};
pub use basic::{
    add_number_to_attrib, add_number_to_first_attrib, apply_attrib_tree, create_tag, delete_att,
    delete_tag, replace_tag, set_attrib_value, set_complex_tag, set_first_attrib_value,
    set_first_text, set_inpchanges, set_simple_tag, set_text, shift_value, ShiftMode,
};
pub use kpoints::{set_kpath, set_kpointlist, set_nkpts, switch_kpointset, KPointListOptions};
pub use species::{
    clone_species, set_species, set_species_label, switch_species, switch_species_label,
};
pub(crate) use species::{atomgroup_base, species_base};

use crate::error::{Error, Result};
use crate::mutators::{xml_create_tag, CreateOptions, NewTag};
use crate::path_builder::{build_xpath, PathFilters, TagFilter};
use crate::schema::{PathSpec, SchemaDescriptor};
use crate::tree::{NodeId, XmlTree};
use crate::xpath::{select_elements, split_attribute, split_last_step, step_name};
use serde::{Deserialize, Serialize};

/// Selection of the tags a setter works on: schema disambiguation,
/// in-document filters and occurrence indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    #[serde(flatten)]
    pub spec: PathSpec,
    #[serde(skip_serializing_if = "PathFilters::is_empty")]
    pub filters: PathFilters,
    /// 0-based indices of the matches to change; negative from the end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<Vec<i64>>,
}

impl Target {
    pub fn contains(mut self, fragment: impl Into<String>) -> Self {
        self.spec = self.spec.contains(fragment);
        self
    }

    pub fn not_contains(mut self, fragment: impl Into<String>) -> Self {
        self.spec = self.spec.not_contains(fragment);
        self
    }

    pub fn filter(mut self, tag: impl Into<String>, filter: TagFilter) -> Self {
        self.filters.insert(tag.into(), filter);
        self
    }

    pub fn occurrences(mut self, occurrences: Vec<i64>) -> Self {
        self.occurrences = Some(occurrences);
        self
    }

    /// Only the first match.
    pub(crate) fn first(&self) -> Target {
        Target {
            occurrences: Some(vec![0]),
            ..self.clone()
        }
    }
}

/// A tag resolved against the schema and the filters.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedTag {
    pub canonical: String,
    pub xpath: String,
}

/// An attribute resolved against the schema and the filters.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedAttrib {
    pub name: String,
    pub tag: ResolvedTag,
}

pub(crate) fn resolve_tag(schema: &SchemaDescriptor, name: &str, target: &Target) -> Result<ResolvedTag> {
    let canonical = schema.tag_path(name, &target.spec)?;
    let xpath = build_xpath(&canonical, &target.filters, true)?;
    Ok(ResolvedTag { canonical, xpath })
}

pub(crate) fn resolve_attrib(
    schema: &SchemaDescriptor,
    name: &str,
    target: &Target,
) -> Result<ResolvedAttrib> {
    let attribute_path = schema.attribute_path(name, &target.spec)?;
    let (tag_path, attribute) = split_attribute(&attribute_path);
    let attribute = attribute.unwrap_or(name).to_string();
    let xpath = build_xpath(tag_path, &target.filters, true)?;
    Ok(ResolvedAttrib {
        name: attribute,
        tag: ResolvedTag {
            canonical: tag_path.to_string(),
            xpath,
        },
    })
}

/// Canonical path of an element from its ancestors.
pub(crate) fn node_path(tree: &XmlTree, node: NodeId) -> String {
    let mut names = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        names.push(tree.name(id).unwrap_or_default().to_string());
        current = tree.parent(id);
    }
    names.reverse();
    format!("/{}", names.join("/"))
}

/// Make sure the elements at `xpath` exist, creating missing ancestors in
/// schema order. `canonical` is `xpath` without predicates.
pub(crate) fn ensure_tag(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    canonical: &str,
    xpath: &str,
) -> Result<Vec<NodeId>> {
    let nodes = select_elements(tree, xpath)?;
    if !nodes.is_empty() {
        return Ok(nodes);
    }
    let (parent_xpath, step) = split_last_step(xpath);
    let (parent_canonical, _) = split_last_step(canonical);
    if parent_xpath.is_empty() || parent_canonical.is_empty() {
        return Err(Error::not_found(xpath, "the root element is missing"));
    }
    ensure_tag(tree, schema, parent_canonical, parent_xpath)?;

    let options = CreateOptions {
        order: Some(schema.tag_info(parent_canonical)?.order.clone()),
        ..Default::default()
    };
    xml_create_tag(tree, parent_xpath, &NewTag::Name(step_name(step).to_string()), &options)?;
    let nodes = select_elements(tree, xpath)?;
    if nodes.is_empty() {
        // The filters of `xpath` reject a freshly created tag
        return Err(Error::ParentMissing {
            tag: step_name(step).to_string(),
            xpath: parent_xpath.to_string(),
        });
    }
    Ok(nodes)
}

/// Create a child tag in schema order below `parent`.
pub(crate) fn create_child(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    parent: NodeId,
    parent_canonical: &str,
    name: &str,
) -> Result<NodeId> {
    let info = schema.tag_info(parent_canonical)?;
    let order = &info.order;
    let rank = order
        .iter()
        .position(|candidate| candidate == name)
        .ok_or_else(|| Error::not_found(name, format!("'{}' is not a child of '{}'", name, parent_canonical)))?;
    let children: Vec<NodeId> = tree.children(parent).to_vec();
    let after = children.iter().rposition(|&child| {
        tree.name(child)
            .and_then(|sibling| order.iter().position(|candidate| candidate == sibling))
            .map_or(false, |sibling_rank| sibling_rank <= rank)
    });
    let index = match after {
        Some(position) => position + 1,
        None => children
            .iter()
            .position(|&child| tree.is_element(child))
            .unwrap_or(children.len()),
    };
    let node = tree.new_element(name);
    tree.insert_child(parent, index, node);
    Ok(node)
}

/// Predicate for a species selector on `attribute`: `all`,
/// `all-<substring>` or an exact name.
pub(crate) fn selector_predicate(attribute: &str, selector: &str) -> String {
    use crate::path_builder::escape_literal;
    if selector == "all" {
        String::new()
    } else if let Some(part) = selector.strip_prefix("all-") {
        format!("[contains(@{}, {})]", attribute, escape_literal(part))
    } else {
        format!("[@{} = {}]", attribute, escape_literal(selector))
    }
}

/// Predicate selecting atom groups with an atom labelled `label`.
pub(crate) fn label_predicate(label: &str) -> String {
    format!(
        "[*[normalize-space(@label) = {}]]",
        crate::path_builder::escape_literal(label.trim())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_serde() {
        let target: Target = serde_json::from_str(
            r#"{"contains": ["species"], "filters": {"species": {"name": "Fe-1"}}, "occurrences": [0]}"#,
        )
        .unwrap();
        assert_eq!(target.spec.contains, vec!["species".to_string()]);
        assert_eq!(target.occurrences, Some(vec![0]));
        assert_eq!(target.filters.len(), 1);
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(serde_json::from_value::<Target>(json).unwrap(), target);
        assert_eq!(serde_json::to_string(&Target::default()).unwrap(), "{}");
    }

    #[test]
    fn test_predicates() {
        assert_eq!(selector_predicate("name", "all"), "");
        assert_eq!(selector_predicate("name", "all-Fe"), "[contains(@name, 'Fe')]");
        assert_eq!(selector_predicate("species", "Fe-1"), "[@species = 'Fe-1']");
        assert_eq!(label_predicate("  1 "), "[*[normalize-space(@label) = '1']]");
    }

    #[test]
    fn test_node_path() {
        let tree: XmlTree = "<a><b><c/></b></a>".parse().unwrap();
        let c = select_elements(&tree, "/a/b/c").unwrap()[0];
        assert_eq!(node_path(&tree, c), "/a/b/c");
    }
}
