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

//! Brillouin-zone sampling.
//!
//! From input version 0.32 on, k-point sets are named lists below
//! `kPointLists`, one of which is selected by `kPointListSelection`. Older
//! versions carry exactly one of `kPointCount`, `kPointMesh` or `kPointList`
//! directly below `bzIntegration`.

use super::basic::set_typed_attribute;
use super::create_child;
use crate::error::{Error, Result};
use crate::path_builder::escape_literal;
use crate::schema::{PathSpec, SchemaDescriptor, Version, VersionDispatch, VersionRange};
use crate::tree::{NodeId, XmlTree};
use crate::types::{format_float, Value};
use crate::xpath::select_elements;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NAMED_LISTS: Version = Version::new(0, 32);

/// Options of [`set_kpointlist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KPointListOptions {
    /// Name of the list. Defaults to `default-<n>` for the n-th list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `type` attribute of the list.
    #[serde(rename = "type")]
    pub list_type: String,
    /// Labels of k-points by their 0-based index.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub special_labels: BTreeMap<usize, String>,
    /// Select the new list.
    pub switch: bool,
    /// Replace a list of the same name.
    pub overwrite: bool,
    /// Further attributes of the list (e.g. `nx`).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_attributes: BTreeMap<String, Value>,
}

impl Default for KPointListOptions {
    fn default() -> Self {
        Self {
            name: None,
            list_type: "path".to_string(),
            special_labels: BTreeMap::new(),
            switch: false,
            overwrite: false,
            additional_attributes: BTreeMap::new(),
        }
    }
}

type SetListFn = fn(&mut XmlTree, &SchemaDescriptor, &[[f64; 3]], &[f64], &KPointListOptions) -> Result<()>;

fn single(tree: &XmlTree, xpath: &str, name: &str) -> Result<NodeId> {
    select_elements(tree, xpath)?
        .first()
        .copied()
        .ok_or_else(|| Error::not_found(name, format!("no tag at '{}'", xpath)))
}

fn vector_text(point: &[f64; 3]) -> String {
    point.iter().map(|&x| format_float(x)).collect::<Vec<_>>().join(" ")
}

fn clear(tree: &mut XmlTree, node: NodeId) {
    for child in tree.children(node).to_vec() {
        tree.detach(child);
    }
    let names: Vec<String> = tree.attributes(node).iter().map(|(name, _)| name.clone()).collect();
    for name in names {
        tree.remove_attribute(node, &name);
    }
}

fn append_kpoints(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    list: NodeId,
    list_path: &str,
    kpoints: &[[f64; 3]],
    weights: &[f64],
    labels: &BTreeMap<usize, String>,
) -> Result<()> {
    for (index, (point, &weight)) in kpoints.iter().zip(weights).enumerate() {
        let kpoint = create_child(tree, schema, list, list_path, "kPoint")?;
        tree.set_attribute(kpoint, "weight", format_float(weight));
        if let Some(label) = labels.get(&index) {
            tree.set_attribute(kpoint, "label", label.as_str());
        }
        tree.set_text(kpoint, vector_text(point));
    }
    Ok(())
}

/// Write an explicit list of k-points with their weights.
///
/// Documents with named lists get a new list (or a replaced one with
/// `overwrite`). Older documents have their single k-point set replaced,
/// keeping the name of a previous list.
pub fn set_kpointlist(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    kpoints: &[[f64; 3]],
    weights: &[f64],
    options: &KPointListOptions,
) -> Result<()> {
    if kpoints.is_empty() {
        return Err(Error::InvalidArgument("no k-points given".to_string()));
    }
    if kpoints.len() != weights.len() {
        return Err(Error::InvalidArgument(format!(
            "{} k-points but {} weights",
            kpoints.len(),
            weights.len()
        )));
    }
    if let Some(&index) = options.special_labels.keys().find(|&&index| index >= kpoints.len()) {
        return Err(Error::InvalidArgument(format!(
            "label for k-point {} but only {} k-points",
            index,
            kpoints.len()
        )));
    }
    let table = VersionDispatch::new("set_kpointlist")
        .register(VersionRange::before(NAMED_LISTS), set_single_kpointlist as SetListFn)
        .register(VersionRange::since(NAMED_LISTS), set_named_kpointlist as SetListFn);
    let implementation = table.select(schema.version())?;
    implementation(tree, schema, kpoints, weights, options)
}

fn set_named_kpointlist(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    kpoints: &[[f64; 3]],
    weights: &[f64],
    options: &KPointListOptions,
) -> Result<()> {
    let lists_path = schema.tag_path("kPointLists", &PathSpec::default())?;
    let list_path = format!("{}/kPointList", lists_path);
    let lists = single(tree, &lists_path, "kPointLists")?;
    let existing = tree.children_named(lists, "kPointList");
    let name = options
        .name
        .clone()
        .unwrap_or_else(|| format!("default-{}", existing.len() + 1));

    let previous = existing
        .iter()
        .copied()
        .find(|&node| tree.attribute(node, "name") == Some(name.as_str()));
    let list = match previous {
        Some(node) if options.overwrite => {
            clear(tree, node);
            node
        }
        Some(_) => {
            return Err(Error::InvalidArgument(format!(
                "k-point list '{}' already exists (use overwrite)",
                name
            )))
        }
        None => create_child(tree, schema, lists, &lists_path, "kPointList")?,
    };

    tree.set_attribute(list, "name", name.as_str());
    tree.set_attribute(list, "count", kpoints.len().to_string());
    set_typed_attribute(tree, schema, list, &list_path, "type", &Value::from(options.list_type.as_str()))?;
    for (attribute, value) in &options.additional_attributes {
        set_typed_attribute(tree, schema, list, &list_path, attribute, value)?;
    }
    append_kpoints(tree, schema, list, &list_path, kpoints, weights, &options.special_labels)?;

    if options.switch {
        select_list(tree, schema, &name)?;
    }
    tracing::debug!(name = %name, count = kpoints.len(), "wrote k-point list");
    Ok(())
}

fn set_single_kpointlist(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    kpoints: &[[f64; 3]],
    weights: &[f64],
    options: &KPointListOptions,
) -> Result<()> {
    let bz_path = schema.tag_path("bzIntegration", &PathSpec::default())?;
    let bz = single(tree, &bz_path, "bzIntegration")?;
    let previous_name = tree
        .first_child_named(bz, "kPointList")
        .and_then(|list| tree.attribute(list, "name"))
        .map(str::to_string);
    if options.switch {
        tracing::debug!("documents with a single k-point set have nothing to switch");
    }

    let list = replace_kpoint_set(tree, schema, bz, &bz_path, "kPointList")?;
    let list_path = format!("{}/kPointList", bz_path);
    let name = previous_name.or_else(|| options.name.clone()).or_else(|| {
        schema
            .tag_info(&list_path)
            .ok()
            .and_then(|info| info.attribute("name"))
            .map(|_| "default-1".to_string())
    });
    if let Some(name) = name {
        tree.set_attribute(list, "name", name);
    }
    tree.set_attribute(list, "posScale", "1.0");
    tree.set_attribute(list, "weightScale", "1.0");
    tree.set_attribute(list, "count", kpoints.len().to_string());
    append_kpoints(tree, schema, list, &list_path, kpoints, weights, &options.special_labels)
}

/// Drop the current k-point set below `bzIntegration` and create `kind` in
/// its place.
fn replace_kpoint_set(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    bz: NodeId,
    bz_path: &str,
    kind: &str,
) -> Result<NodeId> {
    for set in ["kPointCount", "kPointMesh", "kPointList"] {
        for node in tree.children_named(bz, set) {
            tree.detach(node);
        }
    }
    create_child(tree, schema, bz, bz_path, kind)
}

fn select_list(tree: &mut XmlTree, schema: &SchemaDescriptor, name: &str) -> Result<()> {
    let lists_path = schema.tag_path("kPointLists", &PathSpec::default())?;
    let xpath = format!("{}/kPointList[@name = {}]", lists_path, escape_literal(name));
    if select_elements(tree, &xpath)?.is_empty() {
        return Err(Error::not_found(name, format!("no k-point list named '{}'", name)));
    }
    let selection_path = schema.tag_path("kPointListSelection", &PathSpec::default())?;
    let selection = single(tree, &selection_path, "kPointListSelection")?;
    tree.set_attribute(selection, "listName", name);
    Ok(())
}

/// Select the k-point list `name` for the calculation.
pub fn switch_kpointset(tree: &mut XmlTree, schema: &SchemaDescriptor, name: &str) -> Result<()> {
    type SwitchFn = fn(&mut XmlTree, &SchemaDescriptor, &str) -> Result<()>;
    let table = VersionDispatch::new("switch_kpointset").register(VersionRange::since(NAMED_LISTS), select_list as SwitchFn);
    let implementation = table.select(schema.version())?;
    implementation(tree, schema, name)
}

fn legacy_only(operation: &'static str, schema: &SchemaDescriptor) -> Result<()> {
    VersionDispatch::new(operation)
        .register(VersionRange::before(NAMED_LISTS), ())
        .select(schema.version())
        .map(|_| ())
}

fn set_kpoint_count(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    count: u64,
    gamma: bool,
) -> Result<(NodeId, String)> {
    if count == 0 {
        return Err(Error::InvalidArgument("k-point count must be positive".to_string()));
    }
    let bz_path = schema.tag_path("bzIntegration", &PathSpec::default())?;
    let bz = single(tree, &bz_path, "bzIntegration")?;
    let node = replace_kpoint_set(tree, schema, bz, &bz_path, "kPointCount")?;
    tree.set_attribute(node, "count", count.to_string());
    tree.set_attribute(node, "gamma", gamma.to_string());
    Ok((node, format!("{}/kPointCount", bz_path)))
}

/// Replace the k-point set by an automatically generated set of `count`
/// points.
pub fn set_nkpts(tree: &mut XmlTree, schema: &SchemaDescriptor, count: u64, gamma: bool) -> Result<()> {
    legacy_only("set_nkpts", schema)?;
    set_kpoint_count(tree, schema, count, gamma).map(|_| ())
}

/// Replace the k-point set by `count` points along a path through the
/// named special points.
pub fn set_kpath(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    kpath: &[(String, [f64; 3])],
    count: u64,
    gamma: bool,
) -> Result<()> {
    legacy_only("set_kpath", schema)?;
    let (node, node_path) = set_kpoint_count(tree, schema, count, gamma)?;
    for (name, point) in kpath {
        let special = create_child(tree, schema, node, &node_path, "specialPoint")?;
        tree.set_attribute(special, "name", name.as_str());
        tree.set_text(special, vector_text(point));
    }
    Ok(())
}
