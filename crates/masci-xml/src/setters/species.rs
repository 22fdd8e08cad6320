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

//! Setters working on `species` tags and the species of atom groups.

use super::basic::apply_attrib_tree;
use super::{label_predicate, selector_predicate};
use crate::attrib_tree::AttribTree;
use crate::error::{Error, Result};
use crate::path_builder::{build_xpath, escape_literal, PathFilters};
use crate::schema::{PathSpec, SchemaDescriptor};
use crate::tree::{NodeId, XmlTree};
use crate::xpath::select_elements;

pub(crate) fn species_base(schema: &SchemaDescriptor) -> Result<String> {
    schema.tag_path("species", &PathSpec::default())
}

pub(crate) fn atomgroup_base(schema: &SchemaDescriptor) -> Result<String> {
    schema.tag_path("atomGroup", &PathSpec::default())
}

fn species_named(tree: &XmlTree, schema: &SchemaDescriptor, name: &str) -> Result<Vec<NodeId>> {
    let xpath = format!("{}[@name = {}]", species_base(schema)?, escape_literal(name));
    select_elements(tree, &xpath)
}

/// Names of the species used by atom groups with an atom labelled `label`,
/// in document order without repetitions.
pub(crate) fn species_with_label(tree: &XmlTree, schema: &SchemaDescriptor, label: &str) -> Result<Vec<String>> {
    let xpath = format!("{}{}", atomgroup_base(schema)?, label_predicate(label));
    let mut names: Vec<String> = Vec::new();
    for group in select_elements(tree, &xpath)? {
        if let Some(species) = tree.attribute(group, "species") {
            if !names.iter().any(|name| name == species) {
                names.push(species.to_string());
            }
        }
    }
    if names.is_empty() {
        return Err(Error::not_found(label, format!("no atom with label '{}'", label)));
    }
    Ok(names)
}

/// Apply `changes` to the species picked by `selector` (`all`,
/// `all-<substring>` or a name). Returns the number of changed species.
pub fn set_species(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    selector: &str,
    changes: &AttribTree,
    create: bool,
    filters: &PathFilters,
) -> Result<usize> {
    let base = format!("{}{}", species_base(schema)?, selector_predicate("name", selector));
    let xpath = build_xpath(&base, filters, false)?;
    let nodes = select_elements(tree, &xpath)?;
    if nodes.is_empty() {
        return Err(Error::not_found(selector, format!("no species matches '{}'", selector)));
    }
    for &node in &nodes {
        apply_attrib_tree(tree, schema, node, changes, create)?;
    }
    tracing::debug!(selector, count = nodes.len(), "changed species");
    Ok(nodes.len())
}

/// [`set_species`] for the species of the atoms labelled `label` (`all`
/// selects every species).
pub fn set_species_label(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    label: &str,
    changes: &AttribTree,
    create: bool,
) -> Result<usize> {
    if label == "all" {
        return set_species(tree, schema, "all", changes, create, &PathFilters::new());
    }
    let mut count = 0;
    for name in species_with_label(tree, schema, label)? {
        count += set_species(tree, schema, &name, changes, create, &PathFilters::new())?;
    }
    Ok(count)
}

/// Copy species `name` to `new_name`, placed right after the original, and
/// apply `changes` to the copy.
pub fn clone_species(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    new_name: &str,
    changes: Option<&AttribTree>,
) -> Result<NodeId> {
    let source = match species_named(tree, schema, name)?.as_slice() {
        [single] => *single,
        [] => return Err(Error::not_found(name, format!("no species named '{}'", name))),
        _ => {
            return Err(Error::InvalidArgument(format!(
                "species name '{}' is not unique",
                name
            )))
        }
    };
    if !species_named(tree, schema, new_name)?.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "species '{}' already exists",
            new_name
        )));
    }

    let copy = tree.deep_copy(source);
    tree.set_attribute(copy, "name", new_name);
    tree.insert_after(source, copy);
    if let Some(changes) = changes {
        apply_attrib_tree(tree, schema, copy, changes, true)?;
    }
    Ok(copy)
}

/// Point atom groups to species `new_name`.
///
/// The groups are picked either by 1-based `position` or by a `species`
/// selector applied to their current species. With `clone`, a missing
/// `new_name` is created as a copy of the current species of the first
/// group.
pub fn switch_species(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    new_name: &str,
    position: Option<&[usize]>,
    species: Option<&str>,
    clone: bool,
    changes: Option<&AttribTree>,
) -> Result<usize> {
    let base = atomgroup_base(schema)?;
    let groups = match (position, species) {
        (Some(positions), None) => {
            let all = select_elements(tree, &base)?;
            positions
                .iter()
                .map(|&position| {
                    position
                        .checked_sub(1)
                        .and_then(|index| all.get(index).copied())
                        .ok_or_else(|| {
                            Error::InvalidArgument(format!(
                                "atom group position {} out of range 1..={}",
                                position,
                                all.len()
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?
        }
        (None, Some(selector)) => {
            let xpath = format!("{}{}", base, selector_predicate("species", selector));
            select_elements(tree, &xpath)?
        }
        _ => {
            return Err(Error::InvalidArgument(
                "give exactly one of position and species".to_string(),
            ))
        }
    };
    if groups.is_empty() {
        return Err(Error::not_found(
            species.unwrap_or(new_name),
            "no atom group to switch",
        ));
    }
    switch_groups(tree, schema, &groups, new_name, clone, changes)
}

/// [`switch_species`] for the atom groups containing an atom labelled
/// `label`.
pub fn switch_species_label(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    label: &str,
    new_name: &str,
    clone: bool,
    changes: Option<&AttribTree>,
) -> Result<usize> {
    let xpath = format!("{}{}", atomgroup_base(schema)?, label_predicate(label));
    let groups = select_elements(tree, &xpath)?;
    if groups.is_empty() {
        return Err(Error::not_found(label, format!("no atom with label '{}'", label)));
    }
    switch_groups(tree, schema, &groups, new_name, clone, changes)
}

fn switch_groups(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    groups: &[NodeId],
    new_name: &str,
    clone: bool,
    changes: Option<&AttribTree>,
) -> Result<usize> {
    if species_named(tree, schema, new_name)?.is_empty() {
        if !clone {
            return Err(Error::not_found(
                new_name,
                format!("no species named '{}' (use clone to create it)", new_name),
            ));
        }
        let current = groups
            .first()
            .and_then(|&group| tree.attribute(group, "species"))
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidArgument("atom group without species".to_string()))?;
        clone_species(tree, schema, &current, new_name, changes)?;
    } else if let Some(changes) = changes {
        set_species(tree, schema, new_name, changes, true, &PathFilters::new())?;
    }

    for &group in groups {
        tree.set_attribute(group, "species", new_name);
    }
    tracing::debug!(species = new_name, groups = groups.len(), "switched species");
    Ok(groups.len())
}
