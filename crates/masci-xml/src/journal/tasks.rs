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

//! Recorded operations and their arguments.

use crate::attrib_tree::AttribTree;
use crate::error::Result;
use crate::mutators::{
    xml_create_tag, xml_delete_att, xml_delete_tag, xml_replace_tag, xml_set_attrib_value_no_create,
    xml_set_text_no_create, CreateOptions, NewTag,
};
use crate::nmmpmat::{
    align_nmmpmat_to_sqa, rotate_nmmpmat, set_nmmpmat, DensityLayout, DensityMatrix, Occupations, Rotation,
};
use crate::path_builder::PathFilters;
use crate::schema::{PathSpec, SchemaDescriptor};
use crate::setters::{self, KPointListOptions, ShiftMode, Target};
use crate::tree::XmlTree;
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The three groups of operations a journal dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskFamily {
    /// Plain XPath mutators, no schema involved.
    Xpath,
    /// Setters resolving names through the schema.
    Schema,
    /// Edits of the `n_mmp_mat` density matrix.
    DensityMatrix,
}

macro_rules! tasks {
    ($($family:ident { $($(#[$doc:meta])* $variant:ident($args:ty) => $name:tt,)* })*) => {
        /// One recorded operation.
        ///
        /// Serialized as `{"<operation>": {<arguments>}}`.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum Task {
            $($(
                $(#[$doc])*
                #[serde(rename = $name)]
                $variant($args),
            )*)*
        }

        impl Task {
            /// Operation name, as used in task lists.
            pub fn operation(&self) -> &'static str {
                match self {
                    $($(Task::$variant(_) => $name,)*)*
                }
            }

            pub fn family(&self) -> TaskFamily {
                match self {
                    $($(Task::$variant(_) => TaskFamily::$family,)*)*
                }
            }
        }

        /// Every operation name with its family.
        pub const OPERATIONS: &[(&str, TaskFamily)] = &[
            $($(($name, TaskFamily::$family),)*)*
        ];
    };
}

tasks! {
    Xpath {
        XmlCreateTag(XmlCreateTagArgs) => "xml_create_tag",
        XmlDeleteTag(XmlDeleteArgs) => "xml_delete_tag",
        XmlDeleteAtt(XmlDeleteAttArgs) => "xml_delete_att",
        XmlReplaceTag(XmlReplaceTagArgs) => "xml_replace_tag",
        XmlSetAttribValueNoCreate(XmlSetAttribArgs) => "xml_set_attrib_value_no_create",
        XmlSetTextNoCreate(XmlSetTextArgs) => "xml_set_text_no_create",
    }
    Schema {
        SetInpchanges(SetInpchangesArgs) => "set_inpchanges",
        ShiftValue(ShiftValueArgs) => "shift_value",
        SetSpecies(SetSpeciesArgs) => "set_species",
        SetSpeciesLabel(SetSpeciesLabelArgs) => "set_species_label",
        CloneSpecies(CloneSpeciesArgs) => "clone_species",
        SwitchSpecies(SwitchSpeciesArgs) => "switch_species",
        SwitchSpeciesLabel(SwitchSpeciesLabelArgs) => "switch_species_label",
        SetAtomgroup(SetAtomgroupArgs) => "set_atomgroup",
        SetAtomgroupLabel(SetAtomgroupLabelArgs) => "set_atomgroup_label",
        ShiftValueSpeciesLabel(ShiftValueSpeciesLabelArgs) => "shift_value_species_label",
        SetKpointlist(SetKpointlistArgs) => "set_kpointlist",
        SwitchKpointset(SwitchKpointsetArgs) => "switch_kpointset",
        SetNkpts(SetNkptsArgs) => "set_nkpts",
        SetKpath(SetKpathArgs) => "set_kpath",
        CreateTag(CreateTagArgs) => "create_tag",
        DeleteTag(NamedTargetArgs) => "delete_tag",
        DeleteAtt(NamedTargetArgs) => "delete_att",
        ReplaceTag(ReplaceTagArgs) => "replace_tag",
        SetAttribValue(SetValueArgs) => "set_attrib_value",
        SetFirstAttribValue(SetValueArgs) => "set_first_attrib_value",
        SetText(SetValueArgs) => "set_text",
        SetFirstText(SetValueArgs) => "set_first_text",
        SetSimpleTag(SetSimpleTagArgs) => "set_simple_tag",
        SetComplexTag(SetComplexTagArgs) => "set_complex_tag",
        AddNumberToAttrib(AddNumberArgs) => "add_number_to_attrib",
        AddNumberToFirstAttrib(AddNumberArgs) => "add_number_to_first_attrib",
    }
    DensityMatrix {
        SetNmmpmat(SetNmmpmatArgs) => "set_nmmpmat",
        RotateNmmpmat(RotateNmmpmatArgs) => "rotate_nmmpmat",
        AlignNmmpmatToSqa(AlignNmmpmatArgs) => "align_nmmpmat_to_sqa",
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn all_species() -> String {
    "all".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlCreateTagArgs {
    pub xpath: String,
    pub element: NewTag,
    #[serde(flatten)]
    pub options: CreateOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlDeleteArgs {
    pub xpath: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub must_exist: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlDeleteAttArgs {
    pub xpath: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<Vec<i64>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub must_exist: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlReplaceTagArgs {
    pub xpath: String,
    pub element: NewTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<Vec<i64>>,
}

/// A list value sets one match each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlSetAttribArgs {
    pub xpath: String,
    pub name: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlSetTextArgs {
    pub xpath: String,
    pub text: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrences: Option<Vec<i64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetInpchangesArgs {
    pub changes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub path_spec: BTreeMap<String, PathSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftValueArgs {
    pub changes: BTreeMap<String, f64>,
    #[serde(default)]
    pub mode: ShiftMode,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub path_spec: BTreeMap<String, PathSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSpeciesArgs {
    pub species_name: String,
    pub changes: AttribTree,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: PathFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSpeciesLabelArgs {
    pub atom_label: String,
    pub changes: AttribTree,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneSpeciesArgs {
    pub species_name: String,
    pub new_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<AttribTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchSpeciesArgs {
    pub new_species_name: String,
    /// 1-based atom group positions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub clone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<AttribTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchSpeciesLabelArgs {
    pub atom_label: String,
    pub new_species_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub clone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<AttribTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAtomgroupArgs {
    pub changes: AttribTree,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: PathFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetAtomgroupLabelArgs {
    pub atom_label: String,
    pub changes: AttribTree,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftValueSpeciesLabelArgs {
    pub atom_label: String,
    pub attribute_name: String,
    pub number: f64,
    #[serde(default)]
    pub mode: ShiftMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetKpointlistArgs {
    pub kpoints: Vec<[f64; 3]>,
    pub weights: Vec<f64>,
    #[serde(flatten)]
    pub options: KPointListOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchKpointsetArgs {
    pub list_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetNkptsArgs {
    pub count: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub gamma: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetKpathArgs {
    /// Special points in path order.
    pub kpath: Vec<(String, [f64; 3])>,
    pub count: u64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub gamma: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTagArgs {
    pub tag: NewTag,
    #[serde(default)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create_parents: bool,
}

/// Arguments of operations addressing one tag or attribute name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTargetArgs {
    pub name: String,
    #[serde(default)]
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceTagArgs {
    pub name: String,
    pub element: NewTag,
    #[serde(default)]
    pub target: Target,
}

/// Arguments of the attribute and text setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetValueArgs {
    pub name: String,
    pub value: Value,
    #[serde(default)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSimpleTagArgs {
    pub name: String,
    pub changes: Vec<AttribTree>,
    #[serde(default)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create_parents: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetComplexTagArgs {
    pub name: String,
    pub changes: AttribTree,
    #[serde(default)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "is_false")]
    pub create: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddNumberArgs {
    pub name: String,
    pub number: f64,
    #[serde(default)]
    pub mode: ShiftMode,
    #[serde(default)]
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetNmmpmatArgs {
    pub species_name: String,
    pub orbital: u8,
    /// 1-based spin block.
    pub spin: usize,
    #[serde(flatten)]
    pub occupations: Occupations,
    #[serde(flatten)]
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotateNmmpmatArgs {
    pub species_name: String,
    pub orbital: u8,
    #[serde(flatten)]
    pub rotation: Rotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignNmmpmatArgs {
    #[serde(default = "all_species")]
    pub species_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orbital: Option<u8>,
}

fn texts(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items.iter().map(ToString::to_string).collect(),
        other => vec![other.to_string()],
    }
}

fn with_matrix(
    tree: &XmlTree,
    schema: &SchemaDescriptor,
    matrix: &mut Option<DensityMatrix>,
    edit: impl FnOnce(&mut DensityMatrix) -> Result<usize>,
) -> Result<()> {
    let layout = DensityLayout::from_tree(tree, schema)?;
    let mut current = match matrix.take() {
        Some(existing) => existing.relayout(layout),
        None => DensityMatrix::zeros(layout),
    };
    let result = edit(&mut current);
    *matrix = Some(current);
    result.map(drop)
}

fn fragment(tag: &NewTag) -> XmlTree {
    match tag {
        NewTag::Name(name) => XmlTree::new(name),
        NewTag::Fragment(tree) => tree.clone(),
    }
}

impl Task {
    /// Carry out the task. Density matrix tasks re-lay out `matrix` for the
    /// current tree first and create it if there is none yet.
    pub(crate) fn run(
        &self,
        tree: &mut XmlTree,
        schema: &SchemaDescriptor,
        matrix: &mut Option<DensityMatrix>,
    ) -> Result<()> {
        match self {
            Task::SetNmmpmat(a) => with_matrix(tree, schema, matrix, |m| {
                set_nmmpmat(m, &a.species_name, a.orbital, a.spin, &a.occupations, Some(a.rotation))
            })?,
            Task::RotateNmmpmat(a) => with_matrix(tree, schema, matrix, |m| {
                rotate_nmmpmat(m, &a.species_name, a.orbital, a.rotation)
            })?,
            Task::AlignNmmpmatToSqa(a) => {
                let tree: &XmlTree = tree;
                with_matrix(tree, schema, matrix, |m| {
                    align_nmmpmat_to_sqa(tree, schema, m, &a.species_name, a.orbital)
                })?
            }
            Task::XmlCreateTag(a) => {
                xml_create_tag(tree, &a.xpath, &a.element, &a.options)?;
            }
            Task::XmlDeleteTag(a) => {
                xml_delete_tag(tree, &a.xpath, a.occurrences.as_deref(), a.must_exist)?;
            }
            Task::XmlDeleteAtt(a) => {
                xml_delete_att(tree, &a.xpath, &a.name, a.occurrences.as_deref(), a.must_exist)?;
            }
            Task::XmlReplaceTag(a) => {
                xml_replace_tag(tree, &a.xpath, &fragment(&a.element), a.occurrences.as_deref())?;
            }
            Task::XmlSetAttribValueNoCreate(a) => {
                xml_set_attrib_value_no_create(tree, &a.xpath, &a.name, &texts(&a.value), a.occurrences.as_deref())?;
            }
            Task::XmlSetTextNoCreate(a) => {
                xml_set_text_no_create(tree, &a.xpath, &texts(&a.text), a.occurrences.as_deref())?;
            }
            Task::SetInpchanges(a) => setters::set_inpchanges(tree, schema, &a.changes, &a.path_spec)?,
            Task::ShiftValue(a) => setters::shift_value(tree, schema, &a.changes, a.mode, &a.path_spec)?,
            Task::SetSpecies(a) => {
                setters::set_species(tree, schema, &a.species_name, &a.changes, a.create, &a.filters)?;
            }
            Task::SetSpeciesLabel(a) => {
                setters::set_species_label(tree, schema, &a.atom_label, &a.changes, a.create)?;
            }
            Task::CloneSpecies(a) => {
                setters::clone_species(tree, schema, &a.species_name, &a.new_name, a.changes.as_ref())?;
            }
            Task::SwitchSpecies(a) => {
                setters::switch_species(
                    tree,
                    schema,
                    &a.new_species_name,
                    a.position.as_deref(),
                    a.species.as_deref(),
                    a.clone,
                    a.changes.as_ref(),
                )?;
            }
            Task::SwitchSpeciesLabel(a) => {
                setters::switch_species_label(
                    tree,
                    schema,
                    &a.atom_label,
                    &a.new_species_name,
                    a.clone,
                    a.changes.as_ref(),
                )?;
            }
            Task::SetAtomgroup(a) => {
                setters::set_atomgroup(tree, schema, &a.changes, a.position, a.species.as_deref(), &a.filters)?;
            }
            Task::SetAtomgroupLabel(a) => {
                setters::set_atomgroup_label(tree, schema, &a.atom_label, &a.changes)?;
            }
            Task::ShiftValueSpeciesLabel(a) => {
                setters::shift_value_species_label(tree, schema, &a.atom_label, &a.attribute_name, a.number, a.mode)?;
            }
            Task::SetKpointlist(a) => setters::set_kpointlist(tree, schema, &a.kpoints, &a.weights, &a.options)?,
            Task::SwitchKpointset(a) => setters::switch_kpointset(tree, schema, &a.list_name)?,
            Task::SetNkpts(a) => setters::set_nkpts(tree, schema, a.count, a.gamma)?,
            Task::SetKpath(a) => setters::set_kpath(tree, schema, &a.kpath, a.count, a.gamma)?,
            Task::CreateTag(a) => {
                setters::create_tag(tree, schema, &a.tag, &a.target, a.create_parents)?;
            }
            Task::DeleteTag(a) => {
                setters::delete_tag(tree, schema, &a.name, &a.target)?;
            }
            Task::DeleteAtt(a) => {
                setters::delete_att(tree, schema, &a.name, &a.target)?;
            }
            Task::ReplaceTag(a) => {
                setters::replace_tag(tree, schema, &a.name, &fragment(&a.element), &a.target)?;
            }
            Task::SetAttribValue(a) => {
                setters::set_attrib_value(tree, schema, &a.name, &a.value, &a.target, a.create)?;
            }
            Task::SetFirstAttribValue(a) => {
                setters::set_first_attrib_value(tree, schema, &a.name, &a.value, &a.target, a.create)?;
            }
            Task::SetText(a) => {
                setters::set_text(tree, schema, &a.name, &a.value, &a.target, a.create)?;
            }
            Task::SetFirstText(a) => {
                setters::set_first_text(tree, schema, &a.name, &a.value, &a.target, a.create)?;
            }
            Task::SetSimpleTag(a) => {
                setters::set_simple_tag(tree, schema, &a.name, &a.changes, &a.target, a.create_parents)?;
            }
            Task::SetComplexTag(a) => {
                setters::set_complex_tag(tree, schema, &a.name, &a.changes, &a.target, a.create)?;
            }
            Task::AddNumberToAttrib(a) => {
                setters::add_number_to_attrib(tree, schema, &a.name, a.number, a.mode, &a.target)?;
            }
            Task::AddNumberToFirstAttrib(a) => {
                setters::add_number_to_first_attrib(tree, schema, &a.name, a.number, a.mode, &a.target)?;
            }
        }
        Ok(())
    }
}
