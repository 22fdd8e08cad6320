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

use super::basic::{add_number_to_attrib, apply_attrib_tree, ShiftMode};
use super::species::{atomgroup_base, species_base, species_with_label};
use super::{label_predicate, selector_predicate, Target};
use crate::attrib_tree::AttribTree;
use crate::error::{Error, Result};
use crate::path_builder::{build_xpath, PathFilters, TagFilter};
use crate::schema::SchemaDescriptor;
use crate::tree::XmlTree;
use crate::xpath::select_elements;

/// Apply `changes` to atom groups, picked by 1-based `position`, by the
/// `species` selector of the group, or both. Without either, every group
/// is changed. Missing subtags are created.
pub fn set_atomgroup(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    changes: &AttribTree,
    position: Option<usize>,
    species: Option<&str>,
    filters: &PathFilters,
) -> Result<usize> {
    let mut base = atomgroup_base(schema)?;
    if let Some(selector) = species {
        base.push_str(&selector_predicate("species", selector));
    }
    match position {
        Some(0) => return Err(Error::InvalidArgument("atom group positions start at 1".to_string())),
        Some(position) => base.push_str(&format!("[{}]", position)),
        None => {}
    }
    let xpath = build_xpath(&base, filters, false)?;
    let groups = select_elements(tree, &xpath)?;
    if groups.is_empty() {
        return Err(Error::not_found("atomGroup", format!("no atom group matches '{}'", xpath)));
    }
    for &group in &groups {
        apply_attrib_tree(tree, schema, group, changes, true)?;
    }
    Ok(groups.len())
}

/// [`set_atomgroup`] for the groups containing an atom labelled `label`.
pub fn set_atomgroup_label(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    label: &str,
    changes: &AttribTree,
) -> Result<usize> {
    if label == "all" {
        return set_atomgroup(tree, schema, changes, None, None, &PathFilters::new());
    }
    let xpath = format!("{}{}", atomgroup_base(schema)?, label_predicate(label));
    let groups = select_elements(tree, &xpath)?;
    if groups.is_empty() {
        return Err(Error::not_found(label, format!("no atom with label '{}'", label)));
    }
    for &group in &groups {
        apply_attrib_tree(tree, schema, group, changes, true)?;
    }
    Ok(groups.len())
}

/// Shift a numeric species attribute for the species of the atoms labelled
/// `label` (`all` for every species).
pub fn shift_value_species_label(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    label: &str,
    attribute: &str,
    number: f64,
    mode: ShiftMode,
) -> Result<usize> {
    let target = Target::default().contains(format!("{}/", species_base(schema)?));
    if label == "all" {
        return add_number_to_attrib(tree, schema, attribute, number, mode, &target);
    }
    let mut count = 0;
    for name in species_with_label(tree, schema, label)? {
        let target = target
            .clone()
            .filter("species", TagFilter::equals("name", name.as_str()));
        count += add_number_to_attrib(tree, schema, attribute, number, mode, &target)?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaKind, SchemaRegistry};
    use crate::xpath::select_values;
    use crate::ErrorKind;
    use std::sync::Arc;

    fn setup() -> (XmlTree, Arc<SchemaDescriptor>) {
        let schema = SchemaRegistry::default().get(SchemaKind::Input, "0.34").unwrap();
        (XmlTree::parse(masci_test::fixtures::fe_pt_inp()).unwrap(), schema)
    }

    fn noco(alpha: f64) -> AttribTree {
        AttribTree::new().with_tag(
            "nocoParams",
            AttribTree::new().with_value("alpha", alpha).with_value("beta", 0.0),
        )
    }

    #[test]
    fn test_set_atomgroup_creates_subtags() {
        let (mut tree, schema) = setup();
        set_atomgroup(&mut tree, &schema, &noco(1.5), None, Some("Pt-1"), &PathFilters::new()).unwrap();
        assert_eq!(select_values(&tree, "//atomGroup/nocoParams/@alpha").unwrap(), vec!["1.5"]);
        assert_eq!(
            select_values(&tree, "//atomGroup[@species='Pt-1']/nocoParams/@beta").unwrap(),
            vec!["0.0"]
        );
        assert!(schema.validate(&tree).is_ok());

        set_atomgroup(&mut tree, &schema, &noco(0.5), Some(1), None, &PathFilters::new()).unwrap();
        assert_eq!(
            select_values(&tree, "//atomGroup/nocoParams/@alpha").unwrap(),
            vec!["0.5", "1.5"]
        );
        let err = set_atomgroup(&mut tree, &schema, &noco(0.5), Some(7), None, &PathFilters::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
    }

    #[test]
    fn test_set_atomgroup_label() {
        let (mut tree, schema) = setup();
        set_atomgroup_label(&mut tree, &schema, "1", &noco(0.25)).unwrap();
        assert_eq!(
            select_values(&tree, "//atomGroup[@species='Fe-1']/nocoParams/@alpha").unwrap(),
            vec!["0.25"]
        );
        set_atomgroup_label(&mut tree, &schema, "all", &noco(0.75)).unwrap();
        assert_eq!(
            select_values(&tree, "//atomGroup/nocoParams/@alpha").unwrap(),
            vec!["0.75", "0.75"]
        );
    }

    #[test]
    fn test_shift_value_species_label() {
        let (mut tree, schema) = setup();
        shift_value_species_label(&mut tree, &schema, "1", "radius", 0.1, ShiftMode::Abs).unwrap();
        assert_eq!(
            select_values(&tree, "//species/mtSphere/@radius").unwrap(),
            vec!["2.3", "2.3"]
        );
        shift_value_species_label(&mut tree, &schema, "all", "lmax", 2.0, ShiftMode::Abs).unwrap();
        assert_eq!(
            select_values(&tree, "//species/atomicCutoffs/@lmax").unwrap(),
            vec!["12", "12"]
        );
        let err = shift_value_species_label(&mut tree, &schema, "1", "l_amf", 1.0, ShiftMode::Abs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
