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

//! Generic setters for tags, attributes and texts.

use super::{create_child, ensure_tag, node_path, resolve_attrib, resolve_tag, Target};
use crate::attrib_tree::{AttribNode, AttribTree};
use crate::error::{Error, Result};
use crate::mutators::{
    select_occurrences, xml_create_tag, xml_delete_att, xml_delete_tag, xml_replace_tag,
    xml_set_attrib_value_no_create, xml_set_text_no_create, CreateOptions, NewTag,
};
use crate::path_builder::build_xpath;
use crate::schema::{AttribCategory, PathSpec, SchemaDescriptor};
use crate::tree::{NodeId, XmlTree};
use crate::types::{convert_value, format_float, parse_scalar, AttribType, ScalarType, Value};
use crate::xpath::{select_elements, split_last_step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How [`shift_value`] combines the current value with the given number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftMode {
    /// `value + delta`
    #[default]
    Abs,
    /// `value * (1 + delta)`
    Rel,
}

impl ShiftMode {
    fn apply(self, current: f64, delta: f64) -> f64 {
        match self {
            ShiftMode::Abs => current + delta,
            ShiftMode::Rel => current * (1.0 + delta),
        }
    }
}

/// Texts for every match: a list for a scalar type gives one value per
/// match, a list of lists does the same for list types.
fn texts_for(name: &str, value: &Value, kind: &AttribType) -> Result<Vec<String>> {
    match (kind, value) {
        (AttribType::Scalar(_), Value::List(items)) => {
            items.iter().map(|item| convert_value(name, item, kind)).collect()
        }
        (AttribType::List(_), Value::List(items))
            if !items.is_empty() && items.iter().all(|item| matches!(item, Value::List(_))) =>
        {
            items.iter().map(|item| convert_value(name, item, kind)).collect()
        }
        _ => Ok(vec![convert_value(name, value, kind)?]),
    }
}

/// Create a tag (name or subtree) at its schema location.
///
/// Tags that may occur only once are not created a second time.
pub fn create_tag(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    tag: &NewTag,
    target: &Target,
    create_parents: bool,
) -> Result<Vec<NodeId>> {
    let canonical = schema.tag_path(tag.name(), &target.spec)?;
    let (parent_canonical, name) = split_last_step(&canonical);
    let parent_info = schema.tag_info(parent_canonical)?;
    let parent_xpath = build_xpath(parent_canonical, &target.filters, true)?;

    if create_parents {
        ensure_tag(tree, schema, parent_canonical, &parent_xpath)?;
    }

    let tag = match tag {
        // Use the schema casing of the name
        NewTag::Name(_) => NewTag::Name(name.to_string()),
        fragment => fragment.clone(),
    };

    if !parent_info.is_several(name) {
        let parents = select_elements(tree, &parent_xpath)?;
        let parents = select_occurrences(&parents, target.occurrences.as_deref())?;
        if parents
            .iter()
            .any(|&parent| tree.first_child_named(parent, name).is_some())
        {
            return Err(Error::InvalidArgument(format!(
                "'{}' already exists and may occur only once",
                name
            )));
        }
    }

    let options = CreateOptions {
        order: Some(parent_info.order.clone()),
        occurrences: target.occurrences.clone(),
        ..Default::default()
    };
    xml_create_tag(tree, &parent_xpath, &tag, &options)
}

/// Delete tags by name. Returns the number of deleted tags.
pub fn delete_tag(tree: &mut XmlTree, schema: &SchemaDescriptor, name: &str, target: &Target) -> Result<usize> {
    let tag = resolve_tag(schema, name, target)?;
    xml_delete_tag(tree, &tag.xpath, target.occurrences.as_deref(), false)
}

/// Delete an attribute by name. Returns the number of removed attributes.
pub fn delete_att(tree: &mut XmlTree, schema: &SchemaDescriptor, name: &str, target: &Target) -> Result<usize> {
    let attrib = resolve_attrib(schema, name, target)?;
    xml_delete_att(
        tree,
        &attrib.tag.xpath,
        &attrib.name,
        target.occurrences.as_deref(),
        false,
    )
}

/// Replace tags by name with copies of `replacement`.
pub fn replace_tag(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    replacement: &XmlTree,
    target: &Target,
) -> Result<usize> {
    let tag = resolve_tag(schema, name, target)?;
    xml_replace_tag(tree, &tag.xpath, replacement, target.occurrences.as_deref())
}

/// Set an attribute by name.
///
/// With `create`, missing tags on the way are created; otherwise a missing
/// tag is a `PathNotFound` error.
pub fn set_attrib_value(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    value: &Value,
    target: &Target,
    create: bool,
) -> Result<usize> {
    let attrib = resolve_attrib(schema, name, target)?;
    let kind = schema.attribute_type(&attrib.name, &attrib.tag.canonical)?;
    let texts = texts_for(&attrib.name, value, &kind)?;
    if create {
        ensure_tag(tree, schema, &attrib.tag.canonical, &attrib.tag.xpath)?;
    }
    xml_set_attrib_value_no_create(
        tree,
        &attrib.tag.xpath,
        &attrib.name,
        &texts,
        target.occurrences.as_deref(),
    )
}

/// [`set_attrib_value`] on the first match only.
pub fn set_first_attrib_value(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    value: &Value,
    target: &Target,
    create: bool,
) -> Result<usize> {
    set_attrib_value(tree, schema, name, value, &target.first(), create)
}

/// Set the text of a tag by name.
pub fn set_text(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    text: &Value,
    target: &Target,
    create: bool,
) -> Result<usize> {
    let tag = resolve_tag(schema, name, target)?;
    let kind = schema.text_type(&tag.canonical)?;
    let texts = texts_for(name, text, &kind)?;
    if create {
        ensure_tag(tree, schema, &tag.canonical, &tag.xpath)?;
    }
    xml_set_text_no_create(tree, &tag.xpath, &texts, target.occurrences.as_deref())
}

/// [`set_text`] on the first match only.
pub fn set_first_text(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    text: &Value,
    target: &Target,
    create: bool,
) -> Result<usize> {
    set_text(tree, schema, name, text, &target.first(), create)
}

pub(super) fn set_typed_attribute(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    node: NodeId,
    canonical: &str,
    name: &str,
    value: &Value,
) -> Result<()> {
    let info = schema.tag_info(canonical)?;
    let attribute = info
        .attribute(name)
        .ok_or_else(|| Error::not_found(name, format!("'{}' has no attribute '{}'", canonical, name)))?
        .to_string();
    let kind = schema.attribute_type(&attribute, canonical)?;
    let text = convert_value(&attribute, value, &kind)?;
    tree.set_attribute(node, &attribute, text);
    Ok(())
}

/// Replace all instances of a tag that only carries attributes.
///
/// For a repeatable tag every existing instance below the selected parents
/// is removed and one tag per entry of `changes` is created. A tag that can
/// occur only once takes exactly one entry, which is merged into the
/// existing tag (created if missing).
pub fn set_simple_tag(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    changes: &[AttribTree],
    target: &Target,
    create_parents: bool,
) -> Result<()> {
    let tag = resolve_tag(schema, name, target)?;
    let (parent_canonical, tag_name) = split_last_step(&tag.canonical);
    let (parent_xpath, _) = split_last_step(&tag.xpath);
    let several = schema.tag_info(parent_canonical)?.is_several(tag_name);

    for change in changes {
        if let Some((key, _)) = change.iter().find(|(_, node)| !matches!(node, AttribNode::Value(_))) {
            return Err(Error::InvalidArgument(format!(
                "'{}' is a simple tag, '{}' must be an attribute value",
                tag_name, key
            )));
        }
    }
    if !several && changes.len() != 1 {
        return Err(Error::InvalidArgument(format!(
            "'{}' may occur only once, got {} entries",
            tag_name,
            changes.len()
        )));
    }

    let parents = if create_parents {
        ensure_tag(tree, schema, parent_canonical, parent_xpath)?
    } else {
        select_elements(tree, parent_xpath)?
    };
    if parents.is_empty() {
        return Err(Error::ParentMissing {
            tag: tag_name.to_string(),
            xpath: parent_xpath.to_string(),
        });
    }
    let parents = select_occurrences(&parents, target.occurrences.as_deref())?;

    for parent in parents {
        let existing = tree.children_named(parent, tag_name);
        let nodes = if several {
            for node in existing {
                tree.detach(node);
            }
            let mut created = Vec::with_capacity(changes.len());
            for _ in changes {
                created.push(create_child(tree, schema, parent, parent_canonical, tag_name)?);
            }
            created
        } else {
            match existing.first() {
                Some(&node) => vec![node],
                None => vec![create_child(tree, schema, parent, parent_canonical, tag_name)?],
            }
        };
        for (node, change) in nodes.into_iter().zip(changes) {
            for (key, entry) in change.iter() {
                if let AttribNode::Value(value) = entry {
                    set_typed_attribute(tree, schema, node, &tag.canonical, key, value)?;
                }
            }
        }
    }
    Ok(())
}

/// Apply nested changes to a tag with attributes and subtags.
pub fn set_complex_tag(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    changes: &AttribTree,
    target: &Target,
    create: bool,
) -> Result<usize> {
    let tag = resolve_tag(schema, name, target)?;
    let nodes = if create {
        ensure_tag(tree, schema, &tag.canonical, &tag.xpath)?
    } else {
        select_elements(tree, &tag.xpath)?
    };
    if nodes.is_empty() {
        return Err(Error::not_found(name, format!("no tag matches '{}'", tag.xpath)));
    }
    let nodes = select_occurrences(&nodes, target.occurrences.as_deref())?;
    for &node in &nodes {
        apply_attrib_tree(tree, schema, node, changes, create)?;
    }
    Ok(nodes.len())
}

/// Apply an [`AttribTree`] to one element.
///
/// Leaves set attributes or the text of simple subtags, branches descend into
/// subtags (created when missing and `create` is set). A list of branches
/// replaces all subtags of that name.
pub fn apply_attrib_tree(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    node: NodeId,
    changes: &AttribTree,
    create: bool,
) -> Result<()> {
    let canonical = node_path(tree, node);
    let info = schema.tag_info(&canonical)?.clone();

    for (key, entry) in changes.iter() {
        match entry {
            AttribNode::Value(value) => {
                if info.attribute(key).is_some() {
                    set_typed_attribute(tree, schema, node, &canonical, key, value)?;
                    continue;
                }
                let child_name = info
                    .child(key)
                    .filter(|child| info.is_simple(child))
                    .ok_or_else(|| {
                        Error::not_found(key, format!("'{}' has no attribute or text tag '{}'", canonical, key))
                    })?;
                let child_path = format!("{}/{}", canonical, child_name);
                let kind = schema.text_type(&child_path)?;
                let text = convert_value(child_name, value, &kind)?;
                let child = match tree.first_child_named(node, child_name) {
                    Some(child) => child,
                    None if create => create_child(tree, schema, node, &canonical, child_name)?,
                    None => {
                        return Err(Error::not_found(
                            child_name,
                            format!("no '{}' below '{}' (use create)", child_name, canonical),
                        ))
                    }
                };
                tree.set_text(child, text);
            }
            AttribNode::Tag(subtree) => {
                let child_name = info
                    .child(key)
                    .ok_or_else(|| Error::not_found(key, format!("'{}' has no subtag '{}'", canonical, key)))?
                    .to_string();
                let mut children = tree.children_named(node, &child_name);
                if children.is_empty() {
                    if !create {
                        return Err(Error::not_found(
                            child_name.as_str(),
                            format!("no '{}' below '{}' (use create)", child_name, canonical),
                        ));
                    }
                    children.push(create_child(tree, schema, node, &canonical, &child_name)?);
                }
                for child in children {
                    apply_attrib_tree(tree, schema, child, subtree, create)?;
                }
            }
            AttribNode::Tags(subtrees) => {
                let child_name = info
                    .child(key)
                    .ok_or_else(|| Error::not_found(key, format!("'{}' has no subtag '{}'", canonical, key)))?
                    .to_string();
                if subtrees.len() > 1 && !info.is_several(&child_name) {
                    return Err(Error::InvalidArgument(format!(
                        "'{}' may occur only once below '{}'",
                        child_name, canonical
                    )));
                }
                for existing in tree.children_named(node, &child_name) {
                    tree.detach(existing);
                }
                for subtree in subtrees {
                    let child = create_child(tree, schema, node, &canonical, &child_name)?;
                    apply_attrib_tree(tree, schema, child, subtree, true)?;
                }
            }
        }
    }
    Ok(())
}

/// Add `number` to a numeric attribute (or scale it, see [`ShiftMode`]).
pub fn add_number_to_attrib(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    number: f64,
    mode: ShiftMode,
    target: &Target,
) -> Result<usize> {
    let attrib = resolve_attrib(schema, name, target)?;
    let kind = schema.attribute_type(&attrib.name, &attrib.tag.canonical)?;
    let scalar = match &kind {
        AttribType::Scalar(scalar @ (ScalarType::Int | ScalarType::Float)) => scalar,
        _ => {
            return Err(Error::type_mismatch(&attrib.name, number, format!("a number ({} is {})", attrib.name, kind)));
        }
    };

    let nodes = select_elements(tree, &attrib.tag.xpath)?;
    let nodes = select_occurrences(&nodes, target.occurrences.as_deref())?;
    let mut changed = 0;
    for node in nodes {
        let current = match tree.attribute(node, &attrib.name) {
            Some(current) => current.to_string(),
            None => continue,
        };
        let current_value = parse_scalar(&attrib.name, &current, scalar)?
            .as_f64()
            .ok_or_else(|| Error::type_mismatch(&attrib.name, &current, kind.to_string()))?;
        let shifted = mode.apply(current_value, number);
        let text = match scalar {
            ScalarType::Int => {
                let rounded = shifted.round();
                if (shifted - rounded).abs() > 1e-9 {
                    return Err(Error::type_mismatch(&attrib.name, shifted, "int"));
                }
                format!("{}", rounded as i64)
            }
            _ => format_float(shifted),
        };
        tree.set_attribute(node, &attrib.name, text);
        changed += 1;
    }
    if changed == 0 {
        return Err(Error::not_found(
            attrib.name.as_str(),
            format!("no value of '{}' at '{}'", attrib.name, attrib.tag.xpath),
        ));
    }
    Ok(changed)
}

/// [`add_number_to_attrib`] on the first match only.
pub fn add_number_to_first_attrib(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    name: &str,
    number: f64,
    mode: ShiftMode,
    target: &Target,
) -> Result<usize> {
    add_number_to_attrib(tree, schema, name, number, mode, &target.first())
}

/// Set attributes (or texts) anywhere in the document by name.
///
/// Names are resolved to exactly one schema location; `path_spec` may give
/// disambiguation hints per name. Attributes of tags that occur once are
/// created together with their tag if needed.
pub fn set_inpchanges(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    changes: &BTreeMap<String, Value>,
    path_spec: &BTreeMap<String, PathSpec>,
) -> Result<()> {
    for (name, value) in changes {
        let spec = path_spec.get(name).cloned().unwrap_or_default();
        let target = Target {
            spec: spec.clone(),
            ..Default::default()
        };
        match schema.attribute_path(name, &spec) {
            Ok(_) => {
                let create = schema.attribute_category(name) == Some(AttribCategory::Unique);
                set_attrib_value(tree, schema, name, value, &target, create)?;
            }
            Err(err) if err.kind() == crate::ErrorKind::PathNotFound => {
                // Not an attribute: maybe the text of a simple tag
                let text_tag = schema
                    .tag_path(name, &spec)
                    .ok()
                    .filter(|path| schema.text_type(path).is_ok());
                match text_tag {
                    Some(_) => {
                        set_text(tree, schema, name, value, &target, true)?;
                    }
                    None => return Err(err),
                }
            }
            Err(err) => return Err(err),
        }
        tracing::debug!(name = %name, value = %value, "applied input change");
    }
    Ok(())
}

/// Shift numeric attributes by name (see [`ShiftMode`]).
pub fn shift_value(
    tree: &mut XmlTree,
    schema: &SchemaDescriptor,
    changes: &BTreeMap<String, f64>,
    mode: ShiftMode,
    path_spec: &BTreeMap<String, PathSpec>,
) -> Result<()> {
    for (name, delta) in changes {
        let target = Target {
            spec: path_spec.get(name).cloned().unwrap_or_default(),
            ..Default::default()
        };
        add_number_to_attrib(tree, schema, name, *delta, mode, &target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaKind, SchemaRegistry};
    use crate::xpath::select_values;
    use std::sync::Arc;

    fn setup() -> (XmlTree, Arc<SchemaDescriptor>) {
        let registry = SchemaRegistry::default();
        let schema = registry.get(SchemaKind::Input, "0.34").unwrap();
        (XmlTree::parse(masci_test::fixtures::fe_pt_inp()).unwrap(), schema)
    }

    fn values(tree: &XmlTree, xpath: &str) -> Vec<String> {
        select_values(tree, xpath).unwrap()
    }

    #[test]
    fn test_set_inpchanges_and_shift() {
        let (mut tree, schema) = setup();
        let changes = BTreeMap::from([("Kmax".to_string(), Value::Float(3.9))]);
        set_inpchanges(&mut tree, &schema, &changes, &BTreeMap::new()).unwrap();
        assert_eq!(values(&tree, "//cutoffs/@Kmax"), vec!["3.9"]);

        let shifts = BTreeMap::from([("Kmax".to_string(), 0.1)]);
        shift_value(&mut tree, &schema, &shifts, ShiftMode::Rel, &BTreeMap::new()).unwrap();
        assert_eq!(values(&tree, "//cutoffs/@Kmax"), vec!["4.29"]);

        shift_value(&mut tree, &schema, &shifts, ShiftMode::Abs, &BTreeMap::new()).unwrap();
        assert_eq!(values(&tree, "//cutoffs/@Kmax"), vec!["4.39"]);
        assert!(schema.validate(&tree).is_ok());
    }

    #[test]
    fn test_set_inpchanges_errors() {
        let (mut tree, schema) = setup();
        let changes = BTreeMap::from([("spinf".to_string(), Value::Float(1.5))]);
        let err = set_inpchanges(&mut tree, &schema, &changes, &BTreeMap::new()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PathAmbiguous);

        let spec = BTreeMap::from([("spinf".to_string(), PathSpec::default().contains("scfLoop"))]);
        set_inpchanges(&mut tree, &schema, &changes, &spec).unwrap();
        assert_eq!(values(&tree, "//scfLoop/@spinf"), vec!["1.5"]);

        let changes = BTreeMap::from([("notAnAttribute".to_string(), Value::Int(1))]);
        let err = set_inpchanges(&mut tree, &schema, &changes, &BTreeMap::new()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PathNotFound);

        let changes = BTreeMap::from([("itmax".to_string(), Value::from("many"))]);
        let err = set_inpchanges(&mut tree, &schema, &changes, &BTreeMap::new()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_bool_and_string_conversion() {
        let (mut tree, schema) = setup();
        let changes = BTreeMap::from([
            ("l_soc".to_string(), Value::from("T")),
            ("numbands".to_string(), Value::from("T")),
        ]);
        set_inpchanges(&mut tree, &schema, &changes, &BTreeMap::new()).unwrap();
        assert_eq!(values(&tree, "//soc/@l_soc"), vec!["true"]);
        assert_eq!(values(&tree, "//cutoffs/@numbands"), vec!["T"]);
        assert!(schema.validate(&tree).is_ok());
    }

    #[test]
    fn test_text_changes() {
        let (mut tree, schema) = setup();
        let changes = BTreeMap::from([("comment".to_string(), Value::from("edited"))]);
        set_inpchanges(&mut tree, &schema, &changes, &BTreeMap::new()).unwrap();
        assert_eq!(values(&tree, "/fleurInput/comment"), vec!["edited"]);

        set_first_text(
            &mut tree,
            &schema,
            "relPos",
            &Value::from(vec![0.25, 0.25, 0.25]),
            &Target::default(),
            false,
        )
        .unwrap();
        assert_eq!(values(&tree, "//atomGroup[1]/relPos[1]")[0], "0.25 0.25 0.25");
    }

    #[test]
    fn test_create_and_delete_tag() {
        let (mut tree, schema) = setup();
        create_tag(&mut tree, &schema, &NewTag::from("expertModes"), &Target::default(), false).unwrap();
        let err = create_tag(&mut tree, &schema, &NewTag::from("expertModes"), &Target::default(), false)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
        // inserted in schema order, after soc
        let setup_node = select_elements(&tree, "/fleurInput/calculationSetup").unwrap()[0];
        let names: Vec<_> = tree
            .element_children(setup_node)
            .filter_map(|c| tree.name(c))
            .collect();
        let soc = names.iter().position(|n| *n == "soc").unwrap();
        assert_eq!(names[soc + 1], "expertModes");

        assert_eq!(delete_tag(&mut tree, &schema, "expertModes", &Target::default()).unwrap(), 1);
        assert_eq!(delete_tag(&mut tree, &schema, "expertModes", &Target::default()).unwrap(), 0);
    }

    #[test]
    fn test_set_attrib_with_create() {
        let (mut tree, schema) = setup();
        let err = set_attrib_value(&mut tree, &schema, "gw", &Value::Int(1), &Target::default(), false)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PathNotFound);
        set_attrib_value(&mut tree, &schema, "gw", &Value::Int(1), &Target::default(), true).unwrap();
        assert_eq!(values(&tree, "//expertModes/@gw"), vec!["1"]);
        assert!(schema.validate(&tree).is_ok());
    }

    #[test]
    fn test_per_occurrence_values() {
        let (mut tree, schema) = setup();
        let target = Target::default().contains("species");
        set_attrib_value(
            &mut tree,
            &schema,
            "radius",
            &Value::from(vec![2.1, 2.3]),
            &target,
            false,
        )
        .unwrap();
        assert_eq!(values(&tree, "//species/mtSphere/@radius"), vec!["2.1", "2.3"]);

        set_first_attrib_value(&mut tree, &schema, "radius", &Value::Float(2.0), &target, false).unwrap();
        assert_eq!(values(&tree, "//species/mtSphere/@radius"), vec!["2.0", "2.3"]);
    }

    #[test]
    fn test_add_number_type_checks() {
        let (mut tree, schema) = setup();
        add_number_to_attrib(&mut tree, &schema, "itmax", 5.0, ShiftMode::Abs, &Target::default()).unwrap();
        assert_eq!(values(&tree, "//scfLoop/@itmax"), vec!["20"]);
        let err = add_number_to_attrib(&mut tree, &schema, "itmax", 0.5, ShiftMode::Abs, &Target::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TypeMismatch);
        let err = add_number_to_attrib(&mut tree, &schema, "imix", 1.0, ShiftMode::Abs, &Target::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TypeMismatch);

        // the stored value is read with the attribute's own type
        let node = select_elements(&tree, "//scfLoop").unwrap()[0];
        tree.set_attribute(node, "itmax", "20.5");
        let err = add_number_to_attrib(&mut tree, &schema, "itmax", 1.0, ShiftMode::Abs, &Target::default())
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::TypeMismatch);
        assert_eq!(values(&tree, "//scfLoop/@itmax"), vec!["20.5"]);
    }

    #[test]
    fn test_set_simple_tag() {
        let (mut tree, schema) = setup();
        let occupations: Vec<AttribTree> = serde_json::from_str(
            r#"[{"state": "(3d3/2)", "spinUp": 1.0, "spinDown": 0.5}, {"state": "(3d5/2)", "spinUp": 2, "spinDown": 1}]"#,
        )
        .unwrap();
        let target = Target::default().filter("species", crate::path_builder::TagFilter::equals("name", "Fe-1"));
        set_simple_tag(&mut tree, &schema, "stateOccupation", &occupations, &target, true).unwrap();
        assert_eq!(
            values(&tree, "//species[@name='Fe-1']/electronConfig/stateOccupation/@spinUp"),
            vec!["1.0", "2.0"]
        );
        assert!(schema.validate(&tree).is_ok(), "{:?}", schema.validate(&tree));

        let single: Vec<AttribTree> = serde_json::from_str(r#"[{"lmax": 8}, {"lmax": 9}]"#).unwrap();
        let err = set_simple_tag(&mut tree, &schema, "atomicCutoffs", &single, &target, false).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_set_complex_tag() {
        let (mut tree, schema) = setup();
        let changes: AttribTree =
            serde_json::from_str(r#"{"l_f": "F", "forcealpha": 0.5}"#).unwrap();
        set_complex_tag(&mut tree, &schema, "geometryOptimization", &changes, &Target::default(), true)
            .unwrap();
        assert_eq!(values(&tree, "//geometryOptimization/@l_f"), vec!["false"]);
        assert!(schema.validate(&tree).is_ok());

        let bad: AttribTree = serde_json::from_str(r#"{"nonsense": 1}"#).unwrap();
        let err = set_complex_tag(&mut tree, &schema, "geometryOptimization", &bad, &Target::default(), false)
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PathNotFound);
    }
}
