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

//! XSD validation of element trees.
//!
//! Child elements are matched against the content model greedily: each group
//! consumes as many children as it can, choices take the first alternative
//! that consumes anything. The FLEUR schemas are deterministic, so greedy
//! matching accepts exactly the valid documents.
//!
//! # Example
//!
//! ```rust
//! use masci_xml::schema::{SchemaValidator, ValidationError};
//!
//! let validator = SchemaValidator::from_xsd(r#"<?xml version="1.0"?>
//! <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!   <xs:element name="cutoffs">
//!     <xs:complexType>
//!       <xs:attribute name="Kmax" type="xs:double" use="required"/>
//!       <xs:attribute name="lmaxAPW" type="xs:positiveInteger" use="optional"/>
//!     </xs:complexType>
//!   </xs:element>
//! </xs:schema>"#)?;
//!
//! assert!(validator.validate_str(r#"<cutoffs Kmax="4.0" lmaxAPW="8"/>"#).is_ok());
//!
//! let err = validator.validate_str(r#"<cutoffs lmaxAPW="8"/>"#).unwrap_err();
//! assert!(matches!(err, ValidationError::RequiredAttributeMissing { .. }));
//! # Ok::<(), ValidationError>(())
//! ```

use super::xsd::{ComplexType, ElementDecl, Group, GroupKind, Particle, XsdSchema};
use crate::tree::{NodeId, NodeKind, XmlTree};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur during schema validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Schema parsing failed
    SchemaParseError {
        /// Description of the schema parsing error
        message: String,
    },

    /// XML document parsing failed
    DocumentParseError {
        /// Description of the document parsing error
        message: String,
    },

    /// Element validation failed
    ElementValidationError {
        /// Element name that failed validation
        element: String,
        /// Expected element or type
        expected: String,
        /// What was actually found
        found: String,
        /// Location of the element (if available)
        path: Option<String>,
    },

    /// Attribute validation failed
    AttributeValidationError {
        /// Element containing the attribute
        element: String,
        /// Attribute name that failed validation
        attribute: String,
        /// Description of the validation failure
        message: String,
        /// Location of the element (if available)
        path: Option<String>,
    },

    /// Type validation failed
    TypeValidationError {
        /// Element name
        name: String,
        /// Expected type
        expected_type: String,
        /// Value that failed validation
        value: String,
        /// Location of the element (if available)
        path: Option<String>,
    },

    /// Cardinality validation failed (minOccurs, maxOccurs)
    CardinalityError {
        /// Element name
        element: String,
        /// Minimum occurrences allowed
        min: usize,
        /// Maximum occurrences allowed (None = unbounded)
        max: Option<usize>,
        /// Actual occurrences found
        actual: usize,
        /// Location of the parent element (if available)
        path: Option<String>,
    },

    /// Required attribute missing
    RequiredAttributeMissing {
        /// Element name
        element: String,
        /// Missing attribute name
        attribute: String,
        /// Location of the element (if available)
        path: Option<String>,
    },

    /// Unknown element encountered
    UnknownElement {
        /// Element name that is not in schema
        element: String,
        /// Location of the element (if available)
        path: Option<String>,
    },

    /// Schema file not found
    SchemaNotFound {
        /// Path to schema file
        path: PathBuf,
    },

    /// I/O error reading schema
    IoError {
        /// Description of I/O error
        message: String,
    },
}

fn write_location(f: &mut fmt::Formatter<'_>, path: &Option<String>) -> fmt::Result {
    match path {
        Some(path) => write!(f, " at {}", path),
        None => Ok(()),
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::SchemaParseError { message } => {
                write!(f, "Schema parse error: {}", message)
            }
            ValidationError::DocumentParseError { message } => {
                write!(f, "Document parse error: {}", message)
            }
            ValidationError::ElementValidationError {
                element,
                expected,
                found,
                path,
            } => {
                write!(
                    f,
                    "Element validation failed for '{}': expected {}, found '{}'",
                    element, expected, found
                )?;
                write_location(f, path)
            }
            ValidationError::AttributeValidationError {
                element,
                attribute,
                message,
                path,
            } => {
                write!(
                    f,
                    "Attribute validation failed for '{}.{}': {}",
                    element, attribute, message
                )?;
                write_location(f, path)
            }
            ValidationError::TypeValidationError {
                name,
                expected_type,
                value,
                path,
            } => {
                write!(
                    f,
                    "Type validation failed for '{}': expected {}, found '{}'",
                    name, expected_type, value
                )?;
                write_location(f, path)
            }
            ValidationError::CardinalityError {
                element,
                min,
                max,
                actual,
                path,
            } => {
                write!(
                    f,
                    "Cardinality error for '{}': expected {}..{}, found {}",
                    element,
                    min,
                    max.map_or("unbounded".to_string(), |m| m.to_string()),
                    actual
                )?;
                write_location(f, path)
            }
            ValidationError::RequiredAttributeMissing {
                element,
                attribute,
                path,
            } => {
                write!(
                    f,
                    "Required attribute '{}' missing from element '{}'",
                    attribute, element
                )?;
                write_location(f, path)
            }
            ValidationError::UnknownElement { element, path } => {
                write!(f, "Unknown element '{}' not defined in schema", element)?;
                write_location(f, path)
            }
            ValidationError::SchemaNotFound { path } => {
                write!(f, "Schema file not found: {}", path.display())
            }
            ValidationError::IoError { message } => {
                write!(f, "I/O error: {}", message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// XSD Schema Validator
///
/// Validates element trees against an XSD schema.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: XsdSchema,
}

type Assignment<'d> = (NodeId, &'d ElementDecl);

impl SchemaValidator {
    /// Create a new validator from XSD schema string.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::SchemaParseError` if the schema is malformed.
    pub fn from_xsd(xsd: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            schema: XsdSchema::parse(xsd)?,
        })
    }

    /// Create a new validator from XSD schema file.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::SchemaNotFound` if file doesn't exist,
    /// `ValidationError::IoError` for I/O errors, or
    /// `ValidationError::SchemaParseError` if schema is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        if !path.exists() {
            return Err(ValidationError::SchemaNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).map_err(|e| ValidationError::IoError {
            message: e.to_string(),
        })?;

        Self::from_xsd(&content)
    }

    pub(crate) fn schema(&self) -> &XsdSchema {
        &self.schema
    }

    /// Parse and validate an XML document.
    pub fn validate_str(&self, xml: &str) -> Result<(), ValidationError> {
        let tree = XmlTree::parse(xml).map_err(|e| ValidationError::DocumentParseError {
            message: e.to_string(),
        })?;
        self.validate(&tree)
    }

    /// Validate a document tree against the schema.
    pub fn validate(&self, tree: &XmlTree) -> Result<(), ValidationError> {
        let root = tree.root();
        let root_name = tree.name(root).unwrap_or_default();

        let decl = self
            .schema
            .elements
            .iter()
            .find(|e| e.name == root_name)
            .ok_or_else(|| ValidationError::UnknownElement {
                element: root_name.to_string(),
                path: None,
            })?;

        self.validate_element(tree, root, decl, &format!("/{}", root_name))
    }

    fn validate_element(
        &self,
        tree: &XmlTree,
        node: NodeId,
        decl: &ElementDecl,
        path: &str,
    ) -> Result<(), ValidationError> {
        match self.schema.complex(&decl.type_ref) {
            Some(complex) => {
                self.validate_attributes(tree, node, &complex, path)?;
                match &complex.simple_content {
                    Some(simple) => {
                        self.validate_no_children(tree, node, path)?;
                        self.validate_text(tree, node, &decl.name, simple, path)
                    }
                    None => {
                        if !complex.mixed {
                            let text = direct_text(tree, node);
                            if !text.trim().is_empty() {
                                return Err(ValidationError::ElementValidationError {
                                    element: decl.name.clone(),
                                    expected: "no text content".to_string(),
                                    found: text,
                                    path: Some(path.to_string()),
                                });
                            }
                        }
                        self.validate_children(tree, node, &complex, path)
                    }
                }
            }
            None => {
                if let Some((attribute, _)) = tree
                    .attributes(node)
                    .iter()
                    .find(|(key, _)| !is_namespace_attribute(key))
                {
                    return Err(ValidationError::AttributeValidationError {
                        element: decl.name.clone(),
                        attribute: attribute.clone(),
                        message: "element has simple content and no attributes".to_string(),
                        path: Some(path.to_string()),
                    });
                }
                self.validate_no_children(tree, node, path)?;
                self.validate_text(tree, node, &decl.name, &decl.type_ref, path)
            }
        }
    }

    fn validate_text(
        &self,
        tree: &XmlTree,
        node: NodeId,
        name: &str,
        type_ref: &super::xsd::TypeRef,
        path: &str,
    ) -> Result<(), ValidationError> {
        let text = direct_text(tree, node);
        match self.schema.resolve_simple(type_ref) {
            Some(resolved) => {
                resolved
                    .check(&text)
                    .map_err(|expected_type| ValidationError::TypeValidationError {
                        name: name.to_string(),
                        expected_type,
                        value: text.clone(),
                        path: Some(path.to_string()),
                    })
            }
            None => Ok(()),
        }
    }

    fn validate_no_children(
        &self,
        tree: &XmlTree,
        node: NodeId,
        path: &str,
    ) -> Result<(), ValidationError> {
        match tree.element_children(node).next() {
            Some(child) => Err(ValidationError::UnknownElement {
                element: tree.name(child).unwrap_or_default().to_string(),
                path: Some(path.to_string()),
            }),
            None => Ok(()),
        }
    }

    /// Validate attributes against complex type definition
    fn validate_attributes(
        &self,
        tree: &XmlTree,
        node: NodeId,
        complex: &ComplexType,
        path: &str,
    ) -> Result<(), ValidationError> {
        let element_name = tree.name(node).unwrap_or_default();

        for (attribute, value) in tree.attributes(node) {
            if is_namespace_attribute(attribute) {
                continue;
            }
            let attr_def = complex
                .attributes
                .iter()
                .find(|a| a.name == *attribute)
                .ok_or_else(|| ValidationError::AttributeValidationError {
                    element: element_name.to_string(),
                    attribute: attribute.clone(),
                    message: "attribute is not declared in the schema".to_string(),
                    path: Some(path.to_string()),
                })?;

            if let Some(resolved) = self.schema.resolve_simple(&attr_def.type_ref) {
                resolved.check(value).map_err(|expected| {
                    ValidationError::AttributeValidationError {
                        element: element_name.to_string(),
                        attribute: attribute.clone(),
                        message: format!("Expected type {}, found '{}'", expected, value),
                        path: Some(path.to_string()),
                    }
                })?;
            }
        }

        for attr_def in complex.attributes.iter().filter(|a| a.required) {
            if tree.attribute(node, &attr_def.name).is_none() {
                return Err(ValidationError::RequiredAttributeMissing {
                    element: element_name.to_string(),
                    attribute: attr_def.name.clone(),
                    path: Some(path.to_string()),
                });
            }
        }

        Ok(())
    }

    /// Validate child elements against the content model
    fn validate_children(
        &self,
        tree: &XmlTree,
        node: NodeId,
        complex: &ComplexType,
        path: &str,
    ) -> Result<(), ValidationError> {
        let children: Vec<NodeId> = tree.element_children(node).collect();
        let mut assignments: Vec<Assignment> = Vec::with_capacity(children.len());

        let consumed = match &complex.content {
            Some(group) => self.match_group(tree, group, &children, 0, &mut assignments, path)?,
            None => 0,
        };

        if let Some(&extra) = children.get(consumed) {
            let name = tree.name(extra).unwrap_or_default().to_string();
            let declared = complex
                .content
                .as_ref()
                .map_or(false, |group| declares(group, &name));
            return Err(if declared {
                ValidationError::ElementValidationError {
                    element: tree.name(node).unwrap_or_default().to_string(),
                    expected: "children in schema order and count".to_string(),
                    found: name,
                    path: Some(path.to_string()),
                }
            } else {
                ValidationError::UnknownElement {
                    element: name,
                    path: Some(path.to_string()),
                }
            });
        }

        for (child, decl) in assignments {
            let child_path = format!("{}/{}", path, decl.name);
            self.validate_element(tree, child, decl, &child_path)?;
        }
        Ok(())
    }

    fn match_particle<'d>(
        &self,
        tree: &XmlTree,
        particle: &'d Particle,
        children: &[NodeId],
        pos: usize,
        out: &mut Vec<Assignment<'d>>,
        path: &str,
    ) -> Result<usize, ValidationError> {
        match particle {
            Particle::Element(decl) => {
                let limit = decl.max_occurs.unwrap_or(usize::MAX);
                let count = children[pos..]
                    .iter()
                    .take_while(|&&child| tree.name(child) == Some(decl.name.as_str()))
                    .take(limit)
                    .count();
                if count < decl.min_occurs {
                    return Err(ValidationError::CardinalityError {
                        element: decl.name.clone(),
                        min: decl.min_occurs,
                        max: decl.max_occurs,
                        actual: count,
                        path: Some(path.to_string()),
                    });
                }
                out.extend(children[pos..pos + count].iter().map(|&child| (child, decl)));
                Ok(pos + count)
            }
            Particle::Group(group) => self.match_group(tree, group, children, pos, out, path),
        }
    }

    fn match_group<'d>(
        &self,
        tree: &XmlTree,
        group: &'d Group,
        children: &[NodeId],
        pos: usize,
        out: &mut Vec<Assignment<'d>>,
        path: &str,
    ) -> Result<usize, ValidationError> {
        let mut current = pos;
        let mut iterations = 0usize;
        loop {
            if group.max_occurs.map_or(false, |max| iterations >= max) {
                break;
            }
            let checkpoint = out.len();
            match self.match_group_once(tree, group, children, current, out, path) {
                Ok(next) if next > current => {
                    current = next;
                    iterations += 1;
                }
                // An empty match satisfies every remaining repetition
                Ok(_) => break,
                Err(err) => {
                    out.truncate(checkpoint);
                    if iterations >= group.min_occurs {
                        break;
                    }
                    return Err(err);
                }
            }
        }
        Ok(current)
    }

    fn match_group_once<'d>(
        &self,
        tree: &XmlTree,
        group: &'d Group,
        children: &[NodeId],
        pos: usize,
        out: &mut Vec<Assignment<'d>>,
        path: &str,
    ) -> Result<usize, ValidationError> {
        match group.kind {
            GroupKind::Sequence => {
                let mut current = pos;
                for item in &group.items {
                    current = self.match_particle(tree, item, children, current, out, path)?;
                }
                Ok(current)
            }
            GroupKind::Choice => {
                let mut first_error = None;
                let mut empty_match = false;
                for item in &group.items {
                    let checkpoint = out.len();
                    match self.match_particle(tree, item, children, pos, out, path) {
                        Ok(next) if next > pos => return Ok(next),
                        Ok(_) => empty_match = true,
                        Err(err) => {
                            first_error.get_or_insert(err);
                        }
                    }
                    out.truncate(checkpoint);
                }
                if empty_match {
                    return Ok(pos);
                }
                let found = children
                    .get(pos)
                    .and_then(|&child| tree.name(child))
                    .unwrap_or("end of content")
                    .to_string();
                Err(first_error
                    .filter(|_| group.items.len() == 1)
                    .unwrap_or_else(|| ValidationError::ElementValidationError {
                        element: path.rsplit('/').next().unwrap_or_default().to_string(),
                        expected: format!("one of [{}]", choice_names(group).join(", ")),
                        found,
                        path: Some(path.to_string()),
                    }))
            }
            GroupKind::All => {
                let mut counts = vec![0usize; group.items.len()];
                let mut current = pos;
                while let Some(&child) = children.get(current) {
                    let name = tree.name(child);
                    let slot = group.items.iter().enumerate().find_map(|(index, item)| match item {
                        Particle::Element(decl)
                            if Some(decl.name.as_str()) == name
                                && decl.max_occurs.map_or(true, |max| counts[index] < max) =>
                        {
                            Some((index, decl))
                        }
                        _ => None,
                    });
                    match slot {
                        Some((index, decl)) => {
                            counts[index] += 1;
                            out.push((child, decl));
                            current += 1;
                        }
                        None => break,
                    }
                }
                for (index, item) in group.items.iter().enumerate() {
                    if let Particle::Element(decl) = item {
                        if counts[index] < decl.min_occurs {
                            return Err(ValidationError::CardinalityError {
                                element: decl.name.clone(),
                                min: decl.min_occurs,
                                max: decl.max_occurs,
                                actual: counts[index],
                                path: Some(path.to_string()),
                            });
                        }
                    }
                }
                Ok(current)
            }
        }
    }
}

fn is_namespace_attribute(name: &str) -> bool {
    name.starts_with("xmlns") || name.starts_with("xsi:") || name.starts_with("xml:")
}

fn direct_text(tree: &XmlTree, node: NodeId) -> String {
    tree.children(node)
        .iter()
        .filter_map(|&child| match tree.kind(child) {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

fn declares(group: &Group, name: &str) -> bool {
    group.items.iter().any(|item| match item {
        Particle::Element(decl) => decl.name == name,
        Particle::Group(inner) => declares(inner, name),
    })
}

fn choice_names(group: &Group) -> Vec<String> {
    let mut names = Vec::new();
    for item in &group.items {
        match item {
            Particle::Element(decl) => names.push(decl.name.clone()),
            Particle::Group(inner) => names.extend(choice_names(inner)),
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const BZ_SCHEMA: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:simpleType name="Triple">
    <xs:list itemType="xs:double"/>
  </xs:simpleType>
  <xs:complexType name="KPointType">
    <xs:simpleContent>
      <xs:extension base="Triple">
        <xs:attribute name="weight" type="xs:double" use="required"/>
        <xs:attribute name="label" type="xs:string" use="optional"/>
      </xs:extension>
    </xs:simpleContent>
  </xs:complexType>
  <xs:element name="bzIntegration">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="numberOfKPoints" type="xs:positiveInteger"/>
        <xs:choice minOccurs="0" maxOccurs="unbounded">
          <xs:element name="kPoint" type="KPointType"/>
          <xs:element name="comment" type="xs:string"/>
        </xs:choice>
      </xs:sequence>
      <xs:attribute name="mode" type="xs:string" use="required"/>
      <xs:attribute name="fermiSmearingEnergy" type="xs:double" use="optional"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    fn validator() -> SchemaValidator {
        SchemaValidator::from_xsd(BZ_SCHEMA).unwrap()
    }

    #[test]
    fn test_valid_document() {
        let xml = r#"<bzIntegration mode="hist"><numberOfKPoints>2</numberOfKPoints>
            <kPoint weight="1.0" label="g">0.0 0.0 0.0</kPoint><comment>edge</comment>
            <kPoint weight="2.0">0.5 0.0 0.0</kPoint></bzIntegration>"#;
        assert!(validator().validate_str(xml).is_ok());
    }

    #[test]
    fn test_invalid_text() {
        let result = validator()
            .validate_str(r#"<bzIntegration mode="hist"><numberOfKPoints>many</numberOfKPoints></bzIntegration>"#);
        assert!(matches!(
            result,
            Err(ValidationError::TypeValidationError { ref name, ref value, .. })
                if name == "numberOfKPoints" && value == "many"
        ));

        let result = validator().validate_str(
            r#"<bzIntegration mode="hist"><numberOfKPoints>1</numberOfKPoints><kPoint weight="1">0.0 x 0.0</kPoint></bzIntegration>"#,
        );
        assert!(matches!(
            result,
            Err(ValidationError::TypeValidationError { ref name, .. }) if name == "kPoint"
        ));
    }

    #[test]
    fn test_missing_required_element() {
        let result = validator().validate_str(r#"<bzIntegration mode="hist"/>"#);
        assert!(matches!(
            result,
            Err(ValidationError::CardinalityError { ref element, actual: 0, .. }) if element == "numberOfKPoints"
        ));
    }

    #[test]
    fn test_wrong_order() {
        let result = validator().validate_str(
            r#"<bzIntegration mode="hist"><kPoint weight="1">0 0 0</kPoint><numberOfKPoints>1</numberOfKPoints></bzIntegration>"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_element_and_attribute() {
        let result = validator().validate_str(
            r#"<bzIntegration mode="hist"><numberOfKPoints>1</numberOfKPoints><kPointMesh/></bzIntegration>"#,
        );
        assert!(matches!(result, Err(ValidationError::UnknownElement { .. })));

        let result = validator().validate_str(
            r#"<bzIntegration mode="hist" jspins="2"><numberOfKPoints>1</numberOfKPoints></bzIntegration>"#,
        );
        assert!(matches!(result, Err(ValidationError::AttributeValidationError { .. })));
    }

    #[test]
    fn test_required_attribute() {
        let result = validator().validate_str(r#"<bzIntegration><numberOfKPoints>1</numberOfKPoints></bzIntegration>"#);
        assert!(matches!(result, Err(ValidationError::RequiredAttributeMissing { .. })));

        let result = validator().validate_str(
            r#"<bzIntegration mode="hist" fermiSmearingEnergy="warm"><numberOfKPoints>1</numberOfKPoints></bzIntegration>"#,
        );
        assert!(matches!(result, Err(ValidationError::AttributeValidationError { .. })));

        let result = validator().validate_str(
            r#"<bzIntegration mode="hist"><numberOfKPoints>1</numberOfKPoints><kPoint>0 0 0</kPoint></bzIntegration>"#,
        );
        assert!(matches!(
            result,
            Err(ValidationError::RequiredAttributeMissing { ref attribute, .. }) if attribute == "weight"
        ));
    }

    #[test]
    fn test_schema_not_found() {
        let result = SchemaValidator::from_file(Path::new("/nonexistent/schema.xsd"));
        assert!(matches!(result, Err(ValidationError::SchemaNotFound { .. })));
    }

    #[test]
    fn test_error_display() {
        let error = ValidationError::CardinalityError {
            element: "kPoint".to_string(),
            min: 1,
            max: None,
            actual: 0,
            path: Some("/fleurInput/cell".to_string()),
        };
        assert_eq!(
            error.to_string(),
            "Cardinality error for 'kPoint': expected 1..unbounded, found 0 at /fleurInput/cell"
        );
    }
}
