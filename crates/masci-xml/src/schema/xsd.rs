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

//! In-memory model of the XSD constructs used by the FLEUR schemas.
//!
//! Covered: global and local elements, named and anonymous complex and simple
//! types, `sequence`/`choice`/`all` groups with occurrence bounds, attributes,
//! `simpleContent` extensions, `complexContent` extensions, and simple type
//! restrictions (enumeration, length), lists and unions.

use super::validator::ValidationError;
use crate::types::{is_bool_literal, AttribType, ScalarType};
use roxmltree::{Document as XmlDocument, Node};
use std::borrow::Cow;
use std::collections::HashMap;

/// Maximum depth when resolving chains of derived types.
const MAX_TYPE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub(crate) struct XsdSchema {
    pub elements: Vec<ElementDecl>,
    pub complex_types: HashMap<String, ComplexType>,
    pub simple_types: HashMap<String, SimpleType>,
    pub version: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) enum TypeRef {
    Named(String),
    Complex(Box<ComplexType>),
    Simple(Box<SimpleType>),
}

#[derive(Debug, Clone)]
pub(crate) struct ElementDecl {
    pub name: String,
    pub type_ref: TypeRef,
    pub min_occurs: usize,
    pub max_occurs: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupKind {
    Sequence,
    Choice,
    All,
}

#[derive(Debug, Clone)]
pub(crate) enum Particle {
    Element(ElementDecl),
    Group(Group),
}

#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub kind: GroupKind,
    pub items: Vec<Particle>,
    pub min_occurs: usize,
    pub max_occurs: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ComplexType {
    pub content: Option<Group>,
    pub attributes: Vec<AttributeDecl>,
    pub simple_content: Option<TypeRef>,
    pub base: Option<String>,
    pub mixed: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct AttributeDecl {
    pub name: String,
    pub type_ref: TypeRef,
    pub required: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum SimpleType {
    Restriction {
        base: String,
        enumeration: Vec<String>,
        length: Option<usize>,
    },
    List {
        item: String,
    },
    Union {
        members: Vec<String>,
    },
}

/// Built-in value space of a simple type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    String,
    Boolean,
    /// Integer with an optional lower bound
    Integer(Option<i64>),
    Double,
}

/// A simple type with all derivation steps applied.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ResolvedSimple {
    pub builtin: Builtin,
    pub enumeration: Vec<String>,
    pub list: bool,
    pub length: Option<usize>,
    pub members: Vec<ResolvedSimple>,
    pub description: String,
}

fn parse_error(message: impl Into<String>) -> ValidationError {
    ValidationError::SchemaParseError {
        message: message.into(),
    }
}

fn builtin(name: &str) -> Option<Builtin> {
    let local = name.rsplit(':').next().unwrap_or(name);
    Some(match local {
        "string" | "normalizedString" | "token" | "NMTOKEN" | "Name" | "NCName" | "ID"
        | "IDREF" | "anyURI" | "anySimpleType" => Builtin::String,
        "boolean" => Builtin::Boolean,
        "integer" | "int" | "long" | "short" | "byte" => Builtin::Integer(None),
        "nonNegativeInteger" | "unsignedInt" | "unsignedLong" | "unsignedShort" => {
            Builtin::Integer(Some(0))
        }
        "positiveInteger" => Builtin::Integer(Some(1)),
        "double" | "float" | "decimal" => Builtin::Double,
        _ => return None,
    })
}

fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn occurs(node: &Node) -> Result<(usize, Option<usize>), ValidationError> {
    let min_occurs = match node.attribute("minOccurs") {
        Some(text) => text
            .parse::<usize>()
            .map_err(|_| parse_error(format!("invalid minOccurs '{}'", text)))?,
        None => 1,
    };
    let max_occurs = match node.attribute("maxOccurs") {
        Some("unbounded") => None,
        Some(text) => Some(
            text.parse::<usize>()
                .map_err(|_| parse_error(format!("invalid maxOccurs '{}'", text)))?,
        ),
        None => Some(1),
    };
    Ok((min_occurs, max_occurs))
}

impl XsdSchema {
    /// Parse an XSD document.
    pub fn parse(xsd: &str) -> Result<Self, ValidationError> {
        let doc = XmlDocument::parse(xsd).map_err(|e| parse_error(e.to_string()))?;
        let root = doc.root_element();

        if root.tag_name().name() != "schema" {
            return Err(parse_error("Root element must be <xs:schema>"));
        }

        let mut schema = XsdSchema {
            elements: Vec::new(),
            complex_types: HashMap::new(),
            simple_types: HashMap::new(),
            version: root.attribute("version").map(str::to_string),
        };

        for child in element_children(root) {
            match child.tag_name().name() {
                "element" => schema.elements.push(parse_element(&child)?),
                "complexType" => {
                    let name = required_name(&child, "complexType")?;
                    schema.complex_types.insert(name, parse_complex_type(&child)?);
                }
                "simpleType" => {
                    let name = required_name(&child, "simpleType")?;
                    schema.simple_types.insert(name, parse_simple_type(&child)?);
                }
                "annotation" | "import" | "include" => {}
                other => {
                    return Err(parse_error(format!("unsupported top-level <{}>", other)));
                }
            }
        }

        if schema.elements.is_empty() {
            return Err(parse_error("schema declares no global element"));
        }
        Ok(schema)
    }

    /// Complex type behind a type reference with extensions merged in.
    /// `None` for simple types.
    pub fn complex<'s>(&'s self, type_ref: &'s TypeRef) -> Option<Cow<'s, ComplexType>> {
        let complex = match type_ref {
            TypeRef::Complex(complex) => complex.as_ref(),
            TypeRef::Named(name) => self.complex_types.get(name)?,
            TypeRef::Simple(_) => return None,
        };
        Some(self.merged(complex, 0))
    }

    fn merged<'s>(&'s self, complex: &'s ComplexType, depth: usize) -> Cow<'s, ComplexType> {
        let base = match complex.base.as_deref().and_then(|b| self.complex_types.get(b)) {
            Some(base) if depth < MAX_TYPE_DEPTH => self.merged(base, depth + 1),
            _ => return Cow::Borrowed(complex),
        };

        let mut merged = base.into_owned();
        merged.base = None;
        merged.mixed |= complex.mixed;
        merged.attributes.extend(complex.attributes.iter().cloned());
        let derived_from_complex = matches!(
            &complex.simple_content,
            Some(TypeRef::Named(name)) if self.complex_types.contains_key(name)
        );
        if complex.simple_content.is_some() && !derived_from_complex {
            merged.simple_content = complex.simple_content.clone();
        }
        merged.content = match (merged.content.take(), complex.content.clone()) {
            (Some(base_group), Some(own)) => Some(Group {
                kind: GroupKind::Sequence,
                items: vec![Particle::Group(base_group), Particle::Group(own)],
                min_occurs: 1,
                max_occurs: Some(1),
            }),
            (base_group, own) => own.or(base_group),
        };
        Cow::Owned(merged)
    }

    /// Resolve a simple type reference down to its built-in base.
    pub fn resolve_simple(&self, type_ref: &TypeRef) -> Option<ResolvedSimple> {
        match type_ref {
            TypeRef::Named(name) => self.resolve_named(name, 0),
            TypeRef::Simple(simple) => self.resolve_definition(simple, "anonymous type", 0),
            TypeRef::Complex(_) => None,
        }
    }

    fn resolve_named(&self, name: &str, depth: usize) -> Option<ResolvedSimple> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }
        // Prefixed names always point into the XSD namespace
        if name.contains(':') || !self.simple_types.contains_key(name) {
            return builtin(name).map(|builtin| ResolvedSimple {
                builtin,
                enumeration: Vec::new(),
                list: false,
                length: None,
                members: Vec::new(),
                description: name.to_string(),
            });
        }
        let definition = self.simple_types.get(name)?;
        self.resolve_definition(definition, name, depth)
    }

    fn resolve_definition(
        &self,
        definition: &SimpleType,
        name: &str,
        depth: usize,
    ) -> Option<ResolvedSimple> {
        let mut resolved = match definition {
            SimpleType::Restriction {
                base,
                enumeration,
                length,
            } => {
                let mut resolved = self.resolve_named(base, depth + 1)?;
                if !enumeration.is_empty() {
                    resolved.enumeration = enumeration.clone();
                }
                if length.is_some() {
                    resolved.length = *length;
                }
                resolved
            }
            SimpleType::List { item } => {
                let mut resolved = self.resolve_named(item, depth + 1)?;
                resolved.list = true;
                resolved
            }
            SimpleType::Union { members } => ResolvedSimple {
                builtin: Builtin::String,
                enumeration: Vec::new(),
                list: false,
                length: None,
                members: members
                    .iter()
                    .map(|member| self.resolve_named(member, depth + 1))
                    .collect::<Option<Vec<_>>>()?,
                description: String::new(),
            },
        };
        resolved.description = name.to_string();
        Some(resolved)
    }
}

impl ResolvedSimple {
    /// The value kind exposed to setters.
    pub fn attrib_type(&self) -> AttribType {
        let scalar = if !self.members.is_empty() {
            ScalarType::Str
        } else {
            match self.builtin {
                Builtin::Boolean => ScalarType::Bool,
                Builtin::Integer(_) => ScalarType::Int,
                Builtin::Double => ScalarType::Float,
                Builtin::String if self.enumeration.is_empty() => ScalarType::Str,
                Builtin::String if self.enumeration.iter().all(|v| is_bool_literal(v)) => {
                    ScalarType::Bool
                }
                Builtin::String => ScalarType::Enum(self.enumeration.clone()),
            }
        };
        if self.list {
            AttribType::List(scalar)
        } else {
            AttribType::Scalar(scalar)
        }
    }

    /// Check a lexical value; the error describes the expected type.
    pub fn check(&self, value: &str) -> Result<(), String> {
        if !self.members.is_empty() {
            return if self.members.iter().any(|member| member.check(value).is_ok()) {
                Ok(())
            } else {
                Err(self.description.clone())
            };
        }
        if self.list {
            let items: Vec<&str> = value.split_whitespace().collect();
            if let Some(length) = self.length {
                if items.len() != length {
                    return Err(format!("{} (list of length {})", self.description, length));
                }
            }
            return items
                .iter()
                .try_for_each(|item| self.check_atom(item))
                .map_err(|_| self.description.clone());
        }
        self.check_atom(value).map_err(|_| self.description.clone())?;
        if let Some(length) = self.length {
            if value.chars().count() != length {
                return Err(format!("{} (length {})", self.description, length));
            }
        }
        Ok(())
    }

    fn check_atom(&self, value: &str) -> Result<(), ()> {
        let value = value.trim();
        match self.builtin {
            Builtin::String => {}
            Builtin::Boolean => {
                if !["true", "false", "1", "0"].contains(&value) {
                    return Err(());
                }
            }
            Builtin::Integer(min) => {
                let parsed = value.parse::<i64>().map_err(|_| ())?;
                if min.map_or(false, |min| parsed < min) {
                    return Err(());
                }
            }
            Builtin::Double => {
                value.parse::<f64>().map_err(|_| ())?;
            }
        }
        if self.enumeration.is_empty() || self.list {
            return Ok(());
        }
        let allowed = match self.builtin {
            Builtin::Integer(_) | Builtin::Double => {
                let parsed = value.parse::<f64>().map_err(|_| ())?;
                self.enumeration
                    .iter()
                    .any(|candidate| candidate.parse::<f64>().map_or(false, |c| c == parsed))
            }
            _ => self.enumeration.iter().any(|candidate| candidate == value),
        };
        if allowed {
            Ok(())
        } else {
            Err(())
        }
    }
}

fn required_name(node: &Node, what: &str) -> Result<String, ValidationError> {
    node.attribute("name")
        .map(str::to_string)
        .ok_or_else(|| parse_error(format!("{} must have 'name' attribute", what)))
}

fn parse_element(node: &Node) -> Result<ElementDecl, ValidationError> {
    if node.has_attribute("ref") {
        return Err(parse_error("element references (ref=) are not supported"));
    }
    let name = required_name(node, "Element")?;
    let (min_occurs, max_occurs) = occurs(node)?;

    let mut type_ref = node.attribute("type").map(|t| TypeRef::Named(t.to_string()));
    for child in element_children(*node) {
        match child.tag_name().name() {
            "complexType" => type_ref = Some(TypeRef::Complex(Box::new(parse_complex_type(&child)?))),
            "simpleType" => type_ref = Some(TypeRef::Simple(Box::new(parse_simple_type(&child)?))),
            _ => {}
        }
    }

    Ok(ElementDecl {
        name,
        // Untyped elements accept any text
        type_ref: type_ref.unwrap_or_else(|| TypeRef::Named("xsd:string".to_string())),
        min_occurs,
        max_occurs,
    })
}

fn parse_group(node: &Node, kind: GroupKind) -> Result<Group, ValidationError> {
    let (min_occurs, max_occurs) = occurs(node)?;
    let mut items = Vec::new();
    for child in element_children(*node) {
        match child.tag_name().name() {
            "element" => items.push(Particle::Element(parse_element(&child)?)),
            "sequence" => items.push(Particle::Group(parse_group(&child, GroupKind::Sequence)?)),
            "choice" => items.push(Particle::Group(parse_group(&child, GroupKind::Choice)?)),
            "all" => items.push(Particle::Group(parse_group(&child, GroupKind::All)?)),
            "annotation" => {}
            other => return Err(parse_error(format!("unsupported <{}> in model group", other))),
        }
    }
    Ok(Group {
        kind,
        items,
        min_occurs,
        max_occurs,
    })
}

fn group_kind(name: &str) -> Option<GroupKind> {
    match name {
        "sequence" => Some(GroupKind::Sequence),
        "choice" => Some(GroupKind::Choice),
        "all" => Some(GroupKind::All),
        _ => None,
    }
}

fn parse_complex_type(node: &Node) -> Result<ComplexType, ValidationError> {
    let mut complex = ComplexType {
        mixed: node.attribute("mixed") == Some("true"),
        ..Default::default()
    };

    for child in element_children(*node) {
        let name = child.tag_name().name();
        if let Some(kind) = group_kind(name) {
            complex.content = Some(parse_group(&child, kind)?);
            continue;
        }
        match name {
            "attribute" => complex.attributes.push(parse_attribute(&child)?),
            "simpleContent" | "complexContent" => {
                let derivation = element_children(child)
                    .find(|n| matches!(n.tag_name().name(), "extension" | "restriction"))
                    .ok_or_else(|| parse_error(format!("<{}> without derivation", name)))?;
                let base = derivation
                    .attribute("base")
                    .ok_or_else(|| parse_error("derivation must have 'base' attribute"))?;

                if name == "simpleContent" {
                    complex.simple_content = Some(TypeRef::Named(base.to_string()));
                }
                // A complex base (or any complexContent base) contributes its
                // own content and attributes
                complex.base = Some(base.to_string());

                for part in element_children(derivation) {
                    let part_name = part.tag_name().name();
                    if let Some(kind) = group_kind(part_name) {
                        complex.content = Some(parse_group(&part, kind)?);
                    } else if part_name == "attribute" {
                        complex.attributes.push(parse_attribute(&part)?);
                    }
                }
            }
            "annotation" | "anyAttribute" => {}
            other => return Err(parse_error(format!("unsupported <{}> in complexType", other))),
        }
    }
    Ok(complex)
}

fn parse_attribute(node: &Node) -> Result<AttributeDecl, ValidationError> {
    let name = required_name(node, "Attribute")?;
    let mut type_ref = TypeRef::Named(node.attribute("type").unwrap_or("xsd:string").to_string());
    if let Some(simple) = element_children(*node).find(|n| n.tag_name().name() == "simpleType") {
        type_ref = TypeRef::Simple(Box::new(parse_simple_type(&simple)?));
    }
    Ok(AttributeDecl {
        name,
        type_ref,
        required: node.attribute("use") == Some("required"),
    })
}

fn parse_simple_type(node: &Node) -> Result<SimpleType, ValidationError> {
    for child in element_children(*node) {
        match child.tag_name().name() {
            "restriction" => {
                let base = child
                    .attribute("base")
                    .ok_or_else(|| parse_error("restriction must have 'base' attribute"))?
                    .to_string();
                let mut enumeration = Vec::new();
                let mut length = None;
                for facet in element_children(child) {
                    match facet.tag_name().name() {
                        "enumeration" => {
                            if let Some(value) = facet.attribute("value") {
                                enumeration.push(value.to_string());
                            }
                        }
                        "length" => {
                            length = facet.attribute("value").and_then(|v| v.parse().ok());
                        }
                        _ => {}
                    }
                }
                return Ok(SimpleType::Restriction {
                    base,
                    enumeration,
                    length,
                });
            }
            "list" => {
                let item = child
                    .attribute("itemType")
                    .ok_or_else(|| parse_error("list must have 'itemType' attribute"))?;
                return Ok(SimpleType::List {
                    item: item.to_string(),
                });
            }
            "union" => {
                let members = child
                    .attribute("memberTypes")
                    .unwrap_or("")
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                return Ok(SimpleType::Union { members });
            }
            _ => {}
        }
    }
    Err(parse_error("simpleType needs a restriction, list or union"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const XSD: &str = r#"<?xml version="1.0"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" version="1.2">
  <xsd:element name="root" type="RootType"/>
  <xsd:complexType name="BaseType">
    <xsd:sequence><xsd:element name="a" type="xsd:int"/></xsd:sequence>
    <xsd:attribute name="id" type="xsd:string" use="required"/>
  </xsd:complexType>
  <xsd:complexType name="RootType">
    <xsd:complexContent>
      <xsd:extension base="BaseType">
        <xsd:sequence><xsd:element name="b" type="Triple" minOccurs="0" maxOccurs="unbounded"/></xsd:sequence>
        <xsd:attribute name="flag" type="Flag"/>
      </xsd:extension>
    </xsd:complexContent>
  </xsd:complexType>
  <xsd:simpleType name="Flag">
    <xsd:restriction base="xsd:string">
      <xsd:enumeration value="T"/><xsd:enumeration value="F"/>
    </xsd:restriction>
  </xsd:simpleType>
  <xsd:simpleType name="Doubles"><xsd:list itemType="xsd:double"/></xsd:simpleType>
  <xsd:simpleType name="Triple">
    <xsd:restriction base="Doubles"><xsd:length value="3"/></xsd:restriction>
  </xsd:simpleType>
</xsd:schema>"#;

    #[test]
    fn test_parse_and_merge_extension() {
        let schema = XsdSchema::parse(XSD).unwrap();
        assert_eq!(schema.version.as_deref(), Some("1.2"));
        let root = &schema.elements[0];
        let complex = schema.complex(&root.type_ref).unwrap();
        let names: Vec<_> = complex.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "flag"]);
        let content = complex.content.as_ref().unwrap();
        assert_eq!(content.kind, GroupKind::Sequence);
        assert_eq!(content.items.len(), 2);
    }

    #[test]
    fn test_resolve_simple_types() {
        let schema = XsdSchema::parse(XSD).unwrap();
        let flag = schema.resolve_simple(&TypeRef::Named("Flag".to_string())).unwrap();
        assert_eq!(flag.attrib_type(), AttribType::Scalar(ScalarType::Bool));
        assert!(flag.check("T").is_ok());
        assert!(flag.check("true").is_err());

        let triple = schema.resolve_simple(&TypeRef::Named("Triple".to_string())).unwrap();
        assert_eq!(triple.attrib_type(), AttribType::List(ScalarType::Float));
        assert!(triple.check("0.0 1.0 2.5").is_ok());
        assert!(triple.check("0.0 1.0").is_err());
        assert!(triple.check("0.0 x 1.0").is_err());

        let count = schema
            .resolve_simple(&TypeRef::Named("xsd:positiveInteger".to_string()))
            .unwrap();
        assert!(count.check("3").is_ok());
        assert!(count.check("0").is_err());
    }

    #[test]
    fn test_rejects_non_schema() {
        assert!(XsdSchema::parse("<root/>").is_err());
        assert!(XsdSchema::parse("<xsd:schema xmlns:xsd=\"http://www.w3.org/2001/XMLSchema\"/>").is_err());
        assert!(XsdSchema::parse("not xml").is_err());
    }
}
