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

//! Resolved view of one schema version.

use super::validator::{SchemaValidator, ValidationError};
use super::xsd::{ElementDecl, Group, GroupKind, Particle, XsdSchema};
use super::{SchemaKind, Version};
use crate::error::{Error, Result};
use crate::tree::XmlTree;
use crate::types::{AttribType, ScalarType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Types nested deeper than this are not indexed (guards recursive types).
const MAX_SCHEMA_DEPTH: usize = 64;

/// How an attribute name maps onto schema locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttribCategory {
    /// One location, which occurs at most once per document.
    Unique,
    /// One location below a repeatable tag (e.g. every species).
    UniquePath,
    /// Several locations.
    Other,
}

impl fmt::Display for AttribCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttribCategory::Unique => f.write_str("unique"),
            AttribCategory::UniquePath => f.write_str("unique_path"),
            AttribCategory::Other => f.write_str("other"),
        }
    }
}

/// Disambiguation hints for path lookups.
///
/// # Examples
///
/// ```rust
/// use masci_xml::schema::{AttribCategory, PathSpec};
///
/// let spec = PathSpec::default()
///     .contains("species")
///     .not_contains("ldaU")
///     .exclude(AttribCategory::Other);
/// assert!(spec.matches_path("/fleurInput/atomSpecies/species/mtSphere/@radius"));
/// assert!(!spec.matches_path("/fleurInput/atomSpecies/species/ldaU/@l"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSpec {
    /// Substrings every candidate path must contain.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contains: Vec<String>,
    /// Substrings no candidate path may contain.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_contains: Vec<String>,
    /// Name of the tag carrying the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    /// Attribute categories to leave out.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<AttribCategory>,
}

impl PathSpec {
    pub fn contains(mut self, fragment: impl Into<String>) -> Self {
        self.contains.push(fragment.into());
        self
    }

    pub fn not_contains(mut self, fragment: impl Into<String>) -> Self {
        self.not_contains.push(fragment.into());
        self
    }

    pub fn tag_name(mut self, name: impl Into<String>) -> Self {
        self.tag_name = Some(name.into());
        self
    }

    pub fn exclude(mut self, category: AttribCategory) -> Self {
        self.exclude.push(category);
        self
    }

    /// Check the `contains`/`not_contains` conditions against a path.
    pub fn matches_path(&self, path: &str) -> bool {
        self.contains.iter().all(|c| path.contains(c.as_str()))
            && !self.not_contains.iter().any(|c| path.contains(c.as_str()))
    }

    /// Combine two specs, keeping the conditions of both.
    pub fn merged(&self, other: &PathSpec) -> PathSpec {
        let mut merged = self.clone();
        merged.contains.extend(other.contains.iter().cloned());
        merged.not_contains.extend(other.not_contains.iter().cloned());
        if other.tag_name.is_some() {
            merged.tag_name = other.tag_name.clone();
        }
        merged.exclude.extend(other.exclude.iter().copied());
        merged
    }
}

/// Schema information about one tag location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagInfo {
    /// Declared attributes in schema order.
    pub attribs: Vec<String>,
    /// Attributes with `use="required"`.
    pub required_attribs: Vec<String>,
    /// Child tags in schema order.
    pub order: Vec<String>,
    /// Children that may occur more than once.
    pub several: Vec<String>,
    /// Children that may be absent.
    pub optional: Vec<String>,
    /// Children carrying only text (no attributes, no children).
    pub simple: Vec<String>,
    /// Type of the text content, if the tag has simple content.
    pub text: Option<AttribType>,
}

fn find_ignore_case<'a>(names: &'a [String], name: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(name))
        .map(String::as_str)
}

impl TagInfo {
    /// Schema casing of a child tag name.
    pub fn child(&self, name: &str) -> Option<&str> {
        find_ignore_case(&self.order, name)
    }

    /// Schema casing of an attribute name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        find_ignore_case(&self.attribs, name)
    }

    pub fn is_several(&self, child: &str) -> bool {
        find_ignore_case(&self.several, child).is_some()
    }

    pub fn is_optional(&self, child: &str) -> bool {
        find_ignore_case(&self.optional, child).is_some()
    }

    pub fn is_simple(&self, child: &str) -> bool {
        find_ignore_case(&self.simple, child).is_some()
    }
}

#[derive(Debug, Clone)]
struct AttribLocation {
    path: String,
    tag: String,
    below_repeatable: bool,
    category: AttribCategory,
}

/// Canonical paths, types and tag information of one schema version.
///
/// Built once from the XSD text and shared immutably (see
/// [`SchemaRegistry`](super::SchemaRegistry)).
#[derive(Debug, Clone)]
pub struct SchemaDescriptor {
    kind: SchemaKind,
    version: Version,
    root: String,
    validator: SchemaValidator,
    tag_paths: BTreeMap<String, Vec<String>>,
    attribute_paths: BTreeMap<String, Vec<AttribLocation>>,
    attribute_types: HashMap<String, AttribType>,
    tag_infos: HashMap<String, TagInfo>,
    repeatable: HashMap<String, bool>,
}

struct ChildEntry<'d> {
    decl: &'d ElementDecl,
    optional: bool,
    several: bool,
}

fn collect_children<'d>(
    group: &'d Group,
    optional: bool,
    several: bool,
    out: &mut Vec<ChildEntry<'d>>,
) {
    let optional = optional
        || group.min_occurs == 0
        || (group.kind == GroupKind::Choice && group.items.len() > 1);
    let several = several || group.max_occurs != Some(1);
    for item in &group.items {
        match item {
            Particle::Element(decl) => out.push(ChildEntry {
                decl,
                optional: optional || decl.min_occurs == 0,
                several: several || decl.max_occurs != Some(1),
            }),
            Particle::Group(inner) => collect_children(inner, optional, several, out),
        }
    }
}

impl SchemaDescriptor {
    /// Build the descriptor of a schema from its XSD text.
    pub fn from_xsd(kind: SchemaKind, version: Version, xsd: &str) -> Result<Self> {
        let validator = SchemaValidator::from_xsd(xsd).map_err(|e| Error::Schema(e.to_string()))?;
        let schema = validator.schema();

        if let Some(declared) = schema.version.as_deref() {
            if declared != version.to_string() {
                tracing::warn!(
                    declared,
                    %version,
                    "schema file declares a different version than it is registered for"
                );
            }
        }

        let root_decl = schema
            .elements
            .iter()
            .find(|decl| schema.complex(&decl.type_ref).is_some())
            .ok_or_else(|| Error::Schema("schema has no complex root element".to_string()))?;

        let mut descriptor = SchemaDescriptor {
            kind,
            version,
            root: root_decl.name.clone(),
            validator: validator.clone(),
            tag_paths: BTreeMap::new(),
            attribute_paths: BTreeMap::new(),
            attribute_types: HashMap::new(),
            tag_infos: HashMap::new(),
            repeatable: HashMap::new(),
        };
        descriptor.index(schema, root_decl, format!("/{}", root_decl.name), false, 0);
        descriptor.categorize();

        tracing::debug!(
            %kind,
            %version,
            tags = descriptor.tag_infos.len(),
            attributes = descriptor.attribute_types.len(),
            "built schema descriptor"
        );
        Ok(descriptor)
    }

    fn index(
        &mut self,
        schema: &XsdSchema,
        decl: &ElementDecl,
        path: String,
        below_repeatable: bool,
        depth: usize,
    ) {
        if depth > MAX_SCHEMA_DEPTH || self.tag_infos.contains_key(&path) {
            return;
        }
        self.tag_paths
            .entry(decl.name.to_lowercase())
            .or_default()
            .push(path.clone());
        self.repeatable.insert(path.clone(), below_repeatable);

        let mut info = TagInfo::default();
        let complex = match schema.complex(&decl.type_ref) {
            Some(complex) => complex,
            None => {
                info.text = Some(simple_type(schema, &decl.type_ref));
                self.tag_infos.insert(path, info);
                return;
            }
        };

        for attribute in &complex.attributes {
            let attribute_path = format!("{}/@{}", path, attribute.name);
            self.attribute_types
                .insert(attribute_path.clone(), simple_type(schema, &attribute.type_ref));
            self.attribute_paths
                .entry(attribute.name.to_lowercase())
                .or_default()
                .push(AttribLocation {
                    path: attribute_path,
                    tag: decl.name.clone(),
                    below_repeatable,
                    category: AttribCategory::Other,
                });
            info.attribs.push(attribute.name.clone());
            if attribute.required {
                info.required_attribs.push(attribute.name.clone());
            }
        }
        if let Some(simple) = &complex.simple_content {
            info.text = Some(simple_type(schema, simple));
        }

        let mut children = Vec::new();
        if let Some(group) = &complex.content {
            collect_children(group, false, false, &mut children);
        }
        for child in &children {
            let name = &child.decl.name;
            if !info.order.contains(name) {
                info.order.push(name.clone());
            }
            if child.several && !info.several.contains(name) {
                info.several.push(name.clone());
            }
            if child.optional && !info.optional.contains(name) {
                info.optional.push(name.clone());
            }
            if schema.complex(&child.decl.type_ref).is_none() && !info.simple.contains(name) {
                info.simple.push(name.clone());
            }
        }
        self.tag_infos.insert(path.clone(), info);

        for child in children {
            let child_path = format!("{}/{}", path, child.decl.name);
            self.index(
                schema,
                child.decl,
                child_path,
                below_repeatable || child.several,
                depth + 1,
            );
        }
    }

    fn categorize(&mut self) {
        for locations in self.attribute_paths.values_mut() {
            let single = locations.len() == 1;
            for location in locations.iter_mut() {
                location.category = match (single, location.below_repeatable) {
                    (true, false) => AttribCategory::Unique,
                    (true, true) => AttribCategory::UniquePath,
                    (false, _) => AttribCategory::Other,
                };
            }
        }
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Name of the document root element.
    pub fn root_name(&self) -> &str {
        &self.root
    }

    /// All canonical paths of a tag surviving the `contains`/`not_contains`
    /// filters of `spec`. Fails with `PathNotFound` if none survive.
    pub fn tag_paths(&self, name: &str, spec: &PathSpec) -> Result<Vec<String>> {
        let all = self
            .tag_paths
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::not_found(name, format!("no tag '{}' in the {} schema {}", name, self.kind, self.version)))?;
        let paths: Vec<String> = all.iter().filter(|p| spec.matches_path(p)).cloned().collect();
        if paths.is_empty() {
            return Err(Error::not_found(
                name,
                format!("no path of tag '{}' matches {:?} (candidates: {})", name, spec, all.join(", ")),
            ));
        }
        Ok(paths)
    }

    /// The unique canonical path of a tag.
    pub fn tag_path(&self, name: &str, spec: &PathSpec) -> Result<String> {
        let mut paths = self.tag_paths(name, spec)?;
        if paths.len() > 1 {
            return Err(Error::PathAmbiguous {
                name: name.to_string(),
                candidates: paths,
            });
        }
        Ok(paths.remove(0))
    }

    /// All canonical `…/@name` paths of an attribute surviving `spec`.
    pub fn attribute_paths(&self, name: &str, spec: &PathSpec) -> Result<Vec<String>> {
        let all = self
            .attribute_paths
            .get(&name.to_lowercase())
            .ok_or_else(|| {
                Error::not_found(name, format!("no attribute '{}' in the {} schema {}", name, self.kind, self.version))
            })?;
        let paths: Vec<String> = all
            .iter()
            .filter(|location| !spec.exclude.contains(&location.category))
            .filter(|location| {
                spec.tag_name
                    .as_deref()
                    .map_or(true, |tag| location.tag.eq_ignore_ascii_case(tag))
            })
            .filter(|location| spec.matches_path(&location.path))
            .map(|location| location.path.clone())
            .collect();
        if paths.is_empty() {
            let candidates: Vec<&str> = all.iter().map(|l| l.path.as_str()).collect();
            return Err(Error::not_found(
                name,
                format!("no path of attribute '{}' matches {:?} (candidates: {})", name, spec, candidates.join(", ")),
            ));
        }
        Ok(paths)
    }

    /// The unique canonical path of an attribute.
    pub fn attribute_path(&self, name: &str, spec: &PathSpec) -> Result<String> {
        let mut paths = self.attribute_paths(name, spec)?;
        if paths.len() > 1 {
            return Err(Error::PathAmbiguous {
                name: name.to_string(),
                candidates: paths,
            });
        }
        Ok(paths.remove(0))
    }

    /// Category of an attribute name, if the schema declares it.
    pub fn attribute_category(&self, name: &str) -> Option<AttribCategory> {
        self.attribute_paths
            .get(&name.to_lowercase())
            .and_then(|locations| locations.first())
            .map(|location| location.category)
    }

    /// Type of attribute `name` on the tag at canonical path `tag_path`.
    ///
    /// `tag_path` may also be the attribute path itself.
    pub fn attribute_type(&self, name: &str, tag_path: &str) -> Result<AttribType> {
        let tag_path = tag_path
            .strip_suffix(&format!("/@{}", name))
            .unwrap_or(tag_path);
        let info = self.tag_info(tag_path)?;
        let schema_name = info.attribute(name).ok_or_else(|| {
            Error::not_found(name, format!("tag '{}' has no attribute '{}'", tag_path, name))
        })?;
        self.attribute_types
            .get(&format!("{}/@{}", tag_path, schema_name))
            .cloned()
            .ok_or_else(|| Error::not_found(name, format!("no type for '{}/@{}'", tag_path, name)))
    }

    /// Type of the text content of the tag at `tag_path`.
    pub fn text_type(&self, tag_path: &str) -> Result<AttribType> {
        self.tag_info(tag_path)?
            .text
            .clone()
            .ok_or_else(|| Error::not_found(tag_path, "tag has no text content"))
    }

    /// Schema information of the tag at canonical path `tag_path`.
    pub fn tag_info(&self, tag_path: &str) -> Result<&TagInfo> {
        self.tag_infos
            .get(tag_path)
            .ok_or_else(|| Error::not_found(tag_path, "not a canonical tag path of this schema"))
    }

    /// Whether the tag at `tag_path` (or any of its ancestors) may occur
    /// several times.
    pub fn is_repeatable(&self, tag_path: &str) -> bool {
        self.repeatable.get(tag_path).copied().unwrap_or(false)
    }

    /// Validate a document against the schema.
    pub fn validate(&self, tree: &XmlTree) -> std::result::Result<(), ValidationError> {
        self.validator.validate(tree)
    }

    /// All canonical tag paths, sorted.
    pub fn all_tag_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.tag_infos.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

fn simple_type(schema: &XsdSchema, type_ref: &super::xsd::TypeRef) -> AttribType {
    schema
        .resolve_simple(type_ref)
        .map(|resolved| resolved.attrib_type())
        .unwrap_or(AttribType::Scalar(ScalarType::Str))
}

#[cfg(test)]
mod tests {
    use super::*;

    const XSD: &str = include_str!("../../schemas/FleurInputSchema-0.34.xsd");

    fn descriptor() -> SchemaDescriptor {
        SchemaDescriptor::from_xsd(SchemaKind::Input, Version::new(0, 34), XSD).unwrap()
    }

    #[test]
    fn test_unique_attribute_path() {
        let schema = descriptor();
        assert_eq!(
            schema.attribute_path("Kmax", &PathSpec::default()).unwrap(),
            "/fleurInput/calculationSetup/cutoffs/@Kmax"
        );
        // lookups ignore case
        assert_eq!(
            schema.attribute_path("kmax", &PathSpec::default()).unwrap(),
            "/fleurInput/calculationSetup/cutoffs/@Kmax"
        );
        assert_eq!(schema.attribute_category("Kmax"), Some(AttribCategory::Unique));
        assert_eq!(schema.attribute_category("radius"), Some(AttribCategory::UniquePath));
    }

    #[test]
    fn test_ambiguous_attribute() {
        let schema = descriptor();
        let err = schema.attribute_path("spinf", &PathSpec::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PathAmbiguous);

        let spec = PathSpec::default().tag_name("ldaU");
        assert_eq!(
            schema.attribute_path("spinf", &spec).unwrap(),
            "/fleurInput/calculationSetup/ldaU/@spinf"
        );

        let spec = PathSpec::default().exclude(AttribCategory::Other);
        let err = schema.attribute_path("spinf", &spec).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PathNotFound);
    }

    #[test]
    fn test_tag_paths() {
        let schema = descriptor();
        assert_eq!(
            schema.tag_path("species", &PathSpec::default()).unwrap(),
            "/fleurInput/atomSpecies/species"
        );
        let err = schema.tag_path("ldaU", &PathSpec::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PathAmbiguous);
        assert_eq!(
            schema
                .tag_path("ldaU", &PathSpec::default().contains("species"))
                .unwrap(),
            "/fleurInput/atomSpecies/species/ldaU"
        );
        let err = schema.tag_path("nonsense", &PathSpec::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::PathNotFound);
    }

    #[test]
    fn test_types() {
        let schema = descriptor();
        let cutoffs = "/fleurInput/calculationSetup/cutoffs";
        assert_eq!(
            schema.attribute_type("Kmax", cutoffs).unwrap(),
            AttribType::Scalar(ScalarType::Float)
        );
        assert_eq!(
            schema.attribute_type("numbands", cutoffs).unwrap(),
            AttribType::Scalar(ScalarType::Str)
        );
        assert_eq!(
            schema
                .attribute_type("l_soc", "/fleurInput/calculationSetup/soc/@l_soc")
                .unwrap(),
            AttribType::Scalar(ScalarType::Bool)
        );
        assert_eq!(
            schema
                .text_type("/fleurInput/atomGroups/atomGroup/relPos")
                .unwrap(),
            AttribType::List(ScalarType::Str)
        );
        assert!(matches!(
            schema
                .attribute_type("imix", "/fleurInput/calculationSetup/scfLoop")
                .unwrap(),
            AttribType::Scalar(ScalarType::Enum(_))
        ));
    }

    #[test]
    fn test_tag_info() {
        let schema = descriptor();
        let info = schema.tag_info("/fleurInput/atomSpecies/species").unwrap();
        assert_eq!(info.child("MTSPHERE"), Some("mtSphere"));
        assert!(info.is_several("lo"));
        assert!(info.is_optional("ldaU"));
        assert!(!info.is_optional("mtSphere"));
        assert_eq!(info.order.first().map(String::as_str), Some("mtSphere"));

        let group = schema.tag_info("/fleurInput/atomGroups/atomGroup").unwrap();
        // members of a choice are optional on their own
        assert!(group.is_optional("relPos"));
        assert!(group.is_several("relPos"));
        assert!(schema.is_repeatable("/fleurInput/atomGroups/atomGroup/force"));
        assert!(!schema.is_repeatable("/fleurInput/calculationSetup/cutoffs"));
    }

    #[test]
    fn test_malformed_schema() {
        let err = SchemaDescriptor::from_xsd(SchemaKind::Input, Version::new(0, 1), "<broken").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Schema);
    }
}
