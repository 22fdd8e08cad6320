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

//! Loading FLEUR documents together with their schema.
//!
//! ```rust
//! use masci_xml::loader::{load_document, DocumentSource};
//! use masci_xml::schema::SchemaRegistry;
//! use masci_xml::ReadConfig;
//!
//! let registry = SchemaRegistry::default();
//! let xml = masci_test::fixtures::fe_pt_inp();
//! let (tree, schema) = load_document(DocumentSource::Text(xml), &registry, &ReadConfig::default())?;
//! assert_eq!(schema.version().to_string(), "0.34");
//! assert_eq!(tree.name(tree.root()), Some("fleurInput"));
//! # Ok::<(), masci_xml::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::schema::{SchemaDescriptor, SchemaKind, SchemaRegistry};
use crate::tree::{ReadConfig, XmlTree};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Where a document comes from.
pub enum DocumentSource<'a> {
    Path(&'a Path),
    Reader(Box<dyn BufRead + 'a>),
    Bytes(&'a [u8]),
    Text(&'a str),
    /// An already parsed document.
    Tree(XmlTree),
}

impl<'a> From<&'a Path> for DocumentSource<'a> {
    fn from(path: &'a Path) -> Self {
        DocumentSource::Path(path)
    }
}

impl<'a> From<&'a [u8]> for DocumentSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        DocumentSource::Bytes(bytes)
    }
}

impl From<XmlTree> for DocumentSource<'_> {
    fn from(tree: XmlTree) -> Self {
        DocumentSource::Tree(tree)
    }
}

impl DocumentSource<'_> {
    /// Parse the source into a tree.
    pub fn into_tree(self, config: &ReadConfig) -> Result<XmlTree> {
        match self {
            DocumentSource::Path(path) => {
                let file = File::open(path).map_err(|e| Error::io_error(path, e))?;
                XmlTree::from_reader(BufReader::new(file), config)
            }
            DocumentSource::Reader(reader) => XmlTree::from_reader(reader, config),
            DocumentSource::Bytes(bytes) => XmlTree::from_reader(bytes, config),
            DocumentSource::Text(text) => XmlTree::parse_with(text, config),
            DocumentSource::Tree(tree) => Ok(tree),
        }
    }
}

/// Schema kind and version declared on the root element.
pub fn detect_version(tree: &XmlTree) -> Result<(SchemaKind, String)> {
    let root = tree.root();
    for kind in [SchemaKind::Input, SchemaKind::Output] {
        if let Some(version) = tree.attribute(root, kind.version_attribute()) {
            return Ok((kind, version.to_string()));
        }
    }
    Err(Error::not_found(
        SchemaKind::Input.version_attribute(),
        format!(
            "root element <{}> declares no schema version",
            tree.name(root).unwrap_or_default()
        ),
    ))
}

/// Descriptor for the version declared by `tree`.
pub fn schema_for(tree: &XmlTree, registry: &SchemaRegistry) -> Result<Arc<SchemaDescriptor>> {
    let (kind, version) = detect_version(tree)?;
    registry.get(kind, &version)
}

/// Parse a document and look up the descriptor of its declared version.
pub fn load_document(
    source: DocumentSource<'_>,
    registry: &SchemaRegistry,
    config: &ReadConfig,
) -> Result<(XmlTree, Arc<SchemaDescriptor>)> {
    let tree = source.into_tree(config)?;
    let schema = schema_for(&tree, registry)?;
    tracing::debug!(kind = %schema.kind(), version = %schema.version(), "document loaded");
    Ok((tree, schema))
}
