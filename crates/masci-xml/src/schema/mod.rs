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

//! Versioned FLEUR schemas.
//!
//! An XSD file is parsed once into a [`SchemaDescriptor`]: the canonical path of
//! every tag and attribute, the types of attributes and texts, the allowed
//! children of every tag and a validator for whole documents. Descriptors are
//! handed out by a [`SchemaRegistry`] keyed by [`SchemaKind`] and [`Version`].
//!
//! # Examples
//!
//! ```rust
//! use masci_xml::schema::{PathSpec, SchemaKind, SchemaRegistry};
//!
//! let registry = SchemaRegistry::default();
//! let schema = registry.get(SchemaKind::Input, "0.34")?;
//!
//! assert_eq!(
//!     schema.attribute_path("Kmax", &PathSpec::default())?,
//!     "/fleurInput/calculationSetup/cutoffs/@Kmax"
//! );
//!
//! // `spinf` exists on two tags, a hint narrows it down
//! let spec = PathSpec::default().contains("scfLoop");
//! assert_eq!(
//!     schema.attribute_path("spinf", &spec)?,
//!     "/fleurInput/calculationSetup/scfLoop/@spinf"
//! );
//! # Ok::<(), masci_xml::Error>(())
//! ```

mod descriptor;
mod registry;
mod validator;
mod version;
mod xsd;

pub use descriptor::{AttribCategory, PathSpec, SchemaDescriptor, TagInfo};
pub use registry::SchemaRegistry;
pub use validator::{SchemaValidator, ValidationError};
pub use version::{Version, VersionDispatch, VersionRange};

use std::fmt;

/// Which family of FLEUR documents a schema describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaKind {
    /// `inp.xml` documents
    Input,
    /// `out.xml` documents
    Output,
}

impl SchemaKind {
    /// Root attribute carrying the schema version.
    pub fn version_attribute(self) -> &'static str {
        match self {
            SchemaKind::Input => "fleurInputVersion",
            SchemaKind::Output => "fleurOutputVersion",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Input => f.write_str("input"),
            SchemaKind::Output => f.write_str("output"),
        }
    }
}
