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

//! Schema-driven editing of FLEUR `inp.xml` files
//!
//! Edits are recorded in a [`Journal`] and applied in one go to a copy of a
//! document. Names like `Kmax` or `radius` are resolved to XML locations
//! through the XSD schema the document declares, values are converted to
//! the declared types, and the result is validated before it is handed
//! back. When LDA+U is used, the `n_mmp_mat` density matrix is edited along
//! with the document and kept consistent with it.
//!
//! # Features
//!
//! - Versioned schema descriptors built from the bundled or user supplied XSD files
//! - XPath construction from canonical paths and per-tag filters
//! - Low-level XPath mutators and schema-aware setters (species, atom groups, k-points)
//! - Density matrix setters with rotations by Wigner D-matrices
//! - JSON persistence of journals
//!
//! # Examples
//!
//! ```rust
//! use masci_xml::journal::{Journal, ShiftValueArgs, Task};
//! use masci_xml::setters::ShiftMode;
//! use std::collections::BTreeMap;
//!
//! let mut journal = Journal::default();
//! journal.record(Task::ShiftValue(ShiftValueArgs {
//!     changes: BTreeMap::from([("Kmax".to_string(), 0.1)]),
//!     mode: ShiftMode::Rel,
//!     path_spec: BTreeMap::new(),
//! }))?;
//!
//! let (xml, nmmpmat) = journal.apply_to_string(masci_test::fixtures::fe_pt_inp(), None)?;
//! assert!(xml.contains(r#"Kmax="4.4""#));
//! assert!(nmmpmat.is_none());
//! # Ok::<(), masci_xml::Error>(())
//! ```
//!
//! Journals round-trip through their task list:
//!
//! ```rust
//! use masci_xml::journal::Journal;
//! use masci_xml::schema::SchemaRegistry;
//! use std::sync::Arc;
//!
//! let json = r#"[["set_species", {"species_name": "all", "changes": {"mtSphere": {"radius": 3.333}}}]]"#;
//! let journal = Journal::from_json(Arc::new(SchemaRegistry::default()), json)?;
//! assert_eq!(journal.task_list()?[0].0, "set_species");
//! # Ok::<(), masci_xml::Error>(())
//! ```

pub mod attrib_tree;
pub mod error;
pub mod journal;
pub mod loader;
pub mod mutators;
pub mod nmmpmat;
pub mod path_builder;
pub mod schema;
pub mod setters;
pub mod tree;
pub mod types;
pub mod xpath;

pub use attrib_tree::{AttribNode, AttribTree};
pub use error::{Error, ErrorKind, Result, ValidationFailure};
pub use journal::{Journal, JournalState, Modified, ModifierConfig, Task};
pub use loader::{load_document, DocumentSource};
pub use nmmpmat::{DensityLayout, DensityMatrix};
pub use schema::{SchemaDescriptor, SchemaKind, SchemaRegistry};
pub use tree::{NodeId, ReadConfig, WriteConfig, XmlTree};
pub use types::Value;
