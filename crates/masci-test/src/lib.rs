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

//! Shared fixtures and helpers for the masci-xml test suites.
//!
//! ```rust
//! use masci_test::{fixtures, load, values};
//!
//! let (tree, schema) = load(fixtures::fe_pt_inp());
//! assert_eq!(schema.version().to_string(), "0.34");
//! assert_eq!(values(&tree, "//cutoffs/@Kmax"), vec!["4.0"]);
//! ```

pub mod fixtures;

use masci_xml::loader::{load_document, DocumentSource};
use masci_xml::schema::SchemaDescriptor;
use masci_xml::{ReadConfig, SchemaRegistry, XmlTree};
use std::sync::{Arc, Once};

/// Registry with the bundled schemas, shared between journals of one test.
pub fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::default())
}

/// Parse a fixture together with its schema descriptor.
///
/// Panics if the document cannot be loaded; fixtures are expected to be valid.
pub fn load(xml: &str) -> (XmlTree, Arc<SchemaDescriptor>) {
    match load_document(DocumentSource::Text(xml), &SchemaRegistry::default(), &ReadConfig::default()) {
        Ok(loaded) => loaded,
        Err(e) => panic!("fixture failed to load: {e}"),
    }
}

/// Values selected by `xpath`, panicking on a malformed expression.
pub fn values(tree: &XmlTree, xpath: &str) -> Vec<String> {
    match masci_xml::xpath::select_values(tree, xpath) {
        Ok(values) => values,
        Err(e) => panic!("cannot evaluate {xpath}: {e}"),
    }
}

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
