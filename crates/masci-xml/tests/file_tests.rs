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

//! File based loading, schema registration and journal persistence.

use masci_test::{fixtures, registry, values};
use masci_xml::loader::{load_document, DocumentSource};
use masci_xml::schema::{SchemaKind, SchemaRegistry};
use masci_xml::{ErrorKind, Journal, ReadConfig, WriteConfig};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn bundled_schema() -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas/FleurInputSchema-0.34.xsd");
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_load_from_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("inp.xml");
    fs::write(&path, fixtures::fe_pt_inp()).unwrap();

    let registry = SchemaRegistry::default();
    let (tree, schema) = load_document(path.as_path().into(), &registry, &ReadConfig::default()).unwrap();
    assert_eq!(schema.version().to_string(), "0.34");
    assert_eq!(values(&tree, "//species/@name"), vec!["Fe-1", "Pt-1"]);

    let missing = dir.path().join("missing.xml");
    let err = load_document(DocumentSource::Path(&missing), &registry, &ReadConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_register_schema_file() {
    let dir = TempDir::new().unwrap();
    let xsd = dir.path().join("FleurInputSchema.xsd");
    fs::write(&xsd, bundled_schema()).unwrap();

    let mut registry = SchemaRegistry::default();
    registry.register_file(SchemaKind::Input, "0.35", &xsd).unwrap();
    assert_eq!(registry.versions(SchemaKind::Input).len(), 3);

    let xml = fixtures::fe_pt_inp().replace(r#"fleurInputVersion="0.34""#, r#"fleurInputVersion="0.35""#);
    let json = r#"[["set_inpchanges", {"changes": {"Kmax": 4.5}}], ["set_kpointlist", {"kpoints": [[0.0, 0.0, 0.0]], "weights": [1.0], "switch": true}]]"#;
    let mut journal = Journal::from_json(Arc::new(registry), json).unwrap();
    let modified = journal.apply(&xml.parse().unwrap(), None).unwrap();
    assert_eq!(modified.schema.version().to_string(), "0.35");
    assert_eq!(values(&modified.tree, "//cutoffs/@Kmax"), vec!["4.5"]);
    assert_eq!(values(&modified.tree, "//kPointListSelection/@listName"), vec!["default-2"]);
}

#[test]
fn test_missing_schema_file() {
    let dir = TempDir::new().unwrap();
    let mut registry = SchemaRegistry::new();
    registry
        .register_file(SchemaKind::Input, "0.34", dir.path().join("absent.xsd"))
        .unwrap();
    let err = registry.get(SchemaKind::Input, "0.34").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(registry.size(), 0);
}

#[test]
fn test_journal_persisted_to_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal.json");
    let json = r#"[
        ["set_species", {"species_name": "Pt-1", "changes": {"mtSphere": {"radius": 2.45}}}],
        ["shift_value", {"changes": {"itmax": 5}, "mode": "abs"}],
        ["set_nkpts", {"count": 8, "gamma": true}]
    ]"#;
    let journal = Journal::from_json(registry(), json).unwrap();
    fs::write(&path, journal.to_json().unwrap()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let mut restored = Journal::from_json(registry(), &text).unwrap();
    assert_eq!(restored.task_list().unwrap(), journal.task_list().unwrap());

    // set_nkpts is only known to the single list layout
    let err = restored.apply(&fixtures::fe_pt_inp().parse().unwrap(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
    assert_eq!(err.task_index(), Some(2));

    restored.reset();
    let modified = restored.apply(&fixtures::legacy_inp().parse().unwrap(), None).unwrap();
    assert_eq!(values(&modified.tree, "//species[@name='Pt-1']/mtSphere/@radius"), vec!["2.45"]);
    assert_eq!(values(&modified.tree, "//scfLoop/@itmax"), vec!["20"]);
    assert_eq!(values(&modified.tree, "//kPointCount/@count"), vec!["8"]);
}

#[test]
fn test_written_document_reloads() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("inp.xml");
    let json = r#"[["set_atomgroup_label", {"atom_label": "2", "changes": {"nocoParams": {"alpha": 0.5, "beta": 1.0}}}]]"#;
    let mut journal = Journal::from_json(registry(), json).unwrap();
    let (xml, nmmpmat) = journal.apply_to_string(fixtures::fe_pt_inp(), None).unwrap();
    assert!(nmmpmat.is_none());
    fs::write(&path, xml).unwrap();

    let (tree, schema) = load_document(path.as_path().into(), &SchemaRegistry::default(), &ReadConfig::default()).unwrap();
    assert!(schema.validate(&tree).is_ok());
    assert_eq!(values(&tree, "//atomGroup[@species='Pt-1']/nocoParams/@alpha"), vec!["0.5"]);

    let compact = tree.to_xml_string(&WriteConfig::compact()).unwrap();
    assert!(!compact.contains("\n   <"));
    assert_eq!(compact.parse::<masci_xml::XmlTree>().unwrap(), tree);
}
