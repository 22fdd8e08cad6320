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

//! Version-keyed registry of schema descriptors.

use super::{SchemaDescriptor, SchemaKind, Version};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const INPUT_SCHEMA_0_31: &str = include_str!("../../schemas/FleurInputSchema-0.31.xsd");
const INPUT_SCHEMA_0_34: &str = include_str!("../../schemas/FleurInputSchema-0.34.xsd");

#[derive(Debug, Clone)]
enum SchemaSource {
    Text(Cow<'static, str>),
    File(PathBuf),
}

type Key = (SchemaKind, Version);

/// Registry of XSD sources with a lazily filled descriptor cache.
///
/// Descriptors are built on first use and shared as `Arc`; the registry is
/// `Send + Sync`, so one instance can serve any number of journals.
///
/// # Examples
///
/// ```rust
/// use masci_xml::schema::{SchemaKind, SchemaRegistry};
///
/// let registry = SchemaRegistry::default();
/// let first = registry.get(SchemaKind::Input, "0.31")?;
/// let second = registry.get(SchemaKind::Input, "0.31")?;
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// assert_eq!(registry.size(), 1);
///
/// assert!(registry.get(SchemaKind::Input, "0.99").is_err());
/// # Ok::<(), masci_xml::Error>(())
/// ```
#[derive(Debug)]
pub struct SchemaRegistry {
    sources: BTreeMap<Key, SchemaSource>,
    cache: RwLock<HashMap<Key, Arc<SchemaDescriptor>>>,
}

impl Default for SchemaRegistry {
    /// Registry with the bundled input schemas.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register_static(SchemaKind::Input, Version::new(0, 31), INPUT_SCHEMA_0_31);
        registry.register_static(SchemaKind::Input, Version::new(0, 34), INPUT_SCHEMA_0_34);
        registry
    }
}

impl SchemaRegistry {
    /// Empty registry without any schema.
    pub fn new() -> Self {
        Self {
            sources: BTreeMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn register_static(&mut self, kind: SchemaKind, version: Version, xsd: &'static str) {
        self.insert((kind, version), SchemaSource::Text(Cow::Borrowed(xsd)));
    }

    fn insert(&mut self, key: Key, source: SchemaSource) {
        self.cache.write().remove(&key);
        self.sources.insert(key, source);
    }

    /// Register (or replace) the schema of a version from XSD text.
    pub fn register_xsd(&mut self, kind: SchemaKind, version: &str, xsd: impl Into<String>) -> Result<()> {
        let version: Version = version.parse()?;
        self.insert((kind, version), SchemaSource::Text(Cow::Owned(xsd.into())));
        Ok(())
    }

    /// Register (or replace) the schema of a version by file path. The file
    /// is read when the descriptor is first requested.
    pub fn register_file(&mut self, kind: SchemaKind, version: &str, path: impl AsRef<Path>) -> Result<()> {
        let version: Version = version.parse()?;
        self.insert((kind, version), SchemaSource::File(path.as_ref().to_path_buf()));
        Ok(())
    }

    /// Descriptor for an exact version string.
    ///
    /// # Errors
    ///
    /// `UnknownSchemaVersion` if nothing is registered for the version, `Io`
    /// or `Schema` if the registered source cannot be loaded.
    pub fn get(&self, kind: SchemaKind, version: &str) -> Result<Arc<SchemaDescriptor>> {
        let unknown = || Error::UnknownSchemaVersion {
            kind,
            version: version.to_string(),
        };
        let version: Version = version.parse().map_err(|_| unknown())?;
        let key = (kind, version);

        {
            let cache = self.cache.read();
            if let Some(descriptor) = cache.get(&key) {
                return Ok(Arc::clone(descriptor));
            }
        }

        let source = self.sources.get(&key).ok_or_else(unknown)?;

        let mut cache = self.cache.write();

        // Another thread may have built it while we waited for the lock
        if let Some(descriptor) = cache.get(&key) {
            return Ok(Arc::clone(descriptor));
        }

        let xsd: Cow<str> = match source {
            SchemaSource::Text(text) => Cow::Borrowed(text.as_ref()),
            SchemaSource::File(path) => {
                Cow::Owned(fs::read_to_string(path).map_err(|e| Error::io_error(path, e))?)
            }
        };
        tracing::debug!(%kind, %version, "building schema descriptor");
        let descriptor = Arc::new(SchemaDescriptor::from_xsd(kind, version, &xsd)?);
        cache.insert(key, Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Registered versions of a schema kind, ascending.
    pub fn versions(&self, kind: SchemaKind) -> Vec<Version> {
        self.sources
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, version)| *version)
            .collect()
    }

    /// Drop all built descriptors.
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    /// Number of built descriptors.
    pub fn size(&self) -> usize {
        self.cache.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PathSpec;

    #[test]
    fn test_bundled_versions() {
        let registry = SchemaRegistry::default();
        assert_eq!(
            registry.versions(SchemaKind::Input),
            vec![Version::new(0, 31), Version::new(0, 34)]
        );
        assert!(registry.versions(SchemaKind::Output).is_empty());
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_unknown_version() {
        let registry = SchemaRegistry::default();
        for version in ["0.99", "garbage", "0.034", " 0.34 "] {
            let err = registry.get(SchemaKind::Input, version).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::UnknownSchemaVersion);
        }
        let err = registry.get(SchemaKind::Output, "0.34").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnknownSchemaVersion);
    }

    #[test]
    fn test_cache_and_clear() {
        let registry = SchemaRegistry::default();
        let schema = registry.get(SchemaKind::Input, "0.34").unwrap();
        assert_eq!(schema.version(), Version::new(0, 34));
        assert_eq!(registry.size(), 1);
        registry.clear_cache();
        assert_eq!(registry.size(), 0);
        let again = registry.get(SchemaKind::Input, "0.34").unwrap();
        assert!(!Arc::ptr_eq(&schema, &again));
    }

    #[test]
    fn test_version_specific_paths() {
        let registry = SchemaRegistry::default();
        let old = registry.get(SchemaKind::Input, "0.31").unwrap();
        let new = registry.get(SchemaKind::Input, "0.34").unwrap();
        assert!(old.tag_path("kPointListSelection", &PathSpec::default()).is_err());
        assert_eq!(
            new.tag_path("kPointListSelection", &PathSpec::default()).unwrap(),
            "/fleurInput/cell/bzIntegration/kPointListSelection"
        );
    }

    #[test]
    fn test_register_replaces_cached_descriptor() {
        let mut registry = SchemaRegistry::default();
        registry.get(SchemaKind::Input, "0.34").unwrap();
        registry
            .register_xsd(SchemaKind::Input, "0.34", "<broken")
            .unwrap();
        let err = registry.get(SchemaKind::Input, "0.34").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Schema);
    }

    #[test]
    fn test_thread_safety() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SchemaRegistry>();
        assert_send_sync::<SchemaDescriptor>();
    }
}
