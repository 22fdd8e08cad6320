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

//! Schema versions and version-dependent dispatch.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A `major.minor` schema version such as `0.34`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for Version {
    type Err = Error;

    /// Only the canonical spelling is accepted: no surrounding whitespace,
    /// no sign and no leading zeros, so every version has one string form.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidArgument(format!("'{}' is not a schema version", s));
        let number = |part: &str| -> Result<u32> {
            let canonical = !part.is_empty()
                && part.bytes().all(|b| b.is_ascii_digit())
                && (part == "0" || !part.starts_with('0'));
            if !canonical {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        Ok(Version {
            major: number(major)?,
            minor: number(minor)?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Half-open range `[min, max)` of versions; a missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub min: Option<Version>,
    pub max: Option<Version>,
}

impl VersionRange {
    /// Every version.
    pub const ALL: VersionRange = VersionRange {
        min: None,
        max: None,
    };

    /// Versions from `min` on.
    pub const fn since(min: Version) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Versions before `max`.
    pub const fn before(max: Version) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn contains(&self, version: Version) -> bool {
        self.min.map_or(true, |min| version >= min) && self.max.map_or(true, |max| version < max)
    }

    fn overlaps(&self, other: &VersionRange) -> bool {
        let starts_before_other_ends = match (self.min, other.max) {
            (Some(min), Some(max)) => min < max,
            _ => true,
        };
        let other_starts_before_self_ends = match (other.min, self.max) {
            (Some(min), Some(max)) => min < max,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_self_ends
    }
}

/// Lookup table selecting an implementation by document version.
///
/// # Examples
///
/// ```rust
/// use masci_xml::schema::{Version, VersionDispatch, VersionRange};
///
/// let table = VersionDispatch::new("set_nkpts")
///     .register(VersionRange::before(Version::new(0, 32)), "legacy")
///     .register(VersionRange::since(Version::new(0, 32)), "named lists");
///
/// assert_eq!(*table.select(Version::new(0, 31))?, "legacy");
/// assert_eq!(*table.select(Version::new(0, 34))?, "named lists");
/// # Ok::<(), masci_xml::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct VersionDispatch<T> {
    operation: &'static str,
    entries: Vec<(VersionRange, T)>,
}

impl<T> VersionDispatch<T> {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            entries: Vec::new(),
        }
    }

    /// Add an implementation. Ranges must not overlap.
    pub fn register(mut self, range: VersionRange, implementation: T) -> Self {
        debug_assert!(
            self.entries.iter().all(|(existing, _)| !existing.overlaps(&range)),
            "overlapping version ranges registered for {}",
            self.operation
        );
        self.entries.push((range, implementation));
        self
    }

    /// The implementation whose range contains `version`.
    pub fn select(&self, version: Version) -> Result<&T> {
        self.entries
            .iter()
            .find(|(range, _)| range.contains(version))
            .map(|(_, implementation)| implementation)
            .ok_or_else(|| Error::UnsupportedVersion {
                operation: self.operation.to_string(),
                version: version.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_order() {
        let v: Version = "0.34".parse().unwrap();
        assert_eq!(v, Version::new(0, 34));
        assert!(Version::new(0, 31) < v);
        assert_eq!(v.to_string(), "0.34");
        assert!("034".parse::<Version>().is_err());
        assert!("a.b".parse::<Version>().is_err());
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!("0.0".parse::<Version>().unwrap(), Version::new(0, 0));
        assert_eq!("1.10".parse::<Version>().unwrap(), Version::new(1, 10));
        for text in ["0.034", "00.34", " 0.34 ", "0.34\n", "0.+34", "0.", ".34", "0.34.1"] {
            assert!(text.parse::<Version>().is_err(), "{:?} was accepted", text);
        }
    }

    #[test]
    fn test_half_open_ranges() {
        let range = VersionRange {
            min: Some(Version::new(0, 29)),
            max: Some(Version::new(0, 32)),
        };
        assert!(range.contains(Version::new(0, 29)));
        assert!(range.contains(Version::new(0, 31)));
        assert!(!range.contains(Version::new(0, 32)));
        assert!(VersionRange::ALL.contains(Version::new(9, 9)));
    }

    #[test]
    fn test_dispatch_unsupported() {
        let table = VersionDispatch::new("set_kpath").register(VersionRange::before(Version::new(0, 32)), 1);
        let err = table.select(Version::new(0, 34)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnsupportedVersion);
        assert!(err.to_string().contains("set_kpath"));
    }
}
