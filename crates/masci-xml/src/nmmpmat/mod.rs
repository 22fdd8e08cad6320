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

//! The `n_mmp_mat` density-matrix file.
//!
//! For every LDA+U entry of the input there is one 7×7 complex occupation
//! matrix per spin block. Entries are indexed by `m + 3`, so a matrix for
//! orbital `l` occupies the window `3 - l ..= 3 + l`. On disk each matrix is
//! 14 lines of 7 numbers (real and imaginary parts, row-major), written
//! with `{:20.13}`. Blocks are ordered spin first, then LDA+U entry.
//!
//! The entries are derived from the input: atom groups in document order,
//! then the `ldaU` tags of the species of each group. The number of spin
//! blocks is `jspins`, or 3 when `magnetism/mtNocoParams/@l_mtNocoPot` is
//! set (the third block couples up and down spins).

mod matrix;
mod setters;
mod wigner;

pub use matrix::{Block, DensityMatrix};
pub use setters::{align_nmmpmat_to_sqa, rotate_nmmpmat, set_nmmpmat, validate_nmmpmat, Occupations, Rotation};
pub use wigner::{real_to_complex, wigner_d};

use crate::error::{Error, Result};
use crate::path_builder::escape_literal;
use crate::schema::{PathSpec, SchemaDescriptor};
use crate::setters::{atomgroup_base, species_base};
use crate::tree::XmlTree;
use crate::xpath::{select_elements, select_values};
use std::collections::HashMap;

/// Rows and columns of a block.
pub const SIZE: usize = 7;
/// Index of `m = 0`.
pub const CENTER: usize = 3;
/// Lines per block on disk.
pub const LINES_PER_BLOCK: usize = 14;
/// Numbers per line on disk.
pub const VALUES_PER_LINE: usize = 7;
/// Default slack of the occupation bounds.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

/// Inconsistencies between a density matrix and its input file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DensityMatrixError {
    #[error("expected {expected} lines in the density matrix, found {found}")]
    LineCount { expected: usize, found: usize },

    #[error("malformed density matrix line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("block {block} ({species}, l={orbital}): entry ({row}, {col}) outside the orbital window is not zero")]
    NonZeroOutsideWindow {
        block: usize,
        species: String,
        orbital: u8,
        row: usize,
        col: usize,
    },

    #[error("block {block} ({species}, l={orbital}): occupation {value} at m={m} outside [{min}, {max}]")]
    OccupationOutOfBounds {
        block: usize,
        species: String,
        orbital: u8,
        m: i32,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// One LDA+U entry of the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LdaUElement {
    pub species: String,
    pub orbital: u8,
    /// 0-based position of the atom group in the document.
    pub group: usize,
    /// 0-based position of the `ldaU` tag within its species.
    pub index: usize,
    /// Number of earlier atom groups of the same species.
    pub occurrence: usize,
}

impl LdaUElement {
    /// Identity of the entry that survives inserting or deleting other
    /// atom groups.
    pub fn key(&self) -> (&str, u8, usize, usize) {
        (&self.species, self.orbital, self.index, self.occurrence)
    }
}

/// Block structure of a density matrix, derived from an input tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DensityLayout {
    pub spin_blocks: usize,
    pub elements: Vec<LdaUElement>,
}

impl DensityLayout {
    /// Read the layout from an input document.
    pub fn from_tree(tree: &XmlTree, schema: &SchemaDescriptor) -> Result<Self> {
        let jspins = match schema.attribute_path("jspins", &PathSpec::default()) {
            Ok(path) => select_values(tree, &path)?
                .first()
                .map(|text| {
                    text.trim()
                        .parse::<usize>()
                        .map_err(|_| Error::type_mismatch("jspins", text, "int"))
                })
                .transpose()?
                .unwrap_or(1),
            Err(_) => 1,
        };
        let noco_potential = match schema.attribute_path("l_mtNocoPot", &PathSpec::default()) {
            Ok(path) => select_values(tree, &path)?
                .first()
                .map_or(false, |text| matches!(text.trim(), "T" | "t" | "true")),
            Err(_) => false,
        };
        let spin_blocks = if noco_potential && jspins == 2 { 3 } else { jspins };

        let species_base = species_base(schema)?;
        let mut elements = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for (group, node) in select_elements(tree, &atomgroup_base(schema)?)?
            .into_iter()
            .enumerate()
        {
            let species = match tree.attribute(node, "species") {
                Some(species) => species.to_string(),
                None => continue,
            };
            let occurrence = seen.entry(species.clone()).or_insert(0);
            let xpath = format!("{}[@name = {}]/ldaU", species_base, escape_literal(&species));
            for (index, ldau) in select_elements(tree, &xpath)?.into_iter().enumerate() {
                let text = tree.attribute(ldau, "l").unwrap_or_default();
                let orbital = text
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .filter(|&l| l <= 3)
                    .ok_or_else(|| Error::type_mismatch("l", text, "orbital quantum number 0..=3"))?;
                elements.push(LdaUElement {
                    species: species.clone(),
                    orbital,
                    group,
                    index,
                    occurrence: *occurrence,
                });
            }
            *occurrence += 1;
        }
        Ok(Self { spin_blocks, elements })
    }

    pub fn block_count(&self) -> usize {
        self.spin_blocks * self.elements.len()
    }

    /// Position of the block of `element` (index into `elements`) and
    /// 0-based `spin`.
    pub fn block_index(&self, element: usize, spin: usize) -> usize {
        spin * self.elements.len() + element
    }

    /// Upper occupation bound of spin-diagonal blocks.
    pub fn max_occupation(&self) -> f64 {
        if self.spin_blocks == 1 {
            2.0
        } else {
            1.0
        }
    }
}

/// Check a species selector (`all`, `all-<substring>` or a name).
pub(crate) fn selector_matches(selector: &str, name: &str) -> bool {
    if selector == "all" {
        true
    } else if let Some(part) = selector.strip_prefix("all-") {
        name.contains(part)
    } else {
        selector == name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaKind, SchemaRegistry};

    #[test]
    fn test_layout_from_tree() {
        let schema = SchemaRegistry::default().get(SchemaKind::Input, "0.34").unwrap();
        let tree = XmlTree::parse(masci_test::fixtures::ldau_inp()).unwrap();
        let layout = DensityLayout::from_tree(&tree, &schema).unwrap();
        assert_eq!(layout.spin_blocks, 1);
        let elements: Vec<_> = layout
            .elements
            .iter()
            .map(|e| (e.species.as_str(), e.orbital, e.group))
            .collect();
        assert_eq!(elements, vec![("Ga-1", 2, 0), ("As-2", 1, 1)]);
        assert_eq!(layout.block_count(), 2);
        assert_eq!(layout.max_occupation(), 2.0);
    }

    #[test]
    fn test_noco_potential_adds_spin_block() {
        let schema = SchemaRegistry::default().get(SchemaKind::Input, "0.34").unwrap();
        let xml = masci_test::fixtures::ldau_inp()
            .replace(r#"jspins="1""#, r#"jspins="2""#)
            .replace(
                r#"<magnetism jspins="2"/>"#,
                r#"<magnetism jspins="2"><mtNocoParams l_mtNocoPot="T"/></magnetism>"#,
            );
        let tree = XmlTree::parse(&xml).unwrap();
        let layout = DensityLayout::from_tree(&tree, &schema).unwrap();
        assert_eq!(layout.spin_blocks, 3);
        assert_eq!(layout.block_index(1, 2), 5);
        assert_eq!(layout.max_occupation(), 1.0);
    }

    #[test]
    fn test_selector_matches() {
        assert!(selector_matches("all", "Ga-1"));
        assert!(selector_matches("all-Ga", "Ga-1"));
        assert!(!selector_matches("all-Xx", "Ga-1"));
        assert!(selector_matches("Ga-1", "Ga-1"));
        assert!(!selector_matches("Ga", "Ga-1"));
    }
}
