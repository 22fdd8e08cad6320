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

use super::wigner::{real_to_complex, rotate};
use super::{selector_matches, DensityLayout, DensityMatrix, CENTER, SIZE};
use crate::error::{Error, Result};
use crate::schema::SchemaDescriptor;
use crate::setters::atomgroup_base;
use crate::tree::XmlTree;
use crate::xpath::select_elements;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// New contents of one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occupations {
    /// Diagonal occupations of the complex harmonics, `m = -l ..= l`.
    StateOccupations(Vec<f64>),
    /// Diagonal occupations of the real harmonics, `m = -l ..= l`.
    OrbitalOccupations(Vec<f64>),
    /// Full `(2l+1)×(2l+1)` matrix.
    Denmat(Vec<Vec<f64>>),
}

/// Euler angles (radians) of a block rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rotation {
    pub phi: f64,
    pub theta: f64,
    pub inverse: bool,
}

impl Rotation {
    pub fn new(phi: f64, theta: f64) -> Self {
        Self {
            phi,
            theta,
            inverse: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.inverse = !self.inverse;
        self
    }

    fn is_identity(&self) -> bool {
        self.phi == 0.0 && self.theta == 0.0
    }
}

fn matching_elements(layout: &DensityLayout, species: &str, orbital: u8) -> Result<Vec<usize>> {
    let matches: Vec<usize> = layout
        .elements
        .iter()
        .enumerate()
        .filter(|(_, element)| element.orbital == orbital && selector_matches(species, &element.species))
        .map(|(index, _)| index)
        .collect();
    if matches.is_empty() {
        return Err(Error::not_found(
            species,
            format!("no LDA+U entry for species '{}' with l={}", species, orbital),
        ));
    }
    Ok(matches)
}

fn build_block(orbital: u8, occupations: &Occupations) -> Result<super::Block> {
    let l = usize::from(orbital);
    let width = 2 * l + 1;
    let check_len = |len: usize, what: &str| {
        if len == width {
            Ok(())
        } else {
            Err(Error::InvalidArgument(format!(
                "{} for l={} need {} entries, got {}",
                what, orbital, width, len
            )))
        }
    };

    let mut block = [[Complex64::new(0.0, 0.0); SIZE]; SIZE];
    let offset = CENTER - l;
    match occupations {
        Occupations::StateOccupations(values) => {
            check_len(values.len(), "state occupations")?;
            for (i, &value) in values.iter().enumerate() {
                block[offset + i][offset + i] = Complex64::new(value, 0.0);
            }
        }
        Occupations::OrbitalOccupations(values) => {
            check_len(values.len(), "orbital occupations")?;
            block = real_to_complex(orbital, values);
        }
        Occupations::Denmat(rows) => {
            check_len(rows.len(), "density matrix rows")?;
            for (i, row) in rows.iter().enumerate() {
                check_len(row.len(), "density matrix columns")?;
                for (j, &value) in row.iter().enumerate() {
                    block[offset + i][offset + j] = Complex64::new(value, 0.0);
                }
            }
        }
    }
    Ok(block)
}

/// Overwrite the blocks of the LDA+U entries matching `species` and
/// `orbital` for the 1-based `spin`, optionally rotated afterwards.
/// Returns the number of blocks written.
pub fn set_nmmpmat(
    matrix: &mut DensityMatrix,
    species: &str,
    orbital: u8,
    spin: usize,
    occupations: &Occupations,
    rotation: Option<Rotation>,
) -> Result<usize> {
    let spin_blocks = matrix.layout().spin_blocks;
    if spin == 0 || spin > spin_blocks {
        return Err(Error::InvalidArgument(format!(
            "spin {} out of range, the density matrix has {} spin blocks",
            spin, spin_blocks
        )));
    }
    let elements = matching_elements(matrix.layout(), species, orbital)?;
    let mut block = build_block(orbital, occupations)?;
    if let Some(rotation) = rotation.filter(|r| !r.is_identity()) {
        block = rotate(&block, orbital, rotation.phi, rotation.theta, rotation.inverse);
    }
    for &element in &elements {
        *matrix.block_mut(element, spin - 1) = block;
    }
    tracing::debug!(species, orbital, spin, blocks = elements.len(), "density matrix blocks set");
    Ok(elements.len())
}

/// Rotate every spin block of the matching LDA+U entries.
pub fn rotate_nmmpmat(
    matrix: &mut DensityMatrix,
    species: &str,
    orbital: u8,
    rotation: Rotation,
) -> Result<usize> {
    let elements = matching_elements(matrix.layout(), species, orbital)?;
    let spin_blocks = matrix.layout().spin_blocks;
    for &element in &elements {
        for spin in 0..spin_blocks {
            let block = matrix.block_mut(element, spin);
            *block = rotate(block, orbital, rotation.phi, rotation.theta, rotation.inverse);
        }
    }
    Ok(elements.len() * spin_blocks)
}

/// Rotate the blocks of the matching species into the spin quantisation
/// axis of their atom group, given by `nocoParams/@alpha` and `@beta`.
/// Groups without `nocoParams` are left alone.
pub fn align_nmmpmat_to_sqa(
    tree: &XmlTree,
    schema: &SchemaDescriptor,
    matrix: &mut DensityMatrix,
    species: &str,
    orbital: Option<u8>,
) -> Result<usize> {
    let groups = select_elements(tree, &atomgroup_base(schema)?)?;
    let targets: Vec<(usize, u8, usize)> = matrix
        .layout()
        .elements
        .iter()
        .enumerate()
        .filter(|(_, e)| selector_matches(species, &e.species) && orbital.map_or(true, |l| e.orbital == l))
        .map(|(index, e)| (index, e.orbital, e.group))
        .collect();
    if targets.is_empty() {
        return Err(Error::not_found(species, format!("no LDA+U entry for species '{}'", species)));
    }

    let spin_blocks = matrix.layout().spin_blocks;
    let mut rotated = 0;
    for (element, l, group) in targets {
        let noco = groups
            .get(group)
            .and_then(|&node| tree.first_child_named(node, "nocoParams"));
        let Some(noco) = noco else {
            tracing::debug!(group, "atom group without nocoParams, not aligned");
            continue;
        };
        let angle = |name: &str| -> Result<f64> {
            let text = tree.attribute(noco, name).unwrap_or("0.0");
            text.trim()
                .parse::<f64>()
                .map_err(|_| Error::type_mismatch(name, text, "float"))
        };
        let (alpha, beta) = (angle("alpha")?, angle("beta")?);
        for spin in 0..spin_blocks {
            let block = matrix.block_mut(element, spin);
            *block = rotate(block, l, alpha, beta, false);
        }
        rotated += spin_blocks;
    }
    Ok(rotated)
}

/// Parse `text` as the density matrix of `tree` and check it. Returns the
/// parsed matrix.
pub fn validate_nmmpmat(
    tree: &XmlTree,
    schema: &SchemaDescriptor,
    text: &str,
    tolerance: f64,
) -> Result<DensityMatrix> {
    let layout = DensityLayout::from_tree(tree, schema)?;
    let matrix = DensityMatrix::parse(text, layout)?;
    matrix.validate(tolerance)?;
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmmpmat::{DensityMatrixError, DEFAULT_TOLERANCE};
    use crate::schema::{SchemaKind, SchemaRegistry};
    use crate::ErrorKind;
    use std::sync::Arc;

    fn setup() -> (XmlTree, Arc<SchemaDescriptor>, DensityMatrix) {
        let schema = SchemaRegistry::default().get(SchemaKind::Input, "0.34").unwrap();
        let tree = XmlTree::parse(masci_test::fixtures::ldau_inp()).unwrap();
        let matrix = DensityMatrix::zeros(DensityLayout::from_tree(&tree, &schema).unwrap());
        (tree, schema, matrix)
    }

    #[test]
    fn test_state_and_denmat_blocks() {
        let (tree, schema, mut matrix) = setup();
        let states = Occupations::StateOccupations(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(set_nmmpmat(&mut matrix, "Ga-1", 2, 1, &states, None).unwrap(), 1);
        let denmat = Occupations::Denmat(vec![
            vec![1.0, -2.0, 3.0],
            vec![4.0, -5.0, 6.0],
            vec![7.0, -8.0, 9.0],
        ]);
        set_nmmpmat(&mut matrix, "As-2", 1, 1, &denmat, None).unwrap();

        let first = matrix.block(0, 0);
        for i in 0..SIZE {
            for j in 0..SIZE {
                let expected = if i == j && (1..=5).contains(&i) { i as f64 } else { 0.0 };
                assert_eq!(first[i][j], Complex64::new(expected, 0.0));
            }
        }
        let second = matrix.block(1, 0);
        assert_eq!(second[2][2].re, 1.0);
        assert_eq!(second[2][3].re, -2.0);
        assert_eq!(second[4][4].re, 9.0);
        assert_eq!(second[1][1].re, 0.0);

        let err = validate_nmmpmat(&tree, &schema, &matrix.to_text(), DEFAULT_TOLERANCE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
        assert!(matches!(
            err,
            Error::ValidationFailure(crate::error::ValidationFailure::DensityMatrix(
                DensityMatrixError::OccupationOutOfBounds { block: 0, .. }
            ))
        ));
    }

    #[test]
    fn test_argument_checks() {
        let (_, _, mut matrix) = setup();
        let states = Occupations::StateOccupations(vec![0.5; 5]);
        let err = set_nmmpmat(&mut matrix, "Ga-1", 2, 2, &states, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = set_nmmpmat(&mut matrix, "Ga-1", 1, 1, &states, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
        let err = set_nmmpmat(&mut matrix, "all-Xx", 2, 1, &states, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
        let short = Occupations::StateOccupations(vec![0.5; 3]);
        let err = set_nmmpmat(&mut matrix, "Ga-1", 2, 1, &short, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_orbital_occupations_keep_trace() {
        let (tree, schema, mut matrix) = setup();
        let orbitals = Occupations::OrbitalOccupations(vec![1.0, 0.5, 0.2, 0.5, 1.0]);
        set_nmmpmat(&mut matrix, "all", 2, 1, &orbitals, Some(Rotation::new(0.3, 0.9))).unwrap();
        let block = matrix.block(0, 0);
        let trace: f64 = (0..SIZE).map(|i| block[i][i].re).sum();
        assert!((trace - 3.2).abs() < 1e-12);
        assert!(validate_nmmpmat(&tree, &schema, &matrix.to_text(), DEFAULT_TOLERANCE).is_ok());
    }

    #[test]
    fn test_rotate_then_inverse() {
        let (_, _, mut matrix) = setup();
        let orbitals = Occupations::OrbitalOccupations(vec![1.0, 0.0, 0.3]);
        set_nmmpmat(&mut matrix, "As-2", 1, 1, &orbitals, None).unwrap();
        let before = matrix.clone();
        let rotation = Rotation::new(0.8, 1.7);
        rotate_nmmpmat(&mut matrix, "As-2", 1, rotation).unwrap();
        assert_ne!(matrix, before);
        rotate_nmmpmat(&mut matrix, "As-2", 1, rotation.inverted()).unwrap();
        for (a, b) in matrix.blocks().iter().zip(before.blocks()) {
            for i in 0..SIZE {
                for j in 0..SIZE {
                    assert!((a[i][j] - b[i][j]).norm() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_align_to_sqa() {
        let schema = SchemaRegistry::default().get(SchemaKind::Input, "0.34").unwrap();
        let xml = masci_test::fixtures::ldau_inp().replace(
            "</atomGroup>",
            r#"<nocoParams alpha="0.0" beta="1.5707963267948966"/></atomGroup>"#,
        );
        let tree = XmlTree::parse(&xml).unwrap();
        let mut matrix = DensityMatrix::zeros(DensityLayout::from_tree(&tree, &schema).unwrap());
        let orbitals = Occupations::StateOccupations(vec![1.0, 0.0, 0.0]);
        set_nmmpmat(&mut matrix, "As-2", 1, 1, &orbitals, None).unwrap();
        let rotated = align_nmmpmat_to_sqa(&tree, &schema, &mut matrix, "As-2", None).unwrap();
        assert_eq!(rotated, 1);
        let block = matrix.block(1, 0);
        let trace: f64 = (0..SIZE).map(|i| block[i][i].re).sum();
        assert!((trace - 1.0).abs() < 1e-12);
        assert!((block[2][2].re - 1.0).abs() > 1e-6);
    }

    #[test]
    fn test_occupations_json_form() {
        let json = serde_json::to_value(Occupations::Denmat(vec![vec![1.0]])).unwrap();
        assert_eq!(json, serde_json::json!({"denmat": [[1.0]]}));
        let rotation: Rotation = serde_json::from_str(r#"{"phi": 0.5}"#).unwrap();
        assert_eq!(rotation, Rotation::new(0.5, 0.0));
    }
}
