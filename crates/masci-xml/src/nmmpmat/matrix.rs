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

use super::{DensityLayout, DensityMatrixError, CENTER, LINES_PER_BLOCK, SIZE, VALUES_PER_LINE};
use num_complex::Complex64;
use std::collections::HashMap;
use std::fmt;

/// One 7×7 occupation matrix.
pub type Block = [[Complex64; SIZE]; SIZE];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Blocks of a density matrix together with the layout they belong to.
///
/// The number of blocks always matches the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMatrix {
    layout: DensityLayout,
    blocks: Vec<Block>,
}

impl DensityMatrix {
    /// All blocks zero.
    pub fn zeros(layout: DensityLayout) -> Self {
        let blocks = vec![[[ZERO; SIZE]; SIZE]; layout.block_count()];
        Self { layout, blocks }
    }

    /// Read the file contents for a given layout. Trailing blank lines are
    /// ignored.
    pub fn parse(text: &str, layout: DensityLayout) -> Result<Self, DensityMatrixError> {
        let mut lines: Vec<&str> = text.lines().collect();
        while lines.last().map_or(false, |line| line.trim().is_empty()) {
            lines.pop();
        }
        let expected = layout.block_count() * LINES_PER_BLOCK;
        if lines.len() != expected {
            return Err(DensityMatrixError::LineCount {
                expected,
                found: lines.len(),
            });
        }

        let mut blocks = Vec::with_capacity(layout.block_count());
        for (block_number, chunk) in lines.chunks(LINES_PER_BLOCK).enumerate() {
            let mut values = Vec::with_capacity(LINES_PER_BLOCK * VALUES_PER_LINE);
            for (offset, line) in chunk.iter().enumerate() {
                let line_number = block_number * LINES_PER_BLOCK + offset + 1;
                let before = values.len();
                for token in line.split_whitespace() {
                    let value: f64 = token.parse().map_err(|_| DensityMatrixError::Malformed {
                        line: line_number,
                        message: format!("'{}' is not a number", token),
                    })?;
                    values.push(value);
                }
                if values.len() - before != VALUES_PER_LINE {
                    return Err(DensityMatrixError::Malformed {
                        line: line_number,
                        message: format!(
                            "expected {} numbers, found {}",
                            VALUES_PER_LINE,
                            values.len() - before
                        ),
                    });
                }
            }
            let mut block = [[ZERO; SIZE]; SIZE];
            for (entry, pair) in values.chunks(2).enumerate() {
                block[entry / SIZE][entry % SIZE] = Complex64::new(pair[0], pair[1]);
            }
            blocks.push(block);
        }
        Ok(Self { layout, blocks })
    }

    /// File contents, one line per 7 numbers, no trailing blank line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            let values: Vec<f64> = block
                .iter()
                .flat_map(|row| row.iter().flat_map(|z| [z.re, z.im]))
                .collect();
            for line in values.chunks(VALUES_PER_LINE) {
                for value in line {
                    out.push_str(&format!("{:20.13}", value));
                }
                out.push('\n');
            }
        }
        out
    }

    pub fn layout(&self) -> &DensityLayout {
        &self.layout
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, element: usize, spin: usize) -> &Block {
        &self.blocks[self.layout.block_index(element, spin)]
    }

    pub fn block_mut(&mut self, element: usize, spin: usize) -> &mut Block {
        let index = self.layout.block_index(element, spin);
        &mut self.blocks[index]
    }

    /// Move the blocks to a new layout. Blocks of LDA+U entries present in
    /// both layouts are kept, new entries start at zero. Entries are matched
    /// by species, orbital, `ldaU` position and species occurrence, so the
    /// position of the atom group does not matter.
    pub fn relayout(self, layout: DensityLayout) -> Self {
        if layout == self.layout {
            return self;
        }
        let mut known: HashMap<((&str, u8, usize, usize), usize), &Block> = HashMap::new();
        for (element_index, element) in self.layout.elements.iter().enumerate() {
            for spin in 0..self.layout.spin_blocks {
                known.insert((element.key(), spin), &self.blocks[self.layout.block_index(element_index, spin)]);
            }
        }
        let mut relaid = DensityMatrix::zeros(layout.clone());
        for (element_index, element) in layout.elements.iter().enumerate() {
            for spin in 0..layout.spin_blocks {
                if let Some(block) = known.get(&(element.key(), spin)) {
                    *relaid.block_mut(element_index, spin) = **block;
                }
            }
        }
        tracing::debug!(blocks = relaid.blocks.len(), "density matrix re-laid out");
        relaid
    }

    /// Check window zeros and occupation bounds.
    pub fn validate(&self, tolerance: f64) -> Result<(), DensityMatrixError> {
        let max = self.layout.max_occupation();
        for (element_index, element) in self.layout.elements.iter().enumerate() {
            let l = usize::from(element.orbital);
            for spin in 0..self.layout.spin_blocks {
                let block_number = self.layout.block_index(element_index, spin);
                let block = &self.blocks[block_number];
                for row in 0..SIZE {
                    for col in 0..SIZE {
                        let outside = row.abs_diff(CENTER) > l || col.abs_diff(CENTER) > l;
                        if outside && block[row][col].norm() > f64::EPSILON {
                            return Err(DensityMatrixError::NonZeroOutsideWindow {
                                block: block_number,
                                species: element.species.clone(),
                                orbital: element.orbital,
                                row,
                                col,
                            });
                        }
                    }
                }
                // the third block couples the two spins
                if spin >= 2 {
                    continue;
                }
                for index in CENTER - l..=CENTER + l {
                    let value = block[index][index].re;
                    if value < -tolerance || value > max + tolerance {
                        return Err(DensityMatrixError::OccupationOutOfBounds {
                            block: block_number,
                            species: element.species.clone(),
                            orbital: element.orbital,
                            m: index as i32 - CENTER as i32,
                            value,
                            min: -tolerance,
                            max: max + tolerance,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for DensityMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
