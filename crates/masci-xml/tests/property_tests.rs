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

//! Property-based tests of journals, number formatting and rotations.
//!
//! # Properties Tested
//!
//! 1. **Undo**: `n` undos leave the first `len - n` tasks, none once `n > len`
//! 2. **Replay**: a journal rebuilt from its task list yields the same tree
//! 3. **Formatting**: written floats read back within ten significant digits
//! 4. **Rotations**: rotating and rotating back restores a block

use masci_test::{fixtures, load, registry};
use masci_xml::journal::{Journal, SetInpchangesArgs, ShiftValueArgs, Task};
use masci_xml::nmmpmat::{rotate_nmmpmat, set_nmmpmat, DensityLayout, DensityMatrix, Occupations, Rotation};
use masci_xml::setters::ShiftMode;
use masci_xml::types::format_float;
use masci_xml::Value;
use proptest::prelude::*;
use std::collections::BTreeMap;

fn edit() -> impl Strategy<Value = Task> {
    prop_oneof![
        (3.0f64..5.0).prop_map(|kmax| Task::SetInpchanges(SetInpchangesArgs {
            changes: BTreeMap::from([("Kmax".to_string(), Value::Float(kmax))]),
            path_spec: BTreeMap::new(),
        })),
        (0u32..20).prop_map(|itmax| Task::SetInpchanges(SetInpchangesArgs {
            changes: BTreeMap::from([("itmax".to_string(), Value::Int(itmax as i64))]),
            path_spec: BTreeMap::new(),
        })),
        (-0.2f64..0.2, any::<bool>()).prop_map(|(delta, relative)| Task::ShiftValue(ShiftValueArgs {
            changes: BTreeMap::from([("radius".to_string(), delta)]),
            mode: if relative { ShiftMode::Rel } else { ShiftMode::Abs },
            path_spec: BTreeMap::new(),
        })),
    ]
}

fn trace(matrix: &DensityMatrix) -> f64 {
    let block = matrix.block(0, 0);
    (0..block.len()).map(|i| block[i][i].re).sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: undoing n tasks keeps the first len - n in order
    #[test]
    fn prop_undo_keeps_prefix(tasks in prop::collection::vec(edit(), 1..8), undos in 0usize..12) {
        let mut journal = Journal::new(registry());
        for task in &tasks {
            journal.record(task.clone()).unwrap();
        }
        let full = journal.task_list().unwrap();
        for _ in 0..undos {
            journal.undo(false).unwrap();
        }
        let kept = tasks.len().saturating_sub(undos);
        prop_assert_eq!(journal.len(), kept);
        prop_assert_eq!(journal.task_list().unwrap(), full[..kept].to_vec());
    }

    /// Property: from_list(task_list()) replays to an equal tree
    #[test]
    fn prop_task_list_replays(tasks in prop::collection::vec(edit(), 0..6)) {
        let (input, _) = load(fixtures::fe_pt_inp());
        let mut journal = Journal::new(registry());
        for task in tasks {
            journal.record(task).unwrap();
        }
        let mut replayed = Journal::from_list(registry(), journal.task_list().unwrap()).unwrap();
        let first = journal.apply(&input, None).unwrap();
        let second = replayed.apply(&input, None).unwrap();
        prop_assert_eq!(&first.tree, &second.tree);
        prop_assert!(first.schema.validate(&first.tree).is_ok());
    }

    /// Property: the JSON form of a journal restores the same task list
    #[test]
    fn prop_json_roundtrip(tasks in prop::collection::vec(edit(), 0..6)) {
        let mut journal = Journal::new(registry());
        for task in tasks {
            journal.record(task).unwrap();
        }
        let restored = Journal::from_json(registry(), &journal.to_json().unwrap()).unwrap();
        prop_assert_eq!(restored.task_list().unwrap(), journal.task_list().unwrap());
    }

    /// Property: formatted floats parse back within ten significant digits
    #[test]
    fn prop_format_float_precision(value in -1.0e6f64..1.0e6) {
        let text = format_float(value);
        let parsed: f64 = text.parse().unwrap();
        prop_assert!((parsed - value).abs() <= 1e-9 * value.abs().max(1e-300));
        prop_assert!(text.contains('.') || text.contains('e'));
    }

    /// Property: formatting is idempotent
    #[test]
    fn prop_format_float_idempotent(value in -1.0e12f64..1.0e12) {
        let text = format_float(value);
        let parsed: f64 = text.parse().unwrap();
        prop_assert_eq!(format_float(parsed), text);
    }

    /// Property: rotating by any angles and back restores the block
    #[test]
    fn prop_rotation_inverse(
        phi in -6.3f64..6.3,
        theta in -3.2f64..3.2,
        occupations in prop::collection::vec(0.0f64..1.0, 5),
    ) {
        let (tree, schema) = load(fixtures::ldau_inp());
        let mut matrix = DensityMatrix::zeros(DensityLayout::from_tree(&tree, &schema).unwrap());
        set_nmmpmat(&mut matrix, "Ga-1", 2, 1, &Occupations::OrbitalOccupations(occupations), None).unwrap();
        let before = matrix.clone();
        let rotation = Rotation::new(phi, theta);
        rotate_nmmpmat(&mut matrix, "Ga-1", 2, rotation).unwrap();
        prop_assert!((trace(&matrix) - trace(&before)).abs() < 1e-12);
        rotate_nmmpmat(&mut matrix, "Ga-1", 2, rotation.inverted()).unwrap();
        for (a, b) in matrix.blocks().iter().zip(before.blocks()) {
            for (row_a, row_b) in a.iter().zip(b) {
                for (x, y) in row_a.iter().zip(row_b) {
                    prop_assert!((x - y).norm() < 1e-12);
                }
            }
        }
    }
}
