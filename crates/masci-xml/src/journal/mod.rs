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

//! Recording edits and applying them to a document in one go.
//!
//! A [`Journal`] holds an ordered list of [`Task`]s. [`Journal::apply`]
//! clones the input tree (and density matrix), runs every task, validates
//! the result and hands back new values. The caller's inputs are never
//! touched, so a failed apply leaves nothing half done.
//!
//! # Examples
//!
//! ```rust
//! use masci_xml::journal::{Journal, SetInpchangesArgs, Task};
//! use masci_xml::{Value, XmlTree};
//! use std::collections::BTreeMap;
//!
//! let tree = XmlTree::parse(masci_test::fixtures::fe_pt_inp())?;
//! let mut journal = Journal::default();
//! journal.record(Task::SetInpchanges(SetInpchangesArgs {
//!     changes: BTreeMap::from([("Kmax".to_string(), Value::Float(3.9))]),
//!     path_spec: BTreeMap::new(),
//! }))?;
//!
//! let modified = journal.apply(&tree, None)?;
//! assert_eq!(
//!     masci_xml::xpath::select_values(&modified.tree, "//cutoffs/@Kmax")?,
//!     vec!["3.9"]
//! );
//! # Ok::<(), masci_xml::Error>(())
//! ```

mod tasks;

pub use tasks::*;

use crate::error::{Error, Result};
use crate::loader::schema_for;
use crate::nmmpmat::{DensityLayout, DensityMatrix, DEFAULT_TOLERANCE};
use crate::schema::{SchemaDescriptor, SchemaRegistry};
use crate::tree::{WriteConfig, XmlTree};
use std::fmt;
use std::sync::Arc;

/// Settings of [`Journal::apply`].
#[derive(Debug, Clone)]
pub struct ModifierConfig {
    /// Validate the result against the schema (and the density matrix
    /// against the document).
    pub validate: bool,
    /// Slack of the density matrix occupation bounds.
    pub nmmpmat_tolerance: f64,
    /// Output format of [`Journal::apply_to_string`].
    pub write: WriteConfig,
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            validate: true,
            nmmpmat_tolerance: DEFAULT_TOLERANCE,
            write: WriteConfig::default(),
        }
    }
}

/// Lifecycle of a [`Journal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalState {
    /// Tasks can be recorded, undone and applied.
    Open,
    /// An apply is running.
    Applying,
    /// The last apply failed; see [`Journal::reset`].
    Closed,
}

impl fmt::Display for JournalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalState::Open => f.write_str("open"),
            JournalState::Applying => f.write_str("applying"),
            JournalState::Closed => f.write_str("closed"),
        }
    }
}

/// Result of [`Journal::apply`].
#[derive(Debug, Clone)]
pub struct Modified {
    pub tree: XmlTree,
    pub schema: Arc<SchemaDescriptor>,
    /// Present when a density matrix was passed in or created, and the
    /// document has LDA+U entries.
    pub nmmpmat: Option<DensityMatrix>,
}

/// Ordered list of recorded edits.
#[derive(Debug, Clone)]
pub struct Journal {
    tasks: Vec<Task>,
    state: JournalState,
    registry: Arc<SchemaRegistry>,
    config: ModifierConfig,
}

impl Default for Journal {
    /// Empty journal using the bundled schemas.
    fn default() -> Self {
        Self::new(Arc::new(SchemaRegistry::default()))
    }
}

impl Journal {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            tasks: Vec::new(),
            state: JournalState::Open,
            registry,
            config: ModifierConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ModifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ModifierConfig {
        &self.config
    }

    pub fn state(&self) -> JournalState {
        self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn ensure_open(&self, action: &str) -> Result<()> {
        if self.state == JournalState::Open {
            Ok(())
        } else {
            Err(Error::InvalidOperation(format!(
                "cannot {} while the journal is {}",
                action, self.state
            )))
        }
    }

    /// Append a task.
    pub fn record(&mut self, task: Task) -> Result<()> {
        self.ensure_open("record")?;
        tracing::debug!(operation = task.operation(), index = self.tasks.len(), "task recorded");
        self.tasks.push(task);
        Ok(())
    }

    /// Drop the last task, or all of them. Nothing happens on an empty
    /// journal.
    pub fn undo(&mut self, revert_all: bool) -> Result<()> {
        self.ensure_open("undo")?;
        if revert_all {
            self.tasks.clear();
        } else {
            self.tasks.pop();
        }
        Ok(())
    }

    /// Reopen a journal closed by a failed apply. Recorded tasks are kept.
    pub fn reset(&mut self) {
        self.state = JournalState::Open;
    }

    /// `(operation, arguments)` pairs of all tasks.
    pub fn task_list(&self) -> Result<Vec<(String, serde_json::Value)>> {
        self.tasks
            .iter()
            .map(|task| {
                let value = serde_json::to_value(task)?;
                match value {
                    serde_json::Value::Object(map) if map.len() == 1 => map
                        .into_iter()
                        .next()
                        .ok_or_else(|| Error::InvalidOperation("empty task".to_string())),
                    serde_json::Value::String(name) => Ok((name, serde_json::Value::Null)),
                    other => Err(Error::InvalidOperation(format!("unexpected task form: {}", other))),
                }
            })
            .collect()
    }

    /// Journal replaying a task list as produced by [`Journal::task_list`].
    ///
    /// # Errors
    ///
    /// `InvalidOperation` for unknown operation names, `InvalidArgument` for
    /// arguments not matching the operation.
    pub fn from_list(registry: Arc<SchemaRegistry>, list: Vec<(String, serde_json::Value)>) -> Result<Self> {
        let mut journal = Self::new(registry);
        for (name, arguments) in list {
            if !OPERATIONS.iter().any(|(operation, _)| *operation == name) {
                return Err(Error::InvalidOperation(format!("unknown operation '{}'", name)));
            }
            let mut wrapped = serde_json::Map::new();
            wrapped.insert(name.clone(), arguments);
            let task: Task = serde_json::from_value(serde_json::Value::Object(wrapped))
                .map_err(|e| Error::InvalidArgument(format!("arguments of '{}': {}", name, e)))?;
            journal.tasks.push(task);
        }
        Ok(journal)
    }

    /// The task list as a JSON array of `[operation, arguments]` pairs.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.task_list()?)?)
    }

    pub fn from_json(registry: Arc<SchemaRegistry>, json: &str) -> Result<Self> {
        let list: Vec<(String, serde_json::Value)> = serde_json::from_str(json)?;
        Self::from_list(registry, list)
    }

    /// Run all tasks on copies of `tree` and the density matrix text.
    ///
    /// On failure the journal is closed and the error names the failing
    /// task; the inputs are left as they were.
    pub fn apply(&mut self, tree: &XmlTree, nmmpmat: Option<&str>) -> Result<Modified> {
        self.ensure_open("apply")?;
        self.state = JournalState::Applying;
        let result = self.run(tree, nmmpmat);
        self.state = if result.is_ok() {
            JournalState::Open
        } else {
            JournalState::Closed
        };
        result
    }

    /// [`Journal::apply`] on document text, returning the new document
    /// written with the configured [`WriteConfig`] and the new density
    /// matrix file.
    pub fn apply_to_string(&mut self, xml: &str, nmmpmat: Option<&str>) -> Result<(String, Option<String>)> {
        let tree = XmlTree::parse(xml)?;
        let modified = self.apply(&tree, nmmpmat)?;
        let text = modified.tree.to_xml_string(&self.config.write)?;
        Ok((text, modified.nmmpmat.map(|matrix| matrix.to_text())))
    }

    fn run(&self, input: &XmlTree, nmmpmat: Option<&str>) -> Result<Modified> {
        let schema = schema_for(input, &self.registry)?;
        let mut tree = input.compacted();
        let mut matrix = match nmmpmat {
            Some(text) => Some(DensityMatrix::parse(text, DensityLayout::from_tree(&tree, &schema)?)?),
            None => None,
        };

        for (index, task) in self.tasks.iter().enumerate() {
            tracing::debug!(index, operation = task.operation(), "applying task");
            task.run(&mut tree, &schema, &mut matrix)
                .map_err(|e| e.in_task(index, task.operation()))?;
        }

        let matrix = match matrix {
            Some(matrix) => {
                let layout = DensityLayout::from_tree(&tree, &schema)?;
                if layout.elements.is_empty() {
                    tracing::debug!("no LDA+U entries left, density matrix dropped");
                    None
                } else {
                    Some(matrix.relayout(layout))
                }
            }
            None => None,
        };

        if self.config.validate {
            schema.validate(&tree)?;
            if let Some(matrix) = &matrix {
                matrix.validate(self.config.nmmpmat_tolerance)?;
            }
        }
        tracing::info!(tasks = self.tasks.len(), version = %schema.version(), "journal applied");
        Ok(Modified {
            tree,
            schema,
            nmmpmat: matrix,
        })
    }
}

impl fmt::Display for Journal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Journal ({} tasks, {})", self.tasks.len(), self.state)?;
        for (index, task) in self.tasks.iter().enumerate() {
            let arguments = serde_json::to_value(task)
                .ok()
                .and_then(|value| value.get(task.operation()).cloned())
                .unwrap_or_default();
            writeln!(f, "  {:>3}: {} {}", index, task.operation(), arguments)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use crate::xpath::select_values;
    use crate::ErrorKind;
    use std::collections::BTreeMap;

    fn set_kmax(kmax: f64) -> Task {
        Task::SetInpchanges(SetInpchangesArgs {
            changes: BTreeMap::from([("Kmax".to_string(), Value::Float(kmax))]),
            path_spec: BTreeMap::new(),
        })
    }

    #[test]
    fn test_record_and_undo() {
        let mut journal = Journal::default();
        journal.record(set_kmax(3.9)).unwrap();
        journal.record(set_kmax(4.1)).unwrap();
        journal.undo(false).unwrap();
        assert_eq!(journal.tasks(), &[set_kmax(3.9)]);
        journal.undo(true).unwrap();
        assert!(journal.is_empty());
    }

    #[test]
    fn test_undo_past_empty() {
        let mut journal = Journal::default();
        journal
            .record(Task::SetNkpts(SetNkptsArgs { count: 8, gamma: false }))
            .unwrap();
        for _ in 0..3 {
            journal.undo(false).unwrap();
        }
        assert!(journal.is_empty());
        assert!(journal.task_list().unwrap().is_empty());
        journal.undo(true).unwrap();
        assert_eq!(journal.state(), JournalState::Open);
    }

    #[test]
    fn test_failed_apply_closes_journal() {
        let tree = XmlTree::parse(masci_test::fixtures::fe_pt_inp()).unwrap();
        let mut journal = Journal::default();
        journal.record(set_kmax(3.9)).unwrap();
        journal
            .record(Task::SwitchKpointset(SwitchKpointsetArgs {
                list_name: "missing".to_string(),
            }))
            .unwrap();
        let err = journal.apply(&tree, None).unwrap_err();
        assert_eq!(err.task_index(), Some(1));
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
        assert_eq!(journal.state(), JournalState::Closed);
        assert_eq!(journal.record(set_kmax(1.0)).unwrap_err().kind(), ErrorKind::InvalidOperation);

        journal.reset();
        journal.undo(false).unwrap();
        let modified = journal.apply(&tree, None).unwrap();
        assert_eq!(select_values(&modified.tree, "//cutoffs/@Kmax").unwrap(), vec!["3.9"]);
        // the input is untouched
        assert_eq!(select_values(&tree, "//cutoffs/@Kmax").unwrap(), vec!["4.0"]);
    }

    #[test]
    fn test_apply_leaves_detached_nodes_behind() {
        let parsed = XmlTree::parse(masci_test::fixtures::fe_pt_inp()).unwrap();
        let mut tree = parsed.clone();
        for _ in 0..100 {
            tree.new_element("scratch");
        }
        assert_eq!(tree.allocated(), parsed.allocated() + 100);

        let mut journal = Journal::default();
        journal.record(set_kmax(3.9)).unwrap();
        let modified = journal.apply(&tree, None).unwrap();
        assert_eq!(modified.tree.allocated(), parsed.allocated());
        assert_eq!(select_values(&modified.tree, "//cutoffs/@Kmax").unwrap(), vec!["3.9"]);
    }

    #[test]
    fn test_unknown_operation() {
        let list = vec![("set_everything".to_string(), serde_json::json!({}))];
        let err = Journal::from_list(Arc::new(SchemaRegistry::default()), list).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);

        let list = vec![("set_inpchanges".to_string(), serde_json::json!({"changes": 3}))];
        let err = Journal::from_list(Arc::new(SchemaRegistry::default()), list).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_task_list_round_trip() {
        let mut journal = Journal::default();
        journal.record(set_kmax(3.9)).unwrap();
        journal
            .record(Task::SetNkpts(SetNkptsArgs { count: 8, gamma: true }))
            .unwrap();
        let list = journal.task_list().unwrap();
        assert_eq!(list[0].0, "set_inpchanges");
        assert_eq!(list[1], ("set_nkpts".to_string(), serde_json::json!({"count": 8, "gamma": true})));

        let replayed = Journal::from_json(Arc::new(SchemaRegistry::default()), &journal.to_json().unwrap()).unwrap();
        assert_eq!(replayed.tasks(), journal.tasks());
    }

    #[test]
    fn test_display_lists_tasks() {
        let mut journal = Journal::default();
        journal.record(set_kmax(3.9)).unwrap();
        let text = journal.to_string();
        assert!(text.starts_with("Journal (1 tasks, open)"));
        assert!(text.contains(r#"0: set_inpchanges {"changes":{"Kmax":3.9}}"#));
    }

    #[test]
    fn test_validation_can_be_disabled() {
        let tree = XmlTree::parse(masci_test::fixtures::fe_pt_inp()).unwrap();
        let task = Task::XmlSetAttribValueNoCreate(XmlSetAttribArgs {
            xpath: "/fleurInput/calculationSetup/cutoffs".to_string(),
            name: "Kmax".to_string(),
            value: Value::from("lots"),
            occurrences: None,
        });
        let mut journal = Journal::default();
        journal.record(task.clone()).unwrap();
        assert_eq!(journal.apply(&tree, None).unwrap_err().kind(), ErrorKind::ValidationFailure);

        let config = ModifierConfig {
            validate: false,
            ..ModifierConfig::default()
        };
        let mut journal = Journal::default().with_config(config);
        journal.record(task).unwrap();
        let modified = journal.apply(&tree, None).unwrap();
        assert_eq!(select_values(&modified.tree, "//cutoffs/@Kmax").unwrap(), vec!["lots"]);
    }
}
