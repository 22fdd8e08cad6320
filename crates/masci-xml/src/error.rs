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

//! Error types for document loading, schema lookups and modifications.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. Failures that
//! happen while a [`Journal`](crate::Journal) is applied are wrapped in
//! [`Error::Task`], which records the index and operation name of the failing
//! task; [`Error::kind`] sees through that wrapper.

use crate::nmmpmat::DensityMatrixError;
use crate::schema::{SchemaKind, ValidationError};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The document declares a schema version without a registered descriptor.
    UnknownSchemaVersion,
    /// A tag or attribute could not be found and was not allowed to be created.
    PathNotFound,
    /// Disambiguation did not narrow a name down to one schema location.
    PathAmbiguous,
    /// A value could not be converted to the schema type.
    TypeMismatch,
    /// An operation was requested that cannot be dispatched in this state.
    InvalidOperation,
    /// Arguments of an operation are inconsistent or conflict with the document.
    InvalidArgument,
    /// An operation is not available for the schema version of the document.
    UnsupportedVersion,
    /// Schema validation or the density matrix consistency check failed.
    ValidationFailure,
    /// A tag should be created below a parent that does not exist.
    ParentMissing,
    /// XML, XPath or density matrix text could not be parsed.
    Parse,
    /// A schema file is malformed.
    Schema,
    /// Reading or writing a file failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnknownSchemaVersion => "UnknownSchemaVersion",
            Self::PathNotFound => "PathNotFound",
            Self::PathAmbiguous => "PathAmbiguous",
            Self::TypeMismatch => "TypeMismatch",
            Self::InvalidOperation => "InvalidOperation",
            Self::InvalidArgument => "InvalidArgument",
            Self::UnsupportedVersion => "UnsupportedVersion",
            Self::ValidationFailure => "ValidationFailure",
            Self::ParentMissing => "ParentMissing",
            Self::Parse => "ParseError",
            Self::Schema => "SchemaError",
            Self::Io => "IOError",
        };
        f.write_str(name)
    }
}

/// Reason a final validation step rejected a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationFailure {
    /// The XML tree does not conform to its schema.
    #[error("schema validation failed: {0}")]
    Schema(#[from] ValidationError),
    /// The density matrix is inconsistent with the document.
    #[error("n_mmp_mat validation failed: {0}")]
    DensityMatrix(#[from] DensityMatrixError),
}

/// The error type of this crate.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// No schema descriptor is registered for the declared version.
    #[error("no {kind} schema registered for version '{version}'")]
    UnknownSchemaVersion {
        /// Input or output schema
        kind: SchemaKind,
        /// Version string as declared by the document
        version: String,
    },

    /// A tag or attribute does not exist (in the schema or in the document).
    #[error("'{name}' not found: {message}")]
    PathNotFound {
        /// Tag name, attribute name or XPath that was looked up
        name: String,
        /// What was searched for and where
        message: String,
    },

    /// More than one schema location is left after applying the disambiguators.
    #[error("'{name}' is ambiguous, possible paths: {}", .candidates.join(", "))]
    PathAmbiguous {
        /// Tag or attribute name
        name: String,
        /// Remaining canonical paths
        candidates: Vec<String>,
    },

    /// A value cannot be converted to the type declared by the schema.
    #[error("cannot use '{value}' for '{name}': expected {expected}")]
    TypeMismatch {
        /// Attribute or tag name
        name: String,
        /// Offending value
        value: String,
        /// Human readable description of the declared type
        expected: String,
    },

    /// Operation not registered or not allowed in the current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Inconsistent or conflicting arguments.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation has no implementation for the document's schema version.
    #[error("'{operation}' is not supported for schema version {version}")]
    UnsupportedVersion {
        /// Operation name
        operation: String,
        /// Version of the document
        version: String,
    },

    /// Post-modification validation failed.
    #[error(transparent)]
    ValidationFailure(#[from] ValidationFailure),

    /// A tag cannot be created because its parent is missing.
    #[error("cannot create '{tag}': no parent found at '{xpath}' (use create_parents to create it)")]
    ParentMissing {
        /// Tag to be created
        tag: String,
        /// XPath of the missing parent
        xpath: String,
    },

    /// Input text could not be parsed.
    #[error("parse error{}: {message}", .position.map(|p| format!(" at position {}", p)).unwrap_or_default())]
    Parse {
        /// Description of the problem
        message: String,
        /// Byte offset of the problem, if known
        position: Option<usize>,
    },

    /// The schema file itself is malformed or unsupported.
    #[error("schema error: {0}")]
    Schema(String),

    /// I/O failure with path context.
    #[error("I/O error for '{path}': {message}")]
    Io {
        /// Path of the file
        path: PathBuf,
        /// Error message of the underlying I/O error
        message: String,
    },

    /// A task of a journal failed while it was applied.
    #[error("task {index} ({operation}) failed: {source}")]
    Task {
        /// Zero-based position of the task in the journal
        index: usize,
        /// Operation name of the task
        operation: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Category of this error, looking through [`Error::Task`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownSchemaVersion { .. } => ErrorKind::UnknownSchemaVersion,
            Self::PathNotFound { .. } => ErrorKind::PathNotFound,
            Self::PathAmbiguous { .. } => ErrorKind::PathAmbiguous,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Self::ValidationFailure(_) => ErrorKind::ValidationFailure,
            Self::ParentMissing { .. } => ErrorKind::ParentMissing,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Io { .. } => ErrorKind::Io,
            Self::Task { source, .. } => source.kind(),
        }
    }

    /// Index of the failing task, if this error came out of a journal.
    pub fn task_index(&self) -> Option<usize> {
        match self {
            Self::Task { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn not_found(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PathNotFound {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(
        name: impl Into<String>,
        value: impl fmt::Display,
        expected: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            position: None,
        }
    }

    /// Create an I/O error with file path context.
    pub fn io_error(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    pub(crate) fn in_task(self, index: usize, operation: &str) -> Self {
        Self::Task {
            index,
            operation: operation.to_string(),
            source: Box::new(self),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::ValidationFailure(ValidationFailure::Schema(err))
    }
}

impl From<DensityMatrixError> for Error {
    fn from(err: DensityMatrixError) -> Self {
        Error::ValidationFailure(ValidationFailure::DensityMatrix(err))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Parse {
            message: err.to_string(),
            position: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse {
            message: format!("invalid task list: {}", err),
            position: Some(err.column()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_sees_through_task_wrapper() {
        let err = Error::not_found("Kmax", "no such attribute").in_task(2, "set_inpchanges");
        assert_eq!(err.kind(), ErrorKind::PathNotFound);
        assert_eq!(err.task_index(), Some(2));
        assert!(err.to_string().starts_with("task 2 (set_inpchanges) failed"));
    }

    #[test]
    fn test_ambiguous_display_lists_candidates() {
        let err = Error::PathAmbiguous {
            name: "spinf".to_string(),
            candidates: vec![
                "/fleurInput/calculationSetup/scfLoop/@spinf".to_string(),
                "/fleurInput/calculationSetup/ldaU/@spinf".to_string(),
            ],
        };
        let display = err.to_string();
        assert!(display.contains("scfLoop/@spinf"));
        assert!(display.contains("ldaU/@spinf"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = Error::Parse {
            message: "unexpected end of file".to_string(),
            position: Some(42),
        };
        assert_eq!(
            err.to_string(),
            "parse error at position 42: unexpected end of file"
        );
        assert_eq!(Error::parse("bad").to_string(), "parse error: bad");
    }

    #[test]
    fn test_validation_error_converts() {
        let err: Error = ValidationError::UnknownElement {
            element: "bogus".to_string(),
            path: None,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ErrorKind::ParentMissing.to_string(), "ParentMissing");
        assert_eq!(ErrorKind::Io.to_string(), "IOError");
    }
}
