// src/error.rs
//! Unified error handling for VTool Core
//!
//! Every fallible operation in the crate returns [`VtoolResult`]. The variants map
//! onto the failure classes the data model distinguishes:
//!
//! - [`VtoolError::InvalidInput`]: malformed argument shape, type or value
//! - [`VtoolError::NotFound`]: a requested name or index has no match
//! - [`VtoolError::Incompatible`]: structural mismatch between groups, datasets or arrays
//! - [`VtoolError::Batch`]: a per-element failure inside an array operation
//!
//! Degenerate data (all-NaN or zero-length signals) is never an error; it yields NaN.

use thiserror::Error;

/// Unified error type for the whole crate
#[derive(Debug, Error)]
pub enum VtoolError {
    /// Malformed argument (wrong length, non-monotonic edges, bad keyword, ...)
    #[error("invalid input '{parameter}': {reason}")]
    InvalidInput {
        /// Argument or field at fault
        parameter: String,
        /// What is wrong with it
        reason: String,
    },

    /// Requested signal, group or index has no match
    #[error("'{name}' not found in {context}")]
    NotFound {
        /// Name that was looked up
        name: String,
        /// Where it was looked up
        context: String,
    },

    /// Two or more values cannot be combined (layers, units or lengths differ)
    #[error("incompatible {what}: {reason}")]
    Incompatible {
        /// Property that differs
        what: String,
        /// How it differs
        reason: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("configuration error: {reason}")]
    Configuration {
        /// What went wrong
        reason: String,
    },

    /// A single element of an array operation failed; the whole batch aborted
    #[error("element {index}: {source}")]
    Batch {
        /// Position of the failing element
        index: usize,
        /// Failure of that element
        #[source]
        source: Box<VtoolError>,
    },

    /// Underlying file system failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for VTool operations
pub type VtoolResult<T> = Result<T, VtoolError>;

impl VtoolError {
    /// Bad argument value or malformed input structure
    pub fn invalid_input(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        VtoolError::InvalidInput {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Name that resolves nowhere in `context`
    pub fn not_found(name: impl Into<String>, context: impl Into<String>) -> Self {
        VtoolError::NotFound {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Inputs that are individually fine but do not fit together
    pub fn incompatible(what: impl Into<String>, reason: impl Into<String>) -> Self {
        VtoolError::Incompatible {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Unusable configuration
    pub fn configuration(reason: impl Into<String>) -> Self {
        VtoolError::Configuration {
            reason: reason.into(),
        }
    }

    /// Wrap this error with the index of the array element that produced it
    pub fn at_index(self, index: usize) -> Self {
        VtoolError::Batch {
            index,
            source: Box::new(self),
        }
    }

    /// Strip any batch annotation and return the innermost error
    pub fn root(&self) -> &VtoolError {
        match self {
            VtoolError::Batch { source, .. } => source.root(),
            other => other,
        }
    }

    /// True if this is (or wraps) a `NotFound` error
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), VtoolError::NotFound { .. })
    }

    /// True if this is (or wraps) an `Incompatible` error
    pub fn is_incompatible(&self) -> bool {
        matches!(self.root(), VtoolError::Incompatible { .. })
    }

    /// True if this is (or wraps) an `InvalidInput` error
    pub fn is_invalid_input(&self) -> bool {
        matches!(self.root(), VtoolError::InvalidInput { .. })
    }
}

impl From<toml::de::Error> for VtoolError {
    fn from(err: toml::de::Error) -> Self {
        VtoolError::configuration(err.to_string())
    }
}

impl From<toml::ser::Error> for VtoolError {
    fn from(err: toml::ser::Error) -> Self {
        VtoolError::configuration(err.to_string())
    }
}

/// Convenience trait for annotating results produced inside batch loops
pub trait WithIndex<T> {
    /// Wrap an error as a [`VtoolError::Batch`] failure at `index`
    fn at_index(self, index: usize) -> VtoolResult<T>;
}

impl<T> WithIndex<T> for VtoolResult<T> {
    fn at_index(self, index: usize) -> VtoolResult<T> {
        self.map_err(|err| err.at_index(index))
    }
}
