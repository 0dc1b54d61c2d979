//! Error types for picker operations

use thiserror::Error;

/// Picker specific errors
#[derive(Error, Debug)]
pub enum PickerError {
    /// A selected label has no match in the current candidate list
    #[error("no candidate found for label: {label}")]
    LookupMiss {
        /// The label that could not be resolved
        label: String,
    },

    /// Entity metadata could not be resolved; retried on the next call
    #[error("metadata unresolved for entity '{entity}'")]
    MetadataUnresolved {
        /// Logical name of the entity whose metadata failed to resolve
        entity: String,
        /// The underlying resolver error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A backend call failed
    #[error("backend operation failed: {operation}")]
    Backend {
        /// The operation that failed
        operation: String,
        /// The underlying backend error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The debounced query pipeline is no longer running
    #[error("query pipeline stopped: {0}")]
    Pipeline(String),
}

/// Result type for picker operations
pub type PickerResult<T> = std::result::Result<T, PickerError>;

impl PickerError {
    /// Wrap a backend failure with the operation that produced it
    pub fn backend(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            operation: operation.into(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_miss_names_the_label() {
        let err = PickerError::LookupMiss {
            label: "Gamma".to_string(),
        };
        assert_eq!(err.to_string(), "no candidate found for label: Gamma");
    }

    #[test]
    fn backend_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = PickerError::backend("associate", io);
        assert!(err.to_string().contains("associate"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
