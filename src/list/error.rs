use crate::source::SourceError;

fn at_item(item: &Option<usize>) -> String {
    match item {
        Some(index) => format!(" at item {}", index),
        None => String::new(),
    }
}

/// Errors surfaced by record lists and their decorators.
///
/// Every variant names the component that failed so a broken link in a
/// decorator chain can be identified from the message alone.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    /// Positional access past the end of the list
    #[error("[{component}] index {index} out of range (size {size})")]
    OutOfRange {
        /// List that rejected the access
        component: String,
        /// Requested ordinal
        index: usize,
        /// Size of the list
        size: usize,
    },

    /// The underlying source failed
    #[error("[{component}] source failure{}: {source}", at_item(.item))]
    Source {
        /// List that called the source
        component: String,
        /// Item being read, if the failure is local to one item
        item: Option<usize>,
        /// Underlying failure
        #[source]
        source: SourceError,
    },

    /// Decorator arguments failed validation at construction time
    #[error("[{component}] configuration rejected: {reason}")]
    ConfigurationRejected {
        /// Decorator or command that was rejected
        component: String,
        /// Why
        reason: String,
    },

    /// A cached byte offset still did not point at a record after rebuilding the index
    #[error("[{component}] index is stale: no record marker at byte offset {offset} even after rebuilding")]
    StaleIndex {
        /// List owning the index
        component: String,
        /// Offending offset
        offset: u64,
    },

    /// An earlier index build failed; the list is unusable
    #[error("[{component}] index build failed: {message}")]
    IndexBuildFailed {
        /// List owning the index
        component: String,
        /// Failure reported by the build
        message: String,
    },

    /// Two items produced the same id while building an index
    #[error("[{component}] duplicate id '{id}'")]
    DuplicateId {
        /// List owning the index
        component: String,
        /// The repeated id
        id: String,
    },

    /// I/O error outside of a source call (index cache files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (index cache files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ListError {
    /// Shorthand for [`ListError::OutOfRange`]
    pub fn out_of_range(component: impl Into<String>, index: usize, size: usize) -> Self {
        ListError::OutOfRange {
            component: component.into(),
            index,
            size,
        }
    }

    /// Shorthand for [`ListError::Source`]
    pub fn source(component: impl Into<String>, item: Option<usize>, source: SourceError) -> Self {
        ListError::Source {
            component: component.into(),
            item,
            source,
        }
    }

    /// Shorthand for [`ListError::ConfigurationRejected`]
    pub fn rejected(component: impl Into<String>, reason: impl Into<String>) -> Self {
        ListError::ConfigurationRejected {
            component: component.into(),
            reason: reason.into(),
        }
    }

    /// True for positional errors, which never indicate a broken list
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, ListError::OutOfRange { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_component_and_item() {
        let err = ListError::source("SourceSpectrumList", Some(4), SourceError::Corrupt("bad row".into()));
        let message = err.to_string();
        assert!(message.contains("SourceSpectrumList"));
        assert!(message.contains("at item 4"));
        assert!(message.contains("bad row"));

        let err = ListError::out_of_range("SimpleList", 10, 3);
        assert_eq!(err.to_string(), "[SimpleList] index 10 out of range (size 3)");
        assert!(err.is_out_of_range());
    }
}
