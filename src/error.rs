/// Errors that can occur when using a [`KeyMap`](crate::KeyMap), its views or its builder
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// The key's descriptor rejected the value offered to `insert`
    #[error("the key {key} rejects the value {value}")]
    InvalidValue { key: String, value: String },

    /// A checked cast found a value whose type doesn't match the key
    #[error("the key {key} cannot be mapped to values of type {found} (expected {expected})")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// An untyped caller (a view or a builder) supplied something the map can't use
    #[error("{context}: {source}")]
    InvalidArgument {
        context: &'static str,
        #[source]
        source: Box<MapError>,
    },

    /// A builder was used again after producing its map
    #[error("{0}")]
    IllegalState(&'static str),

    /// The map was accessed from inside one of its own closures
    #[error("the map is already borrowed")]
    BorrowConflict,
}

/// Result alias for map operations.
pub type MapResult<T> = Result<T, MapError>;

impl MapError {
    /// Wraps a rejection so untyped callers always see `InvalidArgument`.
    ///
    /// Borrow conflicts are not about the argument and pass through untouched.
    pub(crate) fn invalid_argument(context: &'static str, cause: MapError) -> MapError {
        match cause {
            MapError::BorrowConflict => cause,
            cause => MapError::InvalidArgument {
                context,
                source: Box::new(cause),
            },
        }
    }
}
