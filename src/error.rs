use thiserror::Error;

/// An attempt to modify the [State](crate::State) of a
/// [Store](crate::Store) outside of a reducer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMutationError {
    /// Top-level properties can only be changed by a reducer's patch.
    #[error("cannot assign top-level state property `{key}` outside of a reducer")]
    TopLevelAssignment { key: String },

    /// [StateCell::update_nested()](crate::StateCell::update_nested())
    /// was pointed at a property which is missing or not an object.
    #[error("state property `{key}` is not a nested object")]
    NotNested { key: String },
}

/// Errors produced by a [Store](crate::Store) and its reducers.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    StateMutation(#[from] StateMutationError),

    #[error("no reducer named `{name}`")]
    UnknownReducer { name: String },

    #[error("unknown store event `{name}`")]
    UnknownEvent { name: String },

    #[error("initial state must be an object")]
    StateNotAnObject,

    #[error("state conversion failed: {0}")]
    Serde(#[from] serde_json::Error),

    /// A [LiveReducers](crate::LiveReducers) outlived the store it was
    /// created for.
    #[error("the store has been dropped")]
    StoreDropped,

    /// An error returned by a reducer definition, or one of the
    /// continuations it produced, passed through untouched.
    #[error(transparent)]
    Reducer(anyhow::Error),
}

impl StoreError {
    /// The reducer's own error, if this is a [StoreError::Reducer].
    pub fn reducer_error(&self) -> Option<&anyhow::Error> {
        match self {
            StoreError::Reducer(error) => Some(error),
            _ => None,
        }
    }
}
