//! Binding named reducers to a [Store](crate::Store), and resolving
//! their invocations.

use crate::{
    store::StoreInner, Continuation, Outcome, Resolution, Stage, State, StoreError,
};
use serde_json::Value;
use std::{
    fmt::Debug,
    rc::{Rc, Weak},
};

/// Resolve one invocation of the reducer `name` with `payload`.
///
/// Each [Resolution::Continue] moves to the next [Stage]; its
/// continuation is called with the state as it is at that moment, or
/// with a fresh [LiveReducers]. The first [Resolution::Patch] is merged
/// and its listeners notified. Errors abort the invocation before
/// anything is merged.
pub(crate) fn resolve(
    store: &Rc<StoreInner>,
    name: &str,
    payload: Value,
) -> Result<Outcome, StoreError> {
    let reducer = store.reducer(name)?;

    let mut stage = Stage::Payload;
    log::trace!("reducer `{}`: stage {} with payload {}", name, stage.number(), payload);
    let mut resolution = reducer.reduce(payload).map_err(reducer_error)?;

    loop {
        match resolution {
            Resolution::Patch(patch) => {
                store.merge(name, &patch);
                return Ok(Outcome::Merged { stage });
            }
            Resolution::Nothing => {
                log::trace!("reducer `{}`: nothing to merge at stage {}", name, stage.number());
                return Ok(Outcome::NoOp { stage });
            }
            Resolution::Continue(continuation) => {
                stage = match stage.next() {
                    Some(next) => next,
                    None => {
                        log::warn!(
                            "reducer `{}`: continuation returned from the last stage is ignored",
                            name
                        );
                        return Ok(Outcome::NoOp { stage });
                    }
                };

                log::trace!("reducer `{}`: stage {}", name, stage.number());
                resolution = match continuation {
                    Continuation::WithState(continuation) => {
                        let state = store.state_cell().get();
                        continuation(&*state)
                    }
                    Continuation::WithReducers(continuation) => {
                        continuation(&LiveReducers::new(store))
                    }
                }
                .map_err(reducer_error)?;
            }
        }
    }
}

/// A [StoreError] raised by a nested invocation, e.g. through
/// [LiveReducers] inside a continuation, is passed on as it is rather
/// than wrapped a second time.
fn reducer_error(error: anyhow::Error) -> StoreError {
    error
        .downcast::<StoreError>()
        .unwrap_or_else(StoreError::Reducer)
}

/// A reducer bound to its [Store](crate::Store). Invoking it resolves
/// the reducer's definition and merges the result into that store.
#[derive(Clone)]
pub struct BoundReducer {
    name: String,
    store: Rc<StoreInner>,
}

impl BoundReducer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke<V: Into<Value>>(&self, payload: V) -> Result<Outcome, StoreError> {
        resolve(&self.store, &self.name, payload.into())
    }

    /// Invoke with [Value::Null] as the payload.
    pub fn invoke_empty(&self) -> Result<Outcome, StoreError> {
        self.invoke(Value::Null)
    }
}

impl Debug for BoundReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoundReducer({})", self.name)
    }
}

/// All reducers of a [Store](crate::Store), by name.
#[derive(Clone)]
pub struct BoundReducers {
    store: Rc<StoreInner>,
}

impl BoundReducers {
    pub(crate) fn new(store: Rc<StoreInner>) -> Self {
        Self { store }
    }

    pub fn get(&self, name: &str) -> Option<BoundReducer> {
        if self.store.has_reducer(name) {
            Some(BoundReducer {
                name: name.to_string(),
                store: self.store.clone(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.has_reducer(name)
    }

    /// Reducer names, in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.store.reducer_names()
    }

    pub fn iter(&self) -> impl Iterator<Item = BoundReducer> + '_ {
        self.store.reducer_names().into_iter().map(move |name| BoundReducer {
            name,
            store: self.store.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.store.reducer_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Debug for BoundReducers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// The reducers of a [Store](crate::Store) as handed to a
/// [Continuation::WithReducers]. Each call resolves against the store's
/// state at the time of the call, so it can be moved into scheduled
/// work and used after the reducer which received it has returned.
///
/// Only holds a weak reference to the store; calls made after the store
/// was dropped fail with [StoreError::StoreDropped].
#[derive(Clone)]
pub struct LiveReducers {
    store: Weak<StoreInner>,
}

impl LiveReducers {
    pub(crate) fn new(store: &Rc<StoreInner>) -> Self {
        Self {
            store: Rc::downgrade(store),
        }
    }

    fn upgrade(&self) -> Result<Rc<StoreInner>, StoreError> {
        self.store.upgrade().ok_or(StoreError::StoreDropped)
    }

    /// Invoke the reducer `name` with `payload`.
    pub fn call<V: Into<Value>>(&self, name: &str, payload: V) -> Result<Outcome, StoreError> {
        resolve(&self.upgrade()?, name, payload.into())
    }

    /// Invoke the reducer `name` with the payload `payload` computes
    /// from the current state.
    pub fn call_with<F>(&self, name: &str, payload: F) -> Result<Outcome, StoreError>
    where
        F: FnOnce(&State) -> Value,
    {
        let store = self.upgrade()?;
        let state = store.state_cell().get();
        let payload = payload(&*state);
        resolve(&store, name, payload)
    }

    /// A handle to the single reducer `name`.
    pub fn get(&self, name: &str) -> Result<LiveReducer, StoreError> {
        if self.upgrade()?.has_reducer(name) {
            Ok(LiveReducer {
                name: name.to_string(),
                reducers: self.clone(),
            })
        } else {
            Err(StoreError::UnknownReducer {
                name: name.to_string(),
            })
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self.store.upgrade() {
            Some(store) => store.reducer_names(),
            None => Vec::new(),
        }
    }
}

impl Debug for LiveReducers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// One member of [LiveReducers].
#[derive(Clone)]
pub struct LiveReducer {
    name: String,
    reducers: LiveReducers,
}

impl LiveReducer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call<V: Into<Value>>(&self, payload: V) -> Result<Outcome, StoreError> {
        self.reducers.call(&self.name, payload)
    }

    pub fn call_with<F>(&self, payload: F) -> Result<Outcome, StoreError>
    where
        F: FnOnce(&State) -> Value,
    {
        self.reducers.call_with(&self.name, payload)
    }
}

impl Debug for LiveReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LiveReducer({})", self.name)
    }
}
