use crate::{Callback, Event, Reducer, Resolution, State, StoreError};
use serde::Serialize;
use serde_json::Value;
use std::{collections::BTreeMap, fmt::Debug, rc::Rc};

/// Describes a [Store](crate::Store): its initial state, its named
/// reducers and the listeners for its events.
///
/// A configuration can be used to create any number of stores, each of
/// them starting from its own copy of the initial state. Reducers and
/// callbacks are shared between those stores.
#[derive(Clone, Default)]
pub struct StoreConfig {
    pub(crate) state: State,
    pub(crate) reducers: BTreeMap<String, Rc<dyn Reducer>>,
    pub(crate) events: Vec<(Event, Callback)>,
}

impl StoreConfig {
    /// An empty state, with no reducers and no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial state.
    pub fn state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    /// Set the initial state from anything which serializes to an
    /// object.
    pub fn state_from<T: Serialize + ?Sized>(self, state: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(state)? {
            Value::Object(state) => Ok(self.state(state)),
            _ => Err(StoreError::StateNotAnObject),
        }
    }

    /// Register the reducer `name`, replacing any previous reducer
    /// with that name.
    pub fn reducer<N, F>(self, name: N, reducer: F) -> Self
    where
        N: Into<String>,
        F: Fn(Value) -> anyhow::Result<Resolution> + 'static,
    {
        self.add_reducer(name, reducer)
    }

    /// Like [reducer()](StoreConfig::reducer()), for any [Reducer]
    /// implementation.
    pub fn add_reducer<N: Into<String>, R: Reducer + 'static>(mut self, name: N, reducer: R) -> Self {
        self.reducers.insert(name.into(), Rc::new(reducer));
        self
    }

    /// Call `callback` whenever `event` occurs. Stores created from this
    /// configuration keep the callback alive.
    pub fn on<C: Into<Callback>>(mut self, event: Event, callback: C) -> Self {
        self.events.push((event, callback.into()));
        self
    }

    /// Like [on()](StoreConfig::on()), with the event given by its name
    /// (`"newState"`).
    pub fn on_named<C: Into<Callback>>(self, event: &str, callback: C) -> Result<Self, StoreError> {
        let event = event.parse()?;
        Ok(self.on(event, callback))
    }
}

impl Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("state", &self.state)
            .field("reducers", &self.reducers.keys().collect::<Vec<_>>())
            .field(
                "events",
                &self.events.iter().map(|(event, _)| event).collect::<Vec<_>>(),
            )
            .finish()
    }
}
