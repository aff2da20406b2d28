use crate::{
    binder::{self, BoundReducers},
    AsListener, Callback, Event, Listener, Outcome, Patch, Reducer, StateCell, StateView,
    StoreConfig, StoreError,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{cell::RefCell, collections::BTreeMap, fmt::Debug, rc::Rc};

/// A [Listener] associated with (listening to) a given `Event`
/// produced by the [Store].
struct ListenerEventPair {
    pub listener: Listener,
    pub event: Event,
}

/// The parts of a [Store] shared with its [BoundReducers] and
/// [LiveReducers](crate::LiveReducers).
pub(crate) struct StoreInner {
    /// The current state of this store.
    state: Rc<StateCell>,
    reducers: BTreeMap<String, Rc<dyn Reducer>>,
    /// The listeners which are notified of the patches merged into
    /// the state of this store.
    listeners: RefCell<Vec<ListenerEventPair>>,
    /// Callbacks supplied with the [StoreConfig], which are kept alive
    /// for as long as the store.
    _callbacks: Vec<Callback>,
}

impl StoreInner {
    pub(crate) fn state_cell(&self) -> &Rc<StateCell> {
        &self.state
    }

    pub(crate) fn reducer(&self, name: &str) -> Result<Rc<dyn Reducer>, StoreError> {
        self.reducers
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownReducer {
                name: name.to_string(),
            })
    }

    pub(crate) fn has_reducer(&self, name: &str) -> bool {
        self.reducers.contains_key(name)
    }

    pub(crate) fn reducer_names(&self) -> Vec<String> {
        self.reducers.keys().cloned().collect()
    }

    pub(crate) fn reducer_count(&self) -> usize {
        self.reducers.len()
    }

    /// Merge a patch produced by the reducer `reducer` and notify the
    /// listeners.
    pub(crate) fn merge(&self, reducer: &str, patch: &Patch) {
        self.state.merge(patch);
        log::debug!("reducer `{}` merged {:?}", reducer, patch);
        self.notify_listeners(Event::NewState, patch);
    }

    /// Notify the listeners of `event`, dropping listeners whose
    /// callback no longer exists. The listeners are collected before
    /// any of them runs, so they are free to use the store.
    fn notify_listeners(&self, event: Event, patch: &Patch) {
        let callbacks: Vec<Callback> = {
            let mut listeners = self.listeners.borrow_mut();
            listeners.retain(|pair| pair.listener.as_callback().is_some());
            listeners
                .iter()
                .filter(|pair| pair.event == event)
                .filter_map(|pair| pair.listener.as_callback())
                .collect()
        };

        for callback in callbacks {
            callback.emit(patch);
        }
    }
}

/// An application state container.
///
/// The current state of this store ([Store::state()]) can only be
/// modified by invoking one of its named reducers, either through
/// [Store::invoke()] or [Store::reducers()]. Each reducer describes a
/// change as a [Resolution](crate::Resolution) which is resolved in up
/// to three [Stage](crate::Stage)s; the patch it ends with is shallowly
/// merged into the state, and the listeners of [Event::NewState] are
/// called with that patch.
///
/// Every store owns its state. Stores created from the same
/// [StoreConfig] start from independent copies of its initial state.
/// Clones of a `Store` refer to the same store.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    /// Create a new [Store] from `config`.
    pub fn new(config: &StoreConfig) -> Self {
        let listeners = config
            .events
            .iter()
            .map(|(event, callback)| ListenerEventPair {
                listener: callback.as_listener(),
                event: *event,
            })
            .collect();

        Self {
            inner: Rc::new(StoreInner {
                state: Rc::new(StateCell::new(&config.state)),
                reducers: config.reducers.clone(),
                listeners: RefCell::new(listeners),
                _callbacks: config
                    .events
                    .iter()
                    .map(|(_, callback)| callback.clone())
                    .collect(),
            }),
        }
    }

    /// Get the current state stored in this store.
    ///
    /// The returned view does not follow later updates, call this again
    /// to observe them. Top-level properties can't be assigned through
    /// it, see [StateView].
    pub fn state(&self) -> StateView {
        StateView::new(self.inner.state.clone())
    }

    /// Deserialize the current state into `T`.
    pub fn state_as<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let state = self.inner.state.get();
        Ok(serde_json::from_value(Value::Object((*state).clone()))?)
    }

    /// The reducers of this store, bound to it.
    pub fn reducers(&self) -> BoundReducers {
        BoundReducers::new(self.inner.clone())
    }

    /// Invoke the reducer `name` with `payload`.
    pub fn invoke<V: Into<Value>>(&self, name: &str, payload: V) -> Result<Outcome, StoreError> {
        binder::resolve(&self.inner, name, payload.into())
    }

    /// Subscribe a [Listener] to `event`.
    ///
    /// The listener is a weak reference; when the strong reference
    /// associated with it (usually [Callback]) is dropped, the
    /// listener will be removed from this store upon the next
    /// notification.
    pub fn subscribe<L: AsListener>(&self, event: Event, listener: L) {
        self.inner.listeners.borrow_mut().push(ListenerEventPair {
            listener: listener.as_listener(),
            event,
        });
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new(&StoreConfig::default())
    }
}

impl From<StoreConfig> for Store {
    fn from(config: StoreConfig) -> Self {
        Store::new(&config)
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.inner.state.get())
            .field("reducers", &self.inner.reducer_names())
            .finish()
    }
}
