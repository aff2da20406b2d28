use crate::StateMutationError;
use serde_json::{Map, Value};
use std::{cell::RefCell, fmt::Debug, ops::Deref, rc::Rc};

/// The state held by a [Store](crate::Store): a mapping from property
/// name to an arbitrary value.
pub type State = Map<String, Value>;

/// A set of properties to be shallowly merged into a [State].
pub type Patch = Map<String, Value>;

/// Holds the current [State] of one [Store](crate::Store).
///
/// Top-level properties can only be changed through
/// [merge()](StateCell::merge()); readers receive `Rc` snapshots which
/// are never modified after they have been handed out. Properties
/// nested inside an object are deliberately left unprotected, see
/// [update_nested()](StateCell::update_nested()).
pub struct StateCell {
    value: RefCell<Rc<State>>,
}

impl StateCell {
    /// Create a new cell holding a deep copy of `initial`, so that
    /// neither later changes to `initial` nor other cells created from
    /// it are observable here.
    pub fn new(initial: &State) -> Self {
        Self {
            value: RefCell::new(Rc::new(initial.clone())),
        }
    }

    /// A snapshot of the current state. It does not follow subsequent
    /// updates; call this again to observe them.
    pub fn get(&self) -> Rc<State> {
        self.value.borrow().clone()
    }

    /// Shallowly overwrite the top-level properties named in `patch`,
    /// creating those which don't exist yet. Properties missing from
    /// `patch` are left untouched.
    ///
    /// Snapshots taken before the merge keep their old contents.
    pub fn merge(&self, patch: &Patch) {
        let mut value = self.value.borrow_mut();
        let state = Rc::make_mut(&mut *value);
        for (key, property) in patch {
            state.insert(key.clone(), property.clone());
        }
    }

    /// Direct assignment of a top-level property. Always rejected, the
    /// state is left unchanged.
    pub fn assign<K: Into<String>>(&self, key: K, _value: Value) -> Result<(), StateMutationError> {
        Err(StateMutationError::TopLevelAssignment { key: key.into() })
    }

    /// Modify the object stored under the top-level property `key` in
    /// place. This bypasses reducers and does not notify any listeners.
    ///
    /// Fails with [StateMutationError::NotNested] if `key` is missing
    /// or doesn't hold an object; replacing a top-level value requires
    /// a reducer.
    ///
    /// `update` works on a copy which replaces the state once it returns,
    /// so reads of the state from inside `update` see it unchanged.
    pub fn update_nested<F>(&self, key: &str, update: F) -> Result<(), StateMutationError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        // `update` may read the store, so it runs on a copy while the
        // cell is not borrowed.
        let mut state = (*self.get()).clone();
        match state.get_mut(key) {
            Some(Value::Object(nested)) => update(nested),
            _ => {
                return Err(StateMutationError::NotNested {
                    key: key.to_string(),
                })
            }
        }

        *self.value.borrow_mut() = Rc::new(state);
        Ok(())
    }
}

impl Debug for StateCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StateCell").field(&*self.get()).finish()
    }
}

/// Read access to the [State] of a [Store](crate::Store), returned by
/// [Store::state()](crate::Store::state()).
///
/// Dereferences to the snapshot taken when the view was created.
/// Writes go through the guarded setters, which forward to the
/// store's [StateCell].
pub struct StateView {
    cell: Rc<StateCell>,
    snapshot: Rc<State>,
}

impl StateView {
    pub(crate) fn new(cell: Rc<StateCell>) -> Self {
        let snapshot = cell.get();
        Self { cell, snapshot }
    }

    /// See [StateCell::assign()].
    pub fn assign<K: Into<String>>(&self, key: K, value: Value) -> Result<(), StateMutationError> {
        self.cell.assign(key, value)
    }

    /// See [StateCell::update_nested()]. The change is visible to
    /// views created afterwards, not to this one.
    pub fn update_nested<F>(&self, key: &str, update: F) -> Result<(), StateMutationError>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        self.cell.update_nested(key, update)
    }

    /// The snapshot this view reads from.
    pub fn snapshot(&self) -> Rc<State> {
        self.snapshot.clone()
    }
}

impl Deref for StateView {
    type Target = State;

    fn deref(&self) -> &Self::Target {
        &self.snapshot
    }
}

impl Debug for StateView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StateView").field(&*self.snapshot).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{State, StateCell};
    use crate::StateMutationError;
    use serde_json::json;

    fn state(value: serde_json::Value) -> State {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn merge_overwrites_and_creates() {
        let cell = StateCell::new(&state(json!({"counter": 0, "name": "a"})));
        cell.merge(&state(json!({"counter": 10, "newProp": 1})));

        assert_eq!(
            state(json!({"counter": 10, "name": "a", "newProp": 1})),
            *cell.get()
        );
    }

    #[test]
    fn snapshots_are_not_changed_by_merge() {
        let cell = StateCell::new(&state(json!({"counter": 0})));
        let before = cell.get();
        cell.merge(&state(json!({"counter": 1})));

        assert_eq!(json!(0), before["counter"]);
        assert_eq!(json!(1), cell.get()["counter"]);
    }

    #[test]
    fn cells_are_isolated() {
        let mut initial = state(json!({"counter": 0, "nest": {"prop": 1}}));
        let first = StateCell::new(&initial);
        let second = StateCell::new(&initial);

        first.merge(&state(json!({"counter": 10})));
        first
            .update_nested("nest", |nest| {
                nest.insert("prop".to_string(), json!(2));
            })
            .unwrap();
        initial.insert("counter".to_string(), json!(99));

        assert_eq!(state(json!({"counter": 0, "nest": {"prop": 1}})), *second.get());
    }

    #[test]
    fn top_level_assignment_is_rejected() {
        let cell = StateCell::new(&state(json!({"count": 3})));

        assert_eq!(
            Err(StateMutationError::TopLevelAssignment {
                key: "count".to_string()
            }),
            cell.assign("count", json!(1))
        );
        assert_eq!(json!(3), cell.get()["count"]);
    }

    #[test]
    fn nested_update_requires_an_object() {
        let cell = StateCell::new(&state(json!({"count": 3, "nest": {"prop": 1}})));

        assert_eq!(
            Err(StateMutationError::NotNested {
                key: "count".to_string()
            }),
            cell.update_nested("count", |_| {})
        );
        assert_eq!(
            Err(StateMutationError::NotNested {
                key: "missing".to_string()
            }),
            cell.update_nested("missing", |_| {})
        );

        cell.update_nested("nest", |nest| {
            nest.insert("prop".to_string(), json!(2));
        })
        .unwrap();
        assert_eq!(json!(2), cell.get()["nest"]["prop"]);
    }
}
