use crate::{LiveReducers, Patch, State};
use serde_json::Value;
use std::fmt::{self, Debug};

/// The maximum number of stages a reducer invocation is resolved
/// through, see [Stage].
pub const MAX_STAGES: usize = 3;

/// A named reducer's definition. Using the
/// [reduce()](Reducer::reduce()) method, implementors of this trait
/// take the payload a reducer was called with and describe how the
/// [Store](crate::Store)'s state should change as a [Resolution].
///
/// Implemented for every `Fn(Value) -> anyhow::Result<Resolution>`, so
/// closures can be registered directly with
/// [StoreConfig::reducer()](crate::StoreConfig::reducer()).
pub trait Reducer {
    /// Take the payload and produce the first stage's [Resolution].
    /// Calling a reducer without a payload passes [Value::Null].
    ///
    /// An error aborts the invocation; nothing is merged and the error
    /// is returned to the caller as
    /// [StoreError::Reducer](crate::StoreError::Reducer).
    fn reduce(&self, payload: Value) -> anyhow::Result<Resolution>;
}

impl<F> Reducer for F
where
    F: Fn(Value) -> anyhow::Result<Resolution>,
{
    fn reduce(&self, payload: Value) -> anyhow::Result<Resolution> {
        (self)(payload)
    }
}

/// What a reducer (or one of its continuations) wants to happen to the
/// state at the end of a stage.
pub enum Resolution {
    /// Merge this patch into the state and notify listeners. Resolution
    /// stops here.
    Patch(Patch),
    /// Leave the state as it is. Resolution stops here.
    Nothing,
    /// Resolve a further stage.
    Continue(Continuation),
}

/// The function a [Resolution::Continue] resolves next; its variant
/// decides what it is called with.
pub enum Continuation {
    /// Called with the state as it is when the stage runs.
    WithState(Box<dyn FnOnce(&State) -> anyhow::Result<Resolution>>),
    /// Called with a freshly made [LiveReducers] for the store. Work
    /// scheduled from here which calls back into those reducers is
    /// resolved against the state at the time of that call.
    WithReducers(Box<dyn FnOnce(&LiveReducers) -> anyhow::Result<Resolution>>),
}

impl Resolution {
    pub fn patch(patch: Patch) -> Self {
        Resolution::Patch(patch)
    }

    /// A patch setting a single property.
    pub fn set<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        let mut patch = Patch::new();
        patch.insert(key.into(), value.into());
        Resolution::Patch(patch)
    }

    pub fn with_state<F>(continuation: F) -> Self
    where
        F: FnOnce(&State) -> anyhow::Result<Resolution> + 'static,
    {
        Resolution::Continue(Continuation::WithState(Box::new(continuation)))
    }

    pub fn with_reducers<F>(continuation: F) -> Self
    where
        F: FnOnce(&LiveReducers) -> anyhow::Result<Resolution> + 'static,
    {
        Resolution::Continue(Continuation::WithReducers(Box::new(continuation)))
    }
}

impl From<Patch> for Resolution {
    fn from(patch: Patch) -> Self {
        Resolution::Patch(patch)
    }
}

impl From<()> for Resolution {
    fn from(_: ()) -> Self {
        Resolution::Nothing
    }
}

impl Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            Resolution::Nothing => write!(f, "Nothing"),
            Resolution::Continue(Continuation::WithState(_)) => write!(f, "Continue(WithState)"),
            Resolution::Continue(Continuation::WithReducers(_)) => {
                write!(f, "Continue(WithReducers)")
            }
        }
    }
}

/// A stage of a reducer invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// The reducer definition, called with the payload.
    Payload,
    /// The first continuation.
    State,
    /// The second continuation. A continuation returned from here is
    /// not resolved.
    Reducers,
}

impl Stage {
    pub const ALL: [Stage; MAX_STAGES] = [Stage::Payload, Stage::State, Stage::Reducers];

    /// The stage after this one, `None` once [MAX_STAGES] is reached.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Payload => Some(Stage::State),
            Stage::State => Some(Stage::Reducers),
            Stage::Reducers => None,
        }
    }

    /// 1-based position of this stage.
    pub fn number(self) -> usize {
        self as usize + 1
    }
}

/// How a reducer invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A patch was merged at `stage` and listeners were notified.
    Merged { stage: Stage },
    /// The state was left unchanged. Work scheduled by the reducer may
    /// still update it later.
    NoOp { stage: Stage },
}

impl Outcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, Outcome::Merged { .. })
    }

    pub fn stage(&self) -> Stage {
        match self {
            Outcome::Merged { stage } | Outcome::NoOp { stage } => *stage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Reducer, Resolution, Stage, MAX_STAGES};
    use serde_json::{json, Value};

    #[test]
    fn stages_are_bounded() {
        assert_eq!(MAX_STAGES, Stage::ALL.len());
        assert_eq!(Some(Stage::State), Stage::Payload.next());
        assert_eq!(Some(Stage::Reducers), Stage::State.next());
        assert_eq!(None, Stage::Reducers.next());
        assert_eq!(MAX_STAGES, Stage::Reducers.number());
    }

    #[test]
    fn closure_reducer() {
        let set_counter_to = |payload: Value| -> anyhow::Result<Resolution> {
            Ok(Resolution::set("counter", payload["counter"].clone()))
        };

        match set_counter_to.reduce(json!({"counter": 5})).unwrap() {
            Resolution::Patch(patch) => assert_eq!(Some(&json!(5)), patch.get("counter")),
            other => panic!("unexpected resolution: {:?}", other),
        }
    }
}
