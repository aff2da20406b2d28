//! A minimal application state container.
//!
//! A [Store] holds a [State] which can only be changed by its named
//! reducers. A reducer returns a [Resolution]: either a [Patch] which is
//! shallowly merged into the state, nothing, or a continuation. The
//! first continuation is called with the current state, the second with
//! the store's [LiveReducers], which can be moved into work scheduled
//! with a [Scheduler] to update the state again later, based on the state
//! at that time.
//!
//! ```
//! use reless::{Resolution, Store, StoreConfig};
//! use serde_json::{json, Value};
//!
//! let mut state = reless::State::new();
//! state.insert("counter".to_string(), json!(0));
//!
//! let store = Store::new(
//!     &StoreConfig::new()
//!         .state(state)
//!         .reducer("increment", |_| {
//!             Ok(Resolution::with_state(|state| {
//!                 let counter = state["counter"].as_i64().unwrap_or(0);
//!                 Ok(Resolution::set("counter", counter + 1))
//!             }))
//!         }),
//! );
//!
//! store.invoke("increment", Value::Null)?;
//! assert_eq!(json!(1), store.state()["counter"]);
//! # Ok::<(), reless::StoreError>(())
//! ```

mod binder;
mod config;
mod error;
mod event;
mod listener;
pub mod logger;
mod reducer;
pub mod scheduler;
mod state;
mod store;

pub use binder::{BoundReducer, BoundReducers, LiveReducer, LiveReducers};
pub use config::StoreConfig;
pub use error::{StateMutationError, StoreError};
pub use event::Event;
pub use listener::*;
pub use reducer::*;
pub use scheduler::{ManualScheduler, Scheduler, TaskHandle};
pub use state::{Patch, State, StateCell, StateView};
pub use store::Store;
