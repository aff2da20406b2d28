use crate::Patch;
use std::rc::{Rc, Weak};

/// A trait to take a [Callback] or other custom callback type and
/// produce a [Listener], a weak reference to that callback.
pub trait AsListener {
    /// Produce a [Listener], a weak reference to this callback.
    fn as_listener(&self) -> Listener;
}

/// A weak reference to a callback function (usually [Callback]) which
/// is notified of the patches merged into a [Store](crate::Store).
#[derive(Clone)]
pub struct Listener(Weak<dyn Fn(&Patch)>);

impl Listener {
    /// Attempt to upgrade the weak reference in this listener to a
    /// [Callback], otherwise if unable to, returns `None`.
    pub fn as_callback(&self) -> Option<Callback> {
        self.0.upgrade().map(Callback)
    }
}

impl AsListener for Listener {
    fn as_listener(&self) -> Listener {
        Listener(self.0.clone())
    }
}

/// A wrapper for a callback which is notified of the patches merged
/// into a [Store](crate::Store).
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Patch)>);

impl AsListener for &Callback {
    fn as_listener(&self) -> Listener {
        Listener(Rc::downgrade(&self.0))
    }
}

impl Callback {
    pub fn new<C: Fn(&Patch) + 'static>(closure: C) -> Self {
        Callback(Rc::new(closure))
    }

    pub fn emit(&self, patch: &Patch) {
        (self.0)(patch)
    }
}

impl<C> From<C> for Callback
where
    C: Fn(&Patch) + 'static,
{
    fn from(closure: C) -> Self {
        Callback(Rc::new(closure))
    }
}

#[cfg(test)]
mod tests {
    use super::{AsListener, Callback};
    use crate::Patch;
    use std::{cell::Cell, rc::Rc};

    #[test]
    fn listener_expires_with_callback() {
        let calls = Rc::new(Cell::new(0));
        let calls_copy = calls.clone();
        let callback = Callback::new(move |_: &Patch| calls_copy.set(calls_copy.get() + 1));

        let listener = (&callback).as_listener();
        listener
            .as_callback()
            .expect("callback is still alive")
            .emit(&Patch::new());
        assert_eq!(1, calls.get());

        drop(callback);
        assert!(listener.as_callback().is_none());
    }
}
