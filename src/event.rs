use crate::StoreError;
use std::{fmt, str::FromStr};

/// An `Event` produced by a [Store](crate::Store), which
/// [Callback](crate::Callback)s can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Raised once for every patch merged into the state. Listeners
    /// receive the patch, not the whole state.
    NewState,
}

impl Event {
    /// The name this event is registered under in a configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Event::NewState => "newState",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Event {
    type Err = StoreError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "newState" => Ok(Event::NewState),
            _ => Err(StoreError::UnknownEvent {
                name: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Event;
    use crate::StoreError;

    #[test]
    fn parse_event_name() {
        assert_eq!(Event::NewState, "newState".parse::<Event>().unwrap());
        assert_eq!("newState", Event::NewState.to_string());

        match "stateChanged".parse::<Event>() {
            Err(StoreError::UnknownEvent { name }) => assert_eq!("stateChanged", name),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
