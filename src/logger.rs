//! A [Callback] which logs every patch merged into a
//! [Store](crate::Store), using the `log` facade.

use crate::{Callback, Patch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Warn,
    Info,
}

impl LogLevel {
    pub fn log<S: AsRef<str>>(&self, message: S) {
        match self {
            LogLevel::Trace => log::trace!("{}", message.as_ref()),
            LogLevel::Debug => log::debug!("{}", message.as_ref()),
            LogLevel::Warn => log::warn!("{}", message.as_ref()),
            LogLevel::Info => log::info!("{}", message.as_ref()),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

/// Logs the patches it receives. Register it for
/// [Event::NewState](crate::Event::NewState):
///
/// ```
/// use reless::{logger::PatchLogger, Event, StoreConfig};
///
/// let config = StoreConfig::new().on(Event::NewState, PatchLogger::new());
/// ```
#[derive(Debug, Default)]
pub struct PatchLogger {
    log_level: LogLevel,
    target: Option<String>,
}

impl PatchLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Prefix each message with `target`, to tell several stores apart.
    pub fn target<S: Into<String>>(mut self, target: S) -> Self {
        self.target = Some(target.into());
        self
    }

    fn format(&self, patch: &Patch) -> String {
        let patch = serde_json::to_string(patch).unwrap_or_else(|_| format!("{:?}", patch));
        match &self.target {
            Some(target) => format!("{}: new state: {}", target, patch),
            None => format!("new state: {}", patch),
        }
    }
}

impl From<PatchLogger> for Callback {
    fn from(logger: PatchLogger) -> Self {
        Callback::new(move |patch: &Patch| logger.log_level.log(logger.format(patch)))
    }
}

#[cfg(test)]
mod tests {
    use super::{LogLevel, PatchLogger};
    use crate::Patch;
    use serde_json::json;

    #[test]
    fn format_patch() {
        let mut patch = Patch::new();
        patch.insert("counter".to_string(), json!(1));

        assert_eq!(
            "new state: {\"counter\":1}",
            PatchLogger::new().format(&patch)
        );
        assert_eq!(
            "main: new state: {\"counter\":1}",
            PatchLogger::new()
                .log_level(LogLevel::Info)
                .target("main")
                .format(&patch)
        );
    }
}
