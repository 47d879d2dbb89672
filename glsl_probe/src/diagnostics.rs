//! User facing progress and failure reporting.
//!
//! Everything the probe wants a person to read goes through a
//! [`DiagnosticsSink`]. The command line binary prints to the terminal;
//! tests capture the messages instead.

use std::cell::RefCell;
use std::io::Write;

pub use log::Level;

pub trait DiagnosticsSink {
    fn report(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.report(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.report(Level::Error, message);
    }
}

/// Prints informational messages to stdout and warnings or errors to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl DiagnosticsSink for ConsoleSink {
    fn report(&self, level: Level, message: &str) {
        // A closed pipe is not worth aborting the probe over.
        let _ = match level {
            Level::Error | Level::Warn => writeln!(std::io::stderr().lock(), "{message}"),
            Level::Info | Level::Debug | Level::Trace => {
                writeln!(std::io::stdout().lock(), "{message}")
            }
        };
    }
}

/// Keeps every reported message in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: RefCell<Vec<(Level, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .borrow()
            .iter()
            .any(|(l, message)| *l == level && message.contains(needle))
    }
}

impl DiagnosticsSink for RecordingSink {
    fn report(&self, level: Level, message: &str) {
        log::log!(level, "{message}");
        self.records.borrow_mut().push((level, message.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_order_and_level() {
        let sink = RecordingSink::new();
        sink.info("loading program 'a.vert'...");
        sink.error("Failed to compile shader");

        assert_eq!(
            sink.records(),
            vec![
                (Level::Info, "loading program 'a.vert'...".to_owned()),
                (Level::Error, "Failed to compile shader".to_owned()),
            ]
        );
        assert!(sink.contains(Level::Error, "compile"));
        assert!(!sink.contains(Level::Info, "compile"));
    }

    #[test]
    fn sink_is_usable_as_trait_object() {
        let sink = RecordingSink::new();
        let dynamic: &dyn DiagnosticsSink = &sink;
        dynamic.warn("Shader compile log:\nwarning");

        assert_eq!(sink.messages(), vec!["Shader compile log:\nwarning"]);
    }
}
