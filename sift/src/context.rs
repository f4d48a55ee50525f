//! Per-call result context and the dry-run contract

use serde::Serialize;
use serde_json::Value;

/// Per-call context handed to every facade entry point.
///
/// When `debug` is set, the entry point serializes the request body it built
/// into [`ResultContext::captured`] and returns without contacting the engine.
#[derive(Debug, Clone, Default)]
pub struct ResultContext {
    debug: bool,
    captured: Option<Value>,
}

impl ResultContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context in dry-run mode
    pub fn debug() -> Self {
        Self {
            debug: true,
            captured: None,
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// The request body captured by a dry run, if any
    pub fn captured(&self) -> Option<&Value> {
        self.captured.as_ref()
    }

    pub fn into_captured(self) -> Option<Value> {
        self.captured
    }

    /// Store the request body. Later captures within the same call are ignored.
    pub(crate) fn capture<T: Serialize>(&mut self, body: &T) -> crate::Result<()> {
        if self.captured.is_none() {
            self.captured = Some(serde_json::to_value(body)?);
        }
        Ok(())
    }
}
