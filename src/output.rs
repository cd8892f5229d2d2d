//! Human vs JSON output for command results

use serde::Serialize;

use crate::response::Response;
use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

/// Print a response and report whether it succeeded.
///
/// JSON mode prints the whole envelope to stdout. Human mode hands a
/// successful payload to `render` and prints failures to stderr.
pub fn emit<T: Serialize>(
    mode: OutputMode,
    response: &Response<T>,
    render: impl FnOnce(&T),
) -> serde_json::Result<bool> {
    match mode {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(response)?),
        OutputMode::Human => match (&response.payload, response.is_success()) {
            (Some(payload), true) => render(payload),
            _ => ui::error(&format!("{} ({})", response.message, response.status)),
        },
    }
    Ok(response.is_success())
}
