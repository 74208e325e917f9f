//! What the tools print on stdout.

use std::io::{self, Write};

use serde_json::Value;

use crate::error::FlowError;

/// Printed after the lookup body when the gateway answers HTTP 400.
pub const INVALID_NUMBER_MESSAGE: &str = "Invalid telephone number provided";

/// Strings print bare, anything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One TURN server descriptor per line, in the gateway's order.
pub fn write_turn_servers(out: &mut impl Write, servers: &[Value]) -> io::Result<()> {
    for server in servers {
        writeln!(out, "{}", render(server))?;
    }
    Ok(())
}

pub fn write_media_configuration(out: &mut impl Write, config: &Value) -> io::Result<()> {
    writeln!(out, "{}", render(config))
}

/// Operator-facing output for a failed run. Transport errors and a rejected
/// login print nothing here; they only reach the log.
pub fn write_failure(out: &mut impl Write, err: &FlowError) -> io::Result<()> {
    match err {
        FlowError::MissingField { response, .. } => writeln!(out, "{response}"),
        FlowError::InvalidNumber { body } => {
            writeln!(out, "{body}")?;
            writeln!(out, "{INVALID_NUMBER_MESSAGE}")
        },
        _ => Ok(()),
    }
}
