//! JSON output on stdout, one document per line

use std::io::{self, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

pub fn write_json(value: &Value) -> CliResult<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer(&mut out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&data)
}

pub fn write_error(err: &CliError) -> CliResult<()> {
    write_json(&error_json(err))
}

pub fn error_json(err: &CliError) -> Value {
    json!({
        "error": {
            "code": err.code(),
            "message": err.to_string(),
        }
    })
}
