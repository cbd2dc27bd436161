//! Statement batch splitter.
//!
//! DDL scripts are split on `;` and applied as one batch. The split is purely
//! textual: a `;` inside a string literal or comment also ends a statement.

use std::fs;
use std::path::Path;

use crate::error::BindResult;

const DELIMITER: char = ';';

/// Split `script` into trimmed statements, dropping blank ones.
pub fn split_script(script: &str) -> Vec<String> {
    script
        .split(DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a script file and split it.
pub fn read_script(path: impl AsRef<Path>) -> BindResult<Vec<String>> {
    let script = fs::read_to_string(path)?;
    Ok(split_script(&script))
}
