//! Secret references in `config.toml`.
//!
//! A credential value may point somewhere else instead of holding the
//! secret itself:
//!
//! - `pass::path/in/store`: first line of `pass show path/in/store`
//! - `env::VAR_NAME`: the value of `$VAR_NAME`
//! - anything else is used as-is

use std::process::Command;

/// Resolves a value that may be a secret reference.
pub fn resolve(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix("pass::") {
        resolve_pass(path)
    } else if let Some(var) = value.strip_prefix("env::") {
        std::env::var(var).map_err(|_| format!("environment variable `{}` is not set", var))
    } else {
        Ok(value.to_string())
    }
}

/// Returns true if `value` is a reference rather than a literal.
pub fn is_reference(value: &str) -> bool {
    value.starts_with("pass::") || value.starts_with("env::")
}

fn resolve_pass(path: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .map_err(|e| format!("failed to run `pass show {}`: {}", path, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "`pass show {}` failed ({}): {}",
            path,
            output.status,
            stderr.trim()
        ));
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
        .filter(|line| !line.is_empty())
        .ok_or_else(|| format!("`pass show {}` produced no output", path))
}
