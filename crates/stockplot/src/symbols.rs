use std::path::Path;

use anyhow::Context;

/// Read the ticker list: one symbol per line, uppercased, with surrounding
/// whitespace stripped and blank lines dropped.
pub fn read_symbols(path: &Path) -> anyhow::Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read symbol list {}", path.display()))?;

    Ok(raw
        .lines()
        .map(|line| line.trim().to_uppercase())
        .filter(|line| !line.is_empty())
        .collect())
}
