//! Logical id allocation from construct paths.
//!
//! A resource declared at `WebsiteBucket/Resource` inside a stack gets the
//! id `WebsiteBucket` followed by an 8-digit hash of the full path, so ids
//! stay stable across runs and unique across nesting levels.

use staticstack_common::constants::LOGICAL_ID_HASH_LENGTH;
use staticstack_common::error::{Result, StackError};
use staticstack_common::types::LogicalId;

/// Path component omitted from ids entirely.
const HIDDEN_ID: &str = "Default";

/// Path component omitted from the human-readable part only.
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

const MAX_HUMAN_LEN: usize = 240;
const MAX_ID_LEN: usize = 255;

/// Allocates the logical id for a construct path relative to its stack.
///
/// # Errors
///
/// Returns an error if the path is empty once hidden components are removed.
pub fn allocate(path: &[&str]) -> Result<LogicalId> {
    let components = visible(path);

    match components.as_slice() {
        [] => Err(StackError::Config {
            message: format!("cannot allocate a logical id for path {path:?}"),
        }),
        [single] => {
            let candidate = remove_non_alphanumeric(single);
            if candidate.len() <= MAX_ID_LEN {
                Ok(LogicalId::new(candidate))
            } else {
                Ok(hashed(&components, MAX_HUMAN_LEN))
            }
        }
        _ => Ok(hashed(&components, MAX_HUMAN_LEN)),
    }
}

/// Allocates a name of at most `max_len` characters for a construct path.
///
/// Names that fit are the same as [`allocate`] returns. Longer names keep
/// the path hash and shorten the human-readable part.
///
/// # Errors
///
/// Returns an error if the path is empty once hidden components are removed.
pub fn allocate_bounded(path: &[&str], max_len: usize) -> Result<LogicalId> {
    let id = allocate(path)?;
    if id.as_str().len() <= max_len {
        return Ok(id);
    }
    let human_len = max_len.saturating_sub(LOGICAL_ID_HASH_LENGTH);
    Ok(hashed(&visible(path), human_len))
}

fn visible<'a>(path: &[&'a str]) -> Vec<&'a str> {
    path.iter().copied().filter(|c| *c != HIDDEN_ID).collect()
}

fn hashed(components: &[&str], max_human_len: usize) -> LogicalId {
    let mut human: String = remove_dupes(components)
        .into_iter()
        .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        .map(remove_non_alphanumeric)
        .collect();
    human.truncate(max_human_len);
    LogicalId::new(format!("{human}{}", path_hash(components)))
}

fn path_hash(components: &[&str]) -> String {
    let digest = md5::compute(components.join("/"));
    let mut hex = format!("{digest:x}");
    hex.truncate(LOGICAL_ID_HASH_LENGTH);
    hex.to_ascii_uppercase()
}

/// Drops a component when the previous kept one already ends with it.
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut kept: Vec<&str> = Vec::with_capacity(components.len());
    for &component in components {
        if kept.last().is_none_or(|last| !last.ends_with(component)) {
            kept.push(component);
        }
    }
    kept
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}
