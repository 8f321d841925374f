//! # Bounded JSON Decoding
//!
//! serde_json recurses once per nesting level, and so do the derived
//! `Deserialize`, `Drop` and `Clone` impls of the design tree. Bodies are
//! measured with a flat scan first and refused when they nest deeper than a
//! tree of `MAX_TREE_DEPTH` can need, so nothing recursive ever sees them.

use serde::de::DeserializeOwned;
use stylesync_common::MAX_TREE_DEPTH;
use thiserror::Error;

/// Two JSON levels per tree level (node object and its `children` array),
/// plus room for the envelope and nested node properties
pub const MAX_JSON_NESTING: usize = 2 * MAX_TREE_DEPTH + 16;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON nests {depth} levels deep, the limit is {limit}")]
    TooDeep { depth: usize, limit: usize },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Deepest array/object nesting in `bytes`. Brackets inside strings are
/// ignored; malformed input yields a number, never an error.
pub fn nesting_depth(bytes: &[u8]) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0;
    let mut in_string = false;
    let mut escaped = false;

    for &byte in bytes {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest
}

/// `serde_json::from_slice` with the nesting check in front. The built-in
/// recursion limit (128) is lifted because the scan already bounds depth.
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    let depth = nesting_depth(bytes);
    if depth > MAX_JSON_NESTING {
        return Err(DecodeError::TooDeep {
            depth,
            limit: MAX_JSON_NESTING,
        });
    }

    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    deserializer.disable_recursion_limit();

    let value = T::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}
