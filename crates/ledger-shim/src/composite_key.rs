//! Composite keys
//!
//! A composite key is `U+0000 objectType U+0000 (attribute U+0000)*`.
//! Neither the object type nor any attribute may contain U+0000 or
//! U+10FFFF, which keeps the encoding injective and lets range scans
//! use U+10FFFF as an upper bound.

use crate::error::{StubError, StubResult};

pub const MIN_UNICODE_RUNE: char = '\u{0}';
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';
pub const COMPOSITE_KEY_NAMESPACE: &str = "\u{0}";

/// Build a composite key from an object type and ordered attributes.
pub fn create_composite_key(object_type: &str, attributes: &[&str]) -> StubResult<String> {
    validate_composite_key_attribute(object_type)?;

    let capacity = 2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>();
    let mut key = String::with_capacity(capacity);
    key.push_str(COMPOSITE_KEY_NAMESPACE);
    key.push_str(object_type);
    key.push(MIN_UNICODE_RUNE);

    for attribute in attributes {
        validate_composite_key_attribute(attribute)?;
        key.push_str(attribute);
        key.push(MIN_UNICODE_RUNE);
    }

    Ok(key)
}

fn validate_composite_key_attribute(attribute: &str) -> StubResult<()> {
    if attribute.contains(MIN_UNICODE_RUNE) {
        return Err(StubError::InvalidCompositeKey {
            attribute: attribute.to_string(),
            reason: "contains U+0000",
        });
    }
    if attribute.contains(MAX_UNICODE_RUNE) {
        return Err(StubError::InvalidCompositeKey {
            attribute: attribute.to_string(),
            reason: "contains U+10FFFF",
        });
    }
    Ok(())
}
