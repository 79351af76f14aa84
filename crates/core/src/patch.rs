//! Partial update helper.
//!
//! Update requests carry `Option` fields: `Some` overwrites the stored value,
//! `None` (absent or JSON `null`) leaves it untouched.

/// Overwrite `slot` with `value` when present. Returns whether a write happened.
pub fn overwrite<T>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}
