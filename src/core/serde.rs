/// Serde helper functions for custom serialization/deserialization

/// Skip serializing if a flag is unset
#[inline]
pub fn is_false(value: &bool) -> bool {
    !*value
}

/// Skip serializing if a counter is zero
#[inline]
pub fn is_zero_usize(value: &usize) -> bool {
    *value == 0
}
