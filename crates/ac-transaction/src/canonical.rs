use serde::Serialize;

/// Serialise `value` to canonical JSON: UTF-8, object keys sorted
/// lexicographically, no insignificant whitespace.
///
/// This is the exact byte sequence that gets hashed and sent over the wire,
/// so every hashing and transmission site must go through this function.
/// Routing the value through [`serde_json::Value`] sorts the keys, since its
/// map type is an ordered `BTreeMap`.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&value)
}
