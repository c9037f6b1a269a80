// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// User record identifiers are generated app-side so the in-memory and
// Postgres repositories hand out the same kind of opaque id.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new UUIDv7 rendered as a hyphenated string.
pub fn new_id() -> String {
    uuidv7().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuidv7_is_valid() {
        let id = uuidv7();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn new_id_parses_back() {
        let id = new_id();
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
