//! Conventional verb prefixes for action types.
//!
//! Each prefix already ends in the segment delimiter, so a type is built by
//! plain concatenation: `format!("{FETCH}AUTH{DEFAULT_SUFFIX_AUTO}")`.

/// Create a resource
pub const CREATE: &str = "CREATE_";

/// Delete a resource
pub const DELETE: &str = "DELETE_";

/// Fetch a single resource
pub const FETCH: &str = "FETCH_";

/// List a collection
pub const LIST: &str = "LIST_";

/// Update a resource
pub const UPDATE: &str = "UPDATE_";

/// All conventional verb prefixes
pub const ALL: [&str; 5] = [CREATE, DELETE, FETCH, LIST, UPDATE];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suffix::DELIMITER;

    #[test]
    fn test_prefixes_end_with_delimiter() {
        for prefix in ALL {
            assert!(prefix.ends_with(DELIMITER), "{prefix} must end with {DELIMITER}");
        }
    }
}
