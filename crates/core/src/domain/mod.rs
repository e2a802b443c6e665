pub mod chat;
pub mod product;
pub mod supplier;

/// Unicode lowercase fold used by every case-insensitive catalog comparison, so SQL and
/// in-memory repositories agree on non-ASCII text.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    fold_case(haystack).contains(&fold_case(needle))
}

/// Case-insensitive equality, ignoring surrounding whitespace.
pub fn eq_ignore_case(left: &str, right: &str) -> bool {
    fold_case(left.trim()) == fold_case(right.trim())
}
