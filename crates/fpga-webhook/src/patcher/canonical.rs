/// Normalizes a hardware identifier: surrounding whitespace trimmed,
/// hyphens dropped, lower case.
pub fn canonize_id(id: &str) -> String {
    id.trim()
        .chars()
        .filter(|c| *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
