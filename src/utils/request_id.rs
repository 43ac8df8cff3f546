use uuid::Uuid;

/// Short id tagging every log line and report of one run: the first 8 hex
/// characters of a random v4 UUID.
pub fn new_request_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Identifier-safe form used inside staging table names.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_request_id_shape() {
        let id = new_request_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_request_ids_differ() {
        let ids: HashSet<String> = (0..100).map(|_| new_request_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_sanitize_label() {
        assert_eq!(sanitize_label("Ab-3.x"), "ab_3_x");
    }
}
