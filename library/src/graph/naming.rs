//! Node name allocation.

/// Replaces characters that cannot appear in a node name.
///
/// `.` separates node and parameter in connection strings, so it is never
/// part of a name.
pub fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c == '.' || c == '/' || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect();
    if cleaned.is_empty() {
        "Node".to_string()
    } else {
        cleaned
    }
}

/// Picks a free name for `requested`.
///
/// The requested name is used as-is when free. Otherwise trailing digits are
/// stripped and the smallest free numeric suffix from 1 upwards is appended,
/// so names freed by deletion are handed out again.
pub fn unique_name(requested: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let requested = sanitize(requested);
    if !is_taken(&requested) {
        return requested;
    }
    let prefix = match requested.trim_end_matches(|c: char| c.is_ascii_digit()) {
        "" => requested.as_str(),
        prefix => prefix,
    };
    let mut suffix = 1usize;
    loop {
        let candidate = format!("{}{}", prefix, suffix);
        if !is_taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn taken(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_free_name_is_kept() {
        assert_eq!(unique_name("Sphere", |n| taken(&[]).contains(n)), "Sphere");
    }

    #[test]
    fn test_lowest_suffix_is_used() {
        let names = taken(&["Node", "Node2"]);
        assert_eq!(unique_name("Node", |n| names.contains(n)), "Node1");
        let names = taken(&["Node", "Node1", "Node2"]);
        assert_eq!(unique_name("Node1", |n| names.contains(n)), "Node3");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("my node.v2"), "my_node_v2");
        assert_eq!(sanitize("  "), "Node");
    }
}
