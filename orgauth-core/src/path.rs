//! Materialized-path codec.
//!
//! A node's path is the '/'-joined chain of ancestor segments, from the
//! root union down to the node itself. Storing the full chain on every
//! node makes subtree queries a string-prefix match instead of a
//! recursive join.
//!
//! Grammar: the empty string denotes system/root scope and is valid.
//! Non-empty paths are '/'-separated segments of `[A-Za-z0-9_]+`, at
//! most five deep. Team and service segments carry a `team_` /
//! `service_` tag and are only permitted at their own depth; the upper
//! three levels use raw entity ids.
//!
//! # Examples
//!
//! ```rust
//! use orgauth_core::path;
//!
//! assert!(path::validate("u1/conf2/c3/team_t9"));
//! assert_eq!(path::depth("u1/conf2/c3"), 3);
//! assert_eq!(path::parent("u1/conf2/c3"), "u1/conf2");
//! assert!(path::is_subtree("u1/conf2/c3", "u1/conf2"));
//! ```

use crate::hierarchy::EntityKind;

/// Maximum path depth, fixed by the five-level hierarchy.
pub const MAX_DEPTH: usize = 5;

const SEPARATOR: char = '/';

/// Validate a materialized path against the grammar.
///
/// The empty string is valid and denotes system/root scope.
pub fn validate(path: &str) -> bool {
    if path.is_empty() {
        return true;
    }
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    if segments.len() > MAX_DEPTH {
        return false;
    }
    for (index, segment) in segments.iter().enumerate() {
        if !valid_segment(segment) {
            return false;
        }
        // Tagged segments only at their own depth: team_ at index 3,
        // service_ at index 4. A tag prefix anywhere else is malformed.
        if segment.starts_with("team_") && index != 3 {
            return false;
        }
        if segment.starts_with("service_") && index != 4 {
            return false;
        }
    }
    true
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Number of segments in the path (0 for the empty path).
pub fn depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split(SEPARATOR).count()
    }
}

/// All segments but the last; empty for a single-segment or empty path.
pub fn parent(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// Prefix sequence from the shallowest ancestor to `path` itself,
/// inclusive. Empty for the empty path.
pub fn ancestors(path: &str) -> Vec<&str> {
    if path.is_empty() {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut end = 0;
    for (pos, c) in path.char_indices() {
        if c == SEPARATOR {
            result.push(&path[..pos]);
        }
        end = pos + c.len_utf8();
    }
    result.push(&path[..end]);
    result
}

/// True if `candidate` lies inside the subtree rooted at `root`.
///
/// The empty root denotes global scope and contains everything. A path
/// is inside its own subtree: `is_subtree(x, x)` is true.
pub fn is_subtree(candidate: &str, root: &str) -> bool {
    if root.is_empty() {
        return true;
    }
    candidate == root
        || (candidate.len() > root.len()
            && candidate.starts_with(root)
            && candidate.as_bytes()[root.len()] == SEPARATOR as u8)
}

/// Path segment for an entity of the given kind: the raw id for the
/// upper three levels, the tagged form for teams and services.
pub fn encode_segment(kind: EntityKind, id: &str) -> String {
    match kind.segment_tag() {
        Some(tag) => format!("{}{}", tag, id),
        None => id.to_string(),
    }
}

/// Join a parent path and a child segment. A root-level segment joined
/// onto the empty path is the segment itself.
pub fn join(parent_path: &str, segment: &str) -> String {
    if parent_path.is_empty() {
        segment.to_string()
    } else {
        format!("{}{}{}", parent_path, SEPARATOR, segment)
    }
}

/// True if `segment` appears in `path` as a non-terminal segment.
///
/// Used by the cycle check: a node's id must never reappear above the
/// node in its own path.
pub fn contains_non_terminal(path: &str, segment: &str) -> bool {
    let segments: Vec<&str> = path.split(SEPARATOR).collect();
    segments
        .iter()
        .take(segments.len().saturating_sub(1))
        .any(|s| *s == segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_grammar() {
        assert!(validate(""));
        assert!(validate("u1"));
        assert!(validate("u1/conf2"));
        assert!(validate("u1/conf2/c3"));
        assert!(validate("u1/conf2/c3/team_t9"));
        assert!(validate("u1/conf2/c3/team_t9/service_s1"));

        assert!(!validate("/u1"));
        assert!(!validate("u1/"));
        assert!(!validate("u1//conf2"));
        assert!(!validate("u1/con f2"));
        assert!(!validate("u1/conf-2"));
        assert!(!validate("u1/conf2/c3/team_t9/service_s1/extra"));
    }

    #[test]
    fn test_validate_tagged_depth() {
        // A tag at the wrong depth is malformed.
        assert!(!validate("team_t9"));
        assert!(!validate("u1/team_t9"));
        assert!(!validate("u1/conf2/c3/service_s1"));
        assert!(!validate("u1/conf2/c3/team_t9/team_t10"));
        // Untagged segments at tag depth are tolerated by the grammar;
        // the codec itself only ever emits tagged ones there.
        assert!(validate("u1/conf2/c3/t9"));
    }

    #[test]
    fn test_depth() {
        assert_eq!(depth(""), 0);
        assert_eq!(depth("u1"), 1);
        assert_eq!(depth("u1/conf2/c3"), 3);
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent(""), "");
        assert_eq!(parent("u1"), "");
        assert_eq!(parent("u1/conf2/c3"), "u1/conf2");
    }

    #[test]
    fn test_ancestors() {
        assert!(ancestors("").is_empty());
        assert_eq!(ancestors("u1"), vec!["u1"]);
        assert_eq!(
            ancestors("u1/conf2/c3"),
            vec!["u1", "u1/conf2", "u1/conf2/c3"]
        );
    }

    #[test]
    fn test_is_subtree() {
        assert!(is_subtree("u1/conf2/c3", ""));
        assert!(is_subtree("u1/conf2", "u1/conf2"));
        assert!(is_subtree("u1/conf2/c3", "u1/conf2"));
        assert!(!is_subtree("u1/conf2", "u1/conf2/c3"));
        assert!(!is_subtree("u1/conf9", "u1/conf2"));
        // Prefix of a longer sibling segment is not an ancestor.
        assert!(!is_subtree("u1/conf22", "u1/conf2"));
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment(EntityKind::Church, "c3"), "c3");
        assert_eq!(encode_segment(EntityKind::Team, "t9"), "team_t9");
        assert_eq!(encode_segment(EntityKind::Service, "s1"), "service_s1");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "u1"), "u1");
        assert_eq!(join("u1/conf2", "c3"), "u1/conf2/c3");
    }

    #[test]
    fn test_contains_non_terminal() {
        assert!(contains_non_terminal("u1/c3/c3x/c3", "c3"));
        assert!(!contains_non_terminal("u1/conf2/c3", "c3"));
        assert!(!contains_non_terminal("u1", "u1"));
    }
}
