use log::warn;

use crate::error::{GitHubToolsError, Result};
use crate::types::TagRecord;

/// Pick the tag named `name`, or the most recent tag when no name is given.
///
/// Several tags can share the newest commit date (e.g. a release tagged twice).
/// Such a tie is logged and resolved by taking the greatest tag name, so the
/// choice does not depend on the order the forge listed the tags in.
pub fn resolve_tag<'a>(tags: &'a [TagRecord], name: Option<&str>) -> Result<&'a TagRecord> {
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        return tags
            .iter()
            .find(|tag| tag.name == name)
            .ok_or_else(|| GitHubToolsError::TagNotFound(name.to_string()));
    }

    let newest = tags
        .iter()
        .max_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)))
        .ok_or(GitHubToolsError::NoTags)?;

    let tied: Vec<&str> = tags
        .iter()
        .filter(|tag| tag.date == newest.date)
        .map(|tag| tag.name.as_str())
        .collect();
    if tied.len() > 1 {
        warn!(
            "Tags {:?} share the latest date {}, using {}",
            tied, newest.date, newest.name
        );
    }

    Ok(newest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn tag(name: &str, day: u32) -> TagRecord {
        TagRecord {
            name: name.to_string(),
            date: Utc.with_ymd_and_hms(2020, 1, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_latest_tag_by_date() {
        let tags = vec![tag("0.10.0", 20), tag("0.11.0", 25), tag("0.9.8", 3)];
        assert_eq!(resolve_tag(&tags, None).unwrap().name, "0.11.0");
        assert_eq!(resolve_tag(&tags, Some("")).unwrap().name, "0.11.0");
    }

    #[test]
    fn test_named_tag() {
        let tags = vec![tag("0.10.0", 20), tag("0.11.0", 25)];
        assert_eq!(resolve_tag(&tags, Some("0.10.0")).unwrap().name, "0.10.0");
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let tags = vec![tag("0.10.0", 20)];
        match resolve_tag(&tags, Some("0.12.0")) {
            Err(GitHubToolsError::TagNotFound(name)) => assert_eq!(name, "0.12.0"),
            other => panic!("expected TagNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_no_tags() {
        assert!(matches!(resolve_tag(&[], None), Err(GitHubToolsError::NoTags)));
    }

    #[test]
    fn test_tie_is_independent_of_order() {
        let forward = vec![tag("0.11.0-rc1", 25), tag("0.11.0", 25)];
        let backward = vec![tag("0.11.0", 25), tag("0.11.0-rc1", 25)];
        assert_eq!(
            resolve_tag(&forward, None).unwrap(),
            resolve_tag(&backward, None).unwrap()
        );
    }
}
