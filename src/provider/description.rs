//! Metadata recovered from the free-text description that auto-generated
//! music uploads carry ("Provided to YouTube by ...", "Released on: ...").

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Provided to YouTube by (.*)").expect("valid regex"));

static RELEASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Released on: (\d{4}-\d{2}-\d{2})").expect("valid regex")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionMeta {
    pub label: Option<String>,
    pub released_on: Option<NaiveDate>,
}

pub fn parse(description: &str) -> DescriptionMeta {
    let label = LABEL_RE
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty());

    let released_on = RELEASE_RE
        .captures(description)
        .and_then(|c| c.get(1))
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok());

    DescriptionMeta { label, released_on }
}

/// Release date from the description when present, else the platform's own
/// publish timestamp.
pub fn published_at(meta: &DescriptionMeta, fallback: Option<&str>) -> Option<DateTime<Utc>> {
    if let Some(date) = meta.released_on {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    fallback
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_label_and_release_date() {
        let meta = parse(
            "Provided to YouTube by Epic Records\n\nSong · Artist\n\nReleased on: 2021-05-14\n\nAuto-generated by YouTube.",
        );
        assert_eq!(meta.label.as_deref(), Some("Epic Records"));
        assert_eq!(meta.released_on, NaiveDate::from_ymd_opt(2021, 5, 14));

        let at = published_at(&meta, Some("2023-01-01T10:00:00Z")).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2021, 5, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_falls_back_to_platform_timestamp() {
        let meta = parse("Just a vlog, thanks for watching");
        assert_eq!(meta, DescriptionMeta::default());

        let at = published_at(&meta, Some("2019-08-03T17:21:09Z")).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2019, 8, 3, 17, 21, 9).unwrap());
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let meta = parse("provided to youtube by DistroKid\r\nreleased on: 2020-02-29");
        assert_eq!(meta.label.as_deref(), Some("DistroKid"));
        assert_eq!(meta.released_on.map(|d| d.day()), Some(29));
    }

    #[test]
    fn test_invalid_date_is_ignored() {
        let meta = parse("Released on: 2021-13-45");
        assert_eq!(meta.released_on, None);
        assert!(published_at(&meta, None).is_none());
    }

    #[test]
    fn test_unparsable_fallback() {
        let meta = parse("");
        assert!(published_at(&meta, Some("yesterday")).is_none());
    }
}
