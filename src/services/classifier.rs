use lazy_static::lazy_static;
use regex::Regex;

use crate::models::RecordingCategory;

lazy_static! {
    /// Anything that is not an ASCII letter or digit
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r"[^A-Za-z0-9]").unwrap();
}

// ============ KEYWORD SETS ============
// Order matters: sets overlap ("sky sports" vs "sky news", "series" vs "comedy"),
// the first matching set wins.
const CATEGORY_KEYWORDS: &[(RecordingCategory, &[&str])] = &[
    (
        RecordingCategory::Sports,
        &[
            "sport",
            "football",
            "soccer",
            "nba",
            "nfl",
            "espn",
            "sky sports",
            "bt sport",
            "premier league",
        ],
    ),
    (
        RecordingCategory::Movies,
        &["movie", "cinema", "film", "hbo", "showtime"],
    ),
    (
        RecordingCategory::News,
        &["news", "cnn", "bbc news", "fox news", "sky news"],
    ),
    (RecordingCategory::Drama, &["drama", "series", "netflix"]),
    (
        RecordingCategory::Documentary,
        &["discovery", "nat geo", "documentary", "history"],
    ),
    (
        RecordingCategory::Kids,
        &["nick", "cartoon", "disney", "kids", "baby"],
    ),
    (RecordingCategory::Music, &["mtv", "vh1", "music"]),
    (
        RecordingCategory::Entertainment,
        &["comedy", "entertainment", "e!"],
    ),
];

/// Keyword classifier for live channels and EPG programs
pub struct CategoryClassifier;

impl CategoryClassifier {
    /// Classify a channel (and optionally the program airing on it).
    /// Always returns exactly one category, `Other` when nothing matches.
    pub fn classify(channel_name: &str, epg_title: Option<&str>) -> RecordingCategory {
        let haystack = format!("{} {}", channel_name, epg_title.unwrap_or_default()).to_lowercase();

        CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|kw| haystack.contains(kw)))
            .map(|(category, _)| *category)
            .unwrap_or(RecordingCategory::Other)
    }

    /// Explicit category wins over detection
    pub fn resolve(
        explicit: Option<RecordingCategory>,
        channel_name: &str,
        epg_title: Option<&str>,
    ) -> RecordingCategory {
        explicit.unwrap_or_else(|| Self::classify(channel_name, epg_title))
    }

    /// Turn a channel name into a file-system safe, lowercase stem
    pub fn sanitize_file_stem(name: &str) -> String {
        UNSAFE_FILE_CHARS.replace_all(name, "_").to_lowercase()
    }
}
