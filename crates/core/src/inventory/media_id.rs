//! Composite ids addressing a title, one of its files or one of its seasons.
//!
//! Grammar: `<type>-<id>`, `<type>-<id>-<fileId>` or `<type>-<id>-s-<season>`,
//! where `<type>` is `movie` or `series` and all numbers are decimal.

use std::fmt;
use std::str::FromStr;

use crate::media::{MediaFile, MediaType};

use super::InventoryError;

/// Which files of a title an id addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSelector {
    All,
    File(i64),
    Season(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaId {
    pub media_type: MediaType,
    pub id: i64,
    pub selector: FileSelector,
}

impl MediaId {
    pub fn title(media_type: MediaType, id: i64) -> Self {
        Self {
            media_type,
            id,
            selector: FileSelector::All,
        }
    }

    pub fn file(media_type: MediaType, id: i64, file_id: i64) -> Self {
        Self {
            media_type,
            id,
            selector: FileSelector::File(file_id),
        }
    }

    pub fn season(media_type: MediaType, id: i64, season: i32) -> Self {
        Self {
            media_type,
            id,
            selector: FileSelector::Season(season),
        }
    }

    /// Whether `file` of the addressed title is selected.
    pub fn selects(&self, file: &MediaFile) -> bool {
        match self.selector {
            FileSelector::All => true,
            FileSelector::File(file_id) => file.id == file_id,
            FileSelector::Season(season) => file.season == season,
        }
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.media_type, self.id)?;
        match self.selector {
            FileSelector::All => Ok(()),
            FileSelector::File(file_id) => write!(f, "-{}", file_id),
            FileSelector::Season(season) => write!(f, "-s-{}", season),
        }
    }
}

fn decimal<T: FromStr>(raw: &str) -> Option<T> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

impl FromStr for MediaId {
    type Err = InventoryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || InventoryError::MalformedId(raw.to_string());
        let parts: Vec<&str> = raw.split('-').collect();

        let media_type = MediaType::parse(parts[0]).ok_or_else(malformed)?;
        let id = parts.get(1).and_then(|p| decimal(p)).ok_or_else(malformed)?;

        match parts.as_slice() {
            [_, _] => Ok(Self::title(media_type, id)),
            [_, _, file_id] => {
                let file_id = decimal(file_id).ok_or_else(malformed)?;
                Ok(Self::file(media_type, id, file_id))
            }
            [_, _, "s", season] => {
                let season = decimal(season).ok_or_else(malformed)?;
                Ok(Self::season(media_type, id, season))
            }
            _ => Err(malformed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: i64, season: i32) -> MediaFile {
        MediaFile {
            id,
            season,
            original_file_path: format!("file-{}.mkv", id),
            size: 1,
        }
    }

    #[test]
    fn test_parse_title() {
        let id: MediaId = "movie-1337".parse().unwrap();
        assert_eq!(id, MediaId::title(MediaType::Movie, 1337));
    }

    #[test]
    fn test_parse_file() {
        let id: MediaId = "movie-1337-10".parse().unwrap();
        assert_eq!(id, MediaId::file(MediaType::Movie, 1337, 10));
    }

    #[test]
    fn test_parse_season() {
        let id: MediaId = "series-1337-s-2".parse().unwrap();
        assert_eq!(id.media_type, MediaType::Series);
        assert_eq!(id.id, 1337);
        assert_eq!(id.selector, FileSelector::Season(2));
    }

    #[test]
    fn test_parse_malformed() {
        for raw in [
            "",
            "movie",
            "movie-",
            "movie-10a",
            "film-5",
            "Movie-5",
            "movie--5",
            "movie-+5",
            "series-1-x-2",
            "series-1-s-",
            "series-1-s-2-3",
            "movie-1-2-3",
        ] {
            let result = raw.parse::<MediaId>();
            assert!(
                matches!(result, Err(InventoryError::MalformedId(ref r)) if r == raw),
                "expected {:?} to be malformed",
                raw
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        for raw in ["movie-1337", "movie-1337-10", "series-7-s-12"] {
            let id: MediaId = raw.parse().unwrap();
            assert_eq!(id.to_string(), raw);
        }
    }

    #[test]
    fn test_selects() {
        let files = [file(1, 1), file(2, 1), file(3, 2), file(4, -1)];

        let selected = |id: MediaId| -> Vec<i64> {
            files.iter().filter(|f| id.selects(f)).map(|f| f.id).collect()
        };

        assert_eq!(selected(MediaId::title(MediaType::Series, 9)), vec![1, 2, 3, 4]);
        assert_eq!(selected(MediaId::file(MediaType::Series, 9, 3)), vec![3]);
        assert_eq!(selected(MediaId::season(MediaType::Series, 9, 1)), vec![1, 2]);
        assert!(selected(MediaId::season(MediaType::Series, 9, 5)).is_empty());
    }
}
