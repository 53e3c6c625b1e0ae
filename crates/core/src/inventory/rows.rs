//! Presentation rows built from cached entries.

use chrono::{DateTime, Utc};

use crate::media::MediaType;

use super::linker::base_name;
use super::{
    Decision, EnrichedMedia, FileSelector, LinkStatus, LinkedMediaFile, MediaId, MediaRow,
    TorrentInformation,
};

/// Row of a title without its children, as used by listings.
pub fn summary_row(media: &EnrichedMedia, now: DateTime<Utc>) -> MediaRow {
    let mut row = media_row(media, now);
    row.children.clear();
    row
}

/// Full row tree of a title: seasons (for series) and files.
pub fn media_row(media: &EnrichedMedia, now: DateTime<Utc>) -> MediaRow {
    let metadata = &media.linked.metadata;
    let title_id = MediaId::title(metadata.media_type, metadata.id);

    let file_rows: Vec<MediaRow> = media
        .linked
        .files
        .iter()
        .map(|file| file_row(media, title_id, file, now))
        .collect();

    let mut torrent = combined_torrent(file_rows.iter().map(|r| &r.torrent));
    torrent.tracker = media.report.result.tracker.clone();

    let mut children: Vec<MediaRow> = Vec::new();
    for (linked, file_row) in media.linked.files.iter().zip(file_rows) {
        if metadata.media_type != MediaType::Series || !linked.file.has_season() {
            children.push(file_row);
            continue;
        }
        let season = linked.file.season;
        let season_id = MediaId {
            selector: FileSelector::Season(season),
            ..title_id
        }
        .to_string();
        match children.iter_mut().find(|r| r.id == season_id) {
            Some(season_row) => {
                season_row.size += file_row.size;
                if !season_row.torrent.same_torrent_as(&file_row.torrent) {
                    season_row.torrent = TorrentInformation {
                        link_status: season_row
                            .torrent
                            .link_status
                            .combine(file_row.torrent.link_status),
                        tracker: season_row.torrent.tracker.take(),
                        ratio: None,
                        age: None,
                    };
                }
                if season_row.added != file_row.added {
                    season_row.added = None;
                }
                season_row.children.push(file_row);
            }
            None => {
                let part = media.report.seasons.get(&season);
                let mut torrent = file_row.torrent.clone();
                torrent.tracker = part.and_then(|p| p.tracker.clone());
                children.push(MediaRow {
                    id: season_id,
                    media_type: metadata.media_type,
                    title: format!("Season {}", season),
                    url: None,
                    size: file_row.size,
                    added: file_row.added,
                    torrent,
                    decision: part.map(|p| p.decision).unwrap_or(file_row.decision),
                    allow_deletion: true,
                    children: vec![file_row],
                });
            }
        }
    }

    // A season seeded from a single torrent can only be deleted as a whole.
    for season_row in children.iter_mut().filter(|r| !r.children.is_empty()) {
        if season_row.torrent.ratio.is_some() {
            for file_row in &mut season_row.children {
                file_row.allow_deletion = false;
            }
        }
    }

    MediaRow {
        id: title_id.to_string(),
        media_type: metadata.media_type,
        title: metadata.title.clone(),
        url: Some(metadata.url.clone()),
        size: media.size,
        added: Some(media.added),
        torrent,
        decision: media.report.result.decision,
        allow_deletion: true,
        children,
    }
}

fn file_row(
    media: &EnrichedMedia,
    title_id: MediaId,
    linked: &LinkedMediaFile,
    now: DateTime<Utc>,
) -> MediaRow {
    let part = media.report.files.get(&linked.file.id);
    let torrent = match &linked.torrent {
        Some(entry) => TorrentInformation {
            link_status: LinkStatus::Present,
            tracker: part.and_then(|p| p.tracker.clone()),
            ratio: Some(entry.ratio),
            age: Some(now - entry.added),
        },
        None => TorrentInformation {
            link_status: LinkStatus::Missing,
            tracker: None,
            ratio: None,
            age: None,
        },
    };

    MediaRow {
        id: MediaId {
            selector: FileSelector::File(linked.file.id),
            ..title_id
        }
        .to_string(),
        media_type: title_id.media_type,
        title: base_name(&linked.file.original_file_path).to_string(),
        url: None,
        size: linked.file.size,
        added: linked.torrent.as_ref().map(|t| t.added),
        torrent,
        decision: part.map(|p| p.decision).unwrap_or(Decision::Pending),
        allow_deletion: true,
        children: Vec::new(),
    }
}

/// Torrent information shared by all rows, or the combined link status
/// with ratio and age cleared when they differ.
fn combined_torrent<'a>(rows: impl Iterator<Item = &'a TorrentInformation>) -> TorrentInformation {
    let mut combined: Option<TorrentInformation> = None;
    for info in rows {
        match combined.as_mut() {
            None => combined = Some(info.clone()),
            Some(acc) if acc.same_torrent_as(info) => {}
            Some(acc) => {
                acc.link_status = acc.link_status.combine(info.link_status);
                acc.ratio = None;
                acc.age = None;
            }
        }
    }
    let mut combined = combined.unwrap_or(TorrentInformation {
        link_status: LinkStatus::Missing,
        tracker: None,
        ratio: None,
        age: None,
    });
    combined.tracker = None;
    combined
}
