use std::sync::Arc;

use crate::media::{MediaEntry, MediaFile};
use crate::torrent::TorrentEntry;

use super::{LinkedMedia, LinkedMediaFile};

/// Correlates media files with the torrents that provided them.
pub trait Linker: Send + Sync {
    fn link_media(&self, media: &[MediaEntry], torrents: &[Arc<TorrentEntry>]) -> Vec<LinkedMedia>;
}

/// Links files by torrent name, or by size and path of a torrent's files.
///
/// Torrents are tried in the given order and the first match wins. Per
/// torrent the rules are, in order:
/// 1. the torrent name equals the file's original path,
/// 2. the torrent name plus the file's extension equals the original path,
/// 3. a torrent file with the same size has the original path as its path
///    or as its base name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLinker;

impl PathLinker {
    pub fn new() -> Self {
        Self
    }

    fn find_torrent(
        &self,
        file: &MediaFile,
        torrents: &[Arc<TorrentEntry>],
    ) -> Option<Arc<TorrentEntry>> {
        torrents
            .iter()
            .find(|torrent| links_to(file, torrent))
            .map(Arc::clone)
    }
}

fn links_to(file: &MediaFile, torrent: &TorrentEntry) -> bool {
    let original = file.original_file_path.as_str();

    if torrent.name == original {
        return true;
    }

    if format!("{}{}", torrent.name, extension(original)) == original {
        return true;
    }

    torrent.files.iter().any(|torrent_file| {
        torrent_file.size == file.size
            && (torrent_file.path == original || base_name(&torrent_file.path) == original)
    })
}

/// Extension of the last path element including the dot, or "".
fn extension(path: &str) -> &str {
    let name_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[name_start..].rfind('.') {
        Some(dot) => &path[name_start + dot..],
        None => "",
    }
}

/// Last `/`-separated element, ignoring trailing slashes. Backslashes are
/// part of the name.
pub(super) fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return path;
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

impl Linker for PathLinker {
    fn link_media(&self, media: &[MediaEntry], torrents: &[Arc<TorrentEntry>]) -> Vec<LinkedMedia> {
        media
            .iter()
            .filter(|entry| !entry.files.is_empty())
            .map(|entry| LinkedMedia {
                metadata: entry.metadata.clone(),
                files: entry
                    .files
                    .iter()
                    .map(|file| LinkedMediaFile {
                        file: file.clone(),
                        torrent: self.find_torrent(file, torrents),
                    })
                    .collect(),
            })
            .collect()
    }
}
