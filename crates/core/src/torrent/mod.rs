//! Torrent client side: downloads that may still have to be seeded.
//!
//! This module provides a `TorrentSource` trait per client backend and a
//! manager aggregating all configured clients.

mod deluge;
mod manager;
mod qbittorrent;
mod types;

pub use deluge::DelugeSource;
pub use manager::DefaultTorrentManager;
pub use qbittorrent::QBittorrentSource;
pub use types::*;
