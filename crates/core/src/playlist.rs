//! M3U playlist rendering.

/// One line-pair in an extended M3U playlist.
#[derive(Debug, Clone)]
pub struct PlaylistEntry {
    pub title: String,
    /// Absolute URL of the audio file.
    pub url: String,
}

/// MIME type served with rendered playlists.
pub const M3U_CONTENT_TYPE: &str = "audio/x-mpegurl";

/// Attachment filename for a playlist scoped to `scope` (a username, or the
/// public host name for the all-users playlist).
pub fn playlist_filename(scope: &str) -> String {
    format!("playlist-{scope}.m3u")
}

/// Render `entries` as an extended M3U document, one URL per track.
///
/// Line breaks inside titles would split an `#EXTINF` directive, so they are
/// flattened to spaces.
pub fn render_m3u(entries: &[PlaylistEntry]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for entry in entries {
        let title = entry.title.replace(['\r', '\n'], " ");
        out.push_str(&format!("#EXTINF:-1,{title}\n{}\n", entry.url));
    }
    out
}
