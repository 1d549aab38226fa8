use serde::{Deserialize, Serialize};

/// An immutable playable item.
///
/// `locator` is opaque to everything except the engine adapter; for the
/// rodio engine it is a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub locator: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_art: Option<String>,
}

impl Track {
    pub fn new(
        locator: impl Into<String>,
        title: impl Into<String>,
        album: impl Into<String>,
        artist: impl Into<String>,
    ) -> Self {
        Self {
            locator: locator.into(),
            title: title.into(),
            album: album.into(),
            artist: artist.into(),
            album_art: None,
        }
    }

    pub fn with_album_art(mut self, key: impl Into<String>) -> Self {
        self.album_art = Some(key.into());
        self
    }

    /// "Artist - Title", or just the title when the artist is blank.
    pub fn display(&self) -> String {
        match self.artist.trim() {
            "" => self.title.clone(),
            artist => format!("{artist} - {}", self.title),
        }
    }
}
