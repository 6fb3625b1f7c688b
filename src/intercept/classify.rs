//! Media request detection.
//!
//! A request is media-related when its URL contains any configured marker:
//! a file extension (`.m3u8`, `.ts`, `.mp4`, `.webm`, `.mpd`) or a CDN
//! hostname. The test is a case-insensitive substring match over the whole
//! URL, so markers also hit query strings and path segments.

use crate::config::schema::InterceptConfig;

#[derive(Debug, Clone)]
pub struct MediaClassifier {
    markers: Vec<String>,
}

impl MediaClassifier {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| m.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &InterceptConfig) -> Self {
        Self::new(&config.media_markers)
    }

    /// Returns the first marker found in the URL, if any.
    pub fn matched_marker(&self, url: &str) -> Option<&str> {
        let url = url.to_lowercase();
        self.markers
            .iter()
            .find(|m| url.contains(m.as_str()))
            .map(String::as_str)
    }

    pub fn is_media(&self, url: &str) -> bool {
        self.matched_marker(url).is_some()
    }
}

impl Default for MediaClassifier {
    fn default() -> Self {
        Self::from_config(&InterceptConfig::default())
    }
}
