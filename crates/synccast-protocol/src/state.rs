//! Shared playback model.
//!
//! [`PlaybackState`] is the record replicated between a host and its
//! viewers. Each side holds an independent copy and converges via partial
//! updates; nothing here is shared memory.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolResult;

/// Flat record of independently-settable playback fields.
///
/// Wire names are camelCase; unknown fields from newer peers are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackState {
    /// Media duration in seconds, zero until known.
    pub duration: f64,
    /// Whether position convergence is enabled.
    pub sync: bool,
    /// Seconds between host position broadcasts.
    pub sync_interval: f64,
    /// Host-broadcast playback position, in seconds.
    pub syncing: f64,
    pub playing: bool,
    pub current_time: f64,
    pub autoplay: bool,
    /// Whether viewers may drive playback themselves.
    pub controls: bool,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub muted: bool,
    /// Picture-in-picture presentation.
    pub pip: bool,
    pub full_screen: bool,
    /// Seconds of media one buffer fill should cover.
    pub buffer_time: f64,
    /// Descriptor of the media file being cast, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<MediaSource>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            duration: 0.0,
            sync: true,
            sync_interval: 20.0,
            syncing: 0.0,
            playing: false,
            current_time: 0.0,
            autoplay: false,
            controls: true,
            looping: false,
            muted: false,
            pip: false,
            full_screen: false,
            buffer_time: 20.0,
            source: None,
        }
    }
}

impl PlaybackState {
    /// Serializes the state into a JSON document for path-addressed
    /// patching.
    pub fn to_document(&self) -> ProtocolResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Reads a state snapshot back out of a patched document. Missing
    /// fields fall back to their defaults; a null document reads as the
    /// default state.
    pub fn from_document(document: &Value) -> ProtocolResult<Self> {
        if document.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(document.clone())?)
    }
}

/// Descriptor of a media file, mirroring what a file picker reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSource {
    pub name: String,
    /// MIME type, e.g. `video/mp4`.
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
    pub last_modified: i64,
}

/// Server-side binary buffer handle returned by INSTANT_FILE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantFile {
    /// Stream id chunks for this file are tagged with.
    pub id: u32,
    /// Where viewers can address the buffered file.
    pub url: String,
}

/// Byte range of the source already fetched into the playback pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferWindow {
    pub low: u64,
    pub high: u64,
}

impl BufferWindow {
    /// Advances the window to cover `[low, low + len)`.
    pub fn refill(&mut self, low: u64, len: u64) {
        self.low = low;
        self.high = low + len;
    }

    pub fn contains(&self, position: u64) -> bool {
        position >= self.low && position <= self.high
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_initial_player() {
        let state = PlaybackState::default();
        assert!(state.sync);
        assert!(state.controls);
        assert_eq!(state.sync_interval, 20.0);
        assert_eq!(state.buffer_time, 20.0);
        assert!(!state.playing);
        assert!(state.source.is_none());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let state = PlaybackState {
            full_screen: true,
            looping: true,
            ..Default::default()
        };
        let value = state.to_document().unwrap();
        assert_eq!(value["fullScreen"], json!(true));
        assert_eq!(value["loop"], json!(true));
        assert_eq!(value["syncInterval"], json!(20.0));
        assert!(value.get("full_screen").is_none());
    }

    #[test]
    fn document_roundtrip() {
        let state = PlaybackState {
            playing: true,
            source: Some(MediaSource {
                name: "clip.mp4".to_string(),
                content_type: "video/mp4".to_string(),
                size: 1234,
                last_modified: 1700000000,
            }),
            ..Default::default()
        };
        let doc = state.to_document().unwrap();
        assert_eq!(doc["source"]["type"], json!("video/mp4"));
        let back = PlaybackState::from_document(&doc).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn partial_document_fills_defaults() {
        let back = PlaybackState::from_document(&json!({"playing": true})).unwrap();
        assert!(back.playing);
        assert!(back.sync);
        assert_eq!(back.sync_interval, 20.0);
    }

    #[test]
    fn null_document_reads_as_default() {
        assert_eq!(
            PlaybackState::from_document(&Value::Null).unwrap(),
            PlaybackState::default()
        );
    }

    #[test]
    fn buffer_window_refill_and_contains() {
        let mut window = BufferWindow::default();
        window.refill(100, 50);
        assert_eq!(window.low, 100);
        assert_eq!(window.high, 150);
        assert!(window.contains(100));
        assert!(window.contains(150));
        assert!(!window.contains(99));
        assert!(!window.contains(151));

        window.reset();
        assert_eq!(window, BufferWindow::default());
    }
}
