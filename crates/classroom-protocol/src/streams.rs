//! Media stream descriptors.
//!
//! Stream state is carried as small integer codes on the wire
//! (`audioState`/`videoState`: 0 = off, 1 = on) and replaced wholesale on
//! every stream-list notification.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// On/off state of one media track, wire-encoded as 0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaState {
    #[default]
    Off,
    On,
}

impl MediaState {
    /// Wire code for this state.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            MediaState::Off => 0,
            MediaState::On => 1,
        }
    }

    /// Decode a wire code; any non-zero value is treated as on.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => MediaState::Off,
            _ => MediaState::On,
        }
    }

    #[must_use]
    pub const fn is_on(self) -> bool {
        matches!(self, MediaState::On)
    }
}

impl Serialize for MediaState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for MediaState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_code(u8::deserialize(deserializer)?))
    }
}

/// Video source of a stream, wire-encoded as 1 (camera) / 2 (screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoSource {
    #[default]
    Camera,
    Screen,
}

impl VideoSource {
    /// Wire code for this source.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            VideoSource::Camera => 1,
            VideoSource::Screen => 2,
        }
    }

    /// Decode a wire code; unknown codes fall back to camera.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            2 => VideoSource::Screen,
            _ => VideoSource::Camera,
        }
    }
}

impl Serialize for VideoSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for VideoSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_code(u8::deserialize(deserializer)?))
    }
}

/// One published media stream as reported by stream-list notifications.
///
/// The same shape is used for batch upserts issued by the session core;
/// `audio_state`/`video_state` then carry the desired publish state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub stream_uuid: String,
    pub owner_uuid: String,
    #[serde(default)]
    pub stream_name: String,
    #[serde(default)]
    pub video_source: VideoSource,
    #[serde(default)]
    pub audio_state: MediaState,
    #[serde(default)]
    pub video_state: MediaState,
    #[serde(default = "default_online")]
    pub online: bool,
}

const fn default_online() -> bool {
    true
}

impl StreamDescriptor {
    /// A camera stream with both tracks enabled, as published when a
    /// participant goes on stage or first joins as a broadcaster.
    #[must_use]
    pub fn live_camera(stream_uuid: impl Into<String>, owner_uuid: impl Into<String>) -> Self {
        Self {
            stream_uuid: stream_uuid.into(),
            owner_uuid: owner_uuid.into(),
            stream_name: String::new(),
            video_source: VideoSource::Camera,
            audio_state: MediaState::On,
            video_state: MediaState::On,
            online: true,
        }
    }

    /// Whether this descriptor is a live screen share.
    #[must_use]
    pub const fn is_live_screen(&self) -> bool {
        self.online && matches!(self.video_source, VideoSource::Screen)
    }
}
