//! Audio container detection and the per-format labels stored on a track.

use std::io::Cursor;

use lofty::file::FileType;
use lofty::probe::Probe;
use serde::Serialize;

use crate::error::CoreError;

/// Audio containers the service accepts.
///
/// Whether a format's embedded tags can be read or written is not decided
/// here; that is a capability of the configured
/// [`MetadataCodec`](crate::tags::MetadataCodec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    OggVorbis,
    OggOpus,
    Flac,
    Mp3,
    Mp4,
    Aiff,
    Wav,
}

const ALL_FORMATS: &[AudioFormat] = &[
    AudioFormat::OggVorbis,
    AudioFormat::OggOpus,
    AudioFormat::Flac,
    AudioFormat::Mp3,
    AudioFormat::Mp4,
    AudioFormat::Aiff,
    AudioFormat::Wav,
];

impl AudioFormat {
    /// MIME type recorded on the track.
    pub fn mimetype(self) -> &'static str {
        match self {
            AudioFormat::OggVorbis => "audio/ogg",
            AudioFormat::OggOpus => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Mp4 => "audio/mp4",
            AudioFormat::Aiff => "audio/x-aiff",
            AudioFormat::Wav => "audio/x-wav",
        }
    }

    /// Human-readable codec label recorded as the track's `filetype`.
    pub fn label(self) -> &'static str {
        match self {
            AudioFormat::OggVorbis => "Ogg Vorbis",
            AudioFormat::OggOpus => "Ogg Opus",
            AudioFormat::Flac => "FLAC",
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Mp4 => "MPEG-4 Audio",
            AudioFormat::Aiff => "AIFF",
            AudioFormat::Wav => "WAV",
        }
    }

    /// Canonical file extension, used when an upload arrives without one.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::OggVorbis => "ogg",
            AudioFormat::OggOpus => "opus",
            AudioFormat::Flac => "flac",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Mp4 => "m4a",
            AudioFormat::Aiff => "aiff",
            AudioFormat::Wav => "wav",
        }
    }

    /// Inverse of [`label`](Self::label), for formats recorded on stored tracks.
    pub fn from_label(label: &str) -> Option<Self> {
        ALL_FORMATS.iter().copied().find(|f| f.label() == label)
    }

    fn from_file_type(file_type: FileType) -> Option<Self> {
        match file_type {
            FileType::Vorbis => Some(AudioFormat::OggVorbis),
            FileType::Opus => Some(AudioFormat::OggOpus),
            FileType::Flac => Some(AudioFormat::Flac),
            FileType::Mpeg => Some(AudioFormat::Mp3),
            FileType::Mp4 => Some(AudioFormat::Mp4),
            FileType::Aiff => Some(AudioFormat::Aiff),
            FileType::Wav => Some(AudioFormat::Wav),
            _ => None,
        }
    }

    /// Detect the container from the leading bytes of an upload.
    ///
    /// Detection looks at content only; the client-supplied extension is not
    /// trusted. Returns [`CoreError::InvalidMedia`] when the bytes are not a
    /// supported audio container.
    pub fn detect(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::InvalidMedia("Uploaded file is empty".into()));
        }

        let probe = Probe::new(Cursor::new(bytes))
            .guess_file_type()
            .map_err(|e| CoreError::InvalidMedia(format!("Could not inspect upload: {e}")))?;

        probe
            .file_type()
            .and_then(Self::from_file_type)
            .ok_or_else(|| {
                CoreError::InvalidMedia("File is not a supported audio format".into())
            })
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
