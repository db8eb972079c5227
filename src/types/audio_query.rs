use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An audio clip and the question to ask about it.
///
/// Sent to `POST /audio/query` as multipart fields `audio` and `prompt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioQuery {
    /// File name reported in the multipart part.
    pub file_name: String,
    /// Raw audio bytes.
    pub bytes: Vec<u8>,
    /// The user's question about the audio.
    pub prompt: String,
}

impl AudioQuery {
    /// Creates a query from in-memory audio.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, prompt: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            prompt: prompt.into(),
        }
    }

    /// Reads an audio file from disk.
    pub async fn from_path(path: impl AsRef<Path>, prompt: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        Ok(Self::new(file_name, bytes, prompt))
    }

    /// Best-effort MIME type from the file extension.
    pub fn mime_type(&self) -> &'static str {
        let ext = Path::new(&self.file_name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());
        match ext.as_deref() {
            Some("mp3") => "audio/mpeg",
            Some("wav") => "audio/wav",
            Some("ogg") | Some("oga") => "audio/ogg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        }
    }
}

/// Body returned by `POST /audio/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioQueryResponse {
    /// The model's answer about the audio.
    pub response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(AudioQuery::new("a.MP3", vec![], "q").mime_type(), "audio/mpeg");
        assert_eq!(AudioQuery::new("a.wav", vec![], "q").mime_type(), "audio/wav");
        assert_eq!(
            AudioQuery::new("clip", vec![], "q").mime_type(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn from_path_reports_missing_file() {
        let err = AudioQuery::from_path("/definitely/not/here.wav", "what is this?")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
