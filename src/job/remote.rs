//! Remote transformation service client.
//!
//! The service is an opaque request/response collaborator: one multipart
//! submission carrying the clip bytes plus the three text-encoded parameters,
//! answered with the transformed clip bytes or a status code.
//! [`TransformService`] is the seam; [`HttpTransformService`] is the reqwest
//! implementation.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::RemoteConfig;
use crate::params::TransformParameters;
use crate::source::AudioArtifact;

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Failures of the remote exchange.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service answered with a non-success status.  All non-success
    /// statuses are treated uniformly.
    #[error("transformation service returned status {0}")]
    Status(u16),

    /// The request did not complete within the configured timeout.
    #[error("transformation request timed out")]
    Timeout,

    /// HTTP transport or connection error.
    #[error("transformation request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TransformService trait
// ---------------------------------------------------------------------------

/// Async seam for the remote transformation exchange.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn TransformService>`.
#[async_trait]
pub trait TransformService: Send + Sync {
    /// Submit one clip with one parameter snapshot; resolve to the
    /// transformed clip or the failure reason.
    async fn transform(
        &self,
        clip: &AudioArtifact,
        params: &TransformParameters,
    ) -> Result<AudioArtifact, RemoteError>;
}

// ---------------------------------------------------------------------------
// HttpTransformService
// ---------------------------------------------------------------------------

/// Posts `multipart/form-data` to `{base_url}/api/process`.
///
/// Parts: `audio` (file part, payload + media type), `shift`, `formant`,
/// `base` (text-encoded numbers).  The response body becomes the processed
/// clip; its media type is taken from the `Content-Type` header, defaulting
/// to `audio/wav`.
pub struct HttpTransformService {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl HttpTransformService {
    /// Build a client from config, with the per-request timeout applied.
    pub fn from_config(config: &RemoteConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

/// Upload filename for the clip part, derived from the media type.
fn upload_name(media_type: &str) -> String {
    let ext = match media_type {
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "audio/webm" => "webm",
        "audio/flac" => "flac",
        "audio/mp4" => "m4a",
        _ => "bin",
    };
    format!("clip.{ext}")
}

#[async_trait]
impl TransformService for HttpTransformService {
    async fn transform(
        &self,
        clip: &AudioArtifact,
        params: &TransformParameters,
    ) -> Result<AudioArtifact, RemoteError> {
        let url = format!("{}/api/process", self.config.base_url);

        let audio = reqwest::multipart::Part::bytes(clip.data().to_vec())
            .file_name(upload_name(clip.media_type()))
            .mime_str(clip.media_type())
            .map_err(RemoteError::from)?;

        let form = reqwest::multipart::Form::new()
            .part("audio", audio)
            .text("shift", params.pitch_shift.to_string())
            .text("formant", params.formant_shift.to_string())
            .text("base", params.base_frequency.to_string());

        log::debug!(
            "remote: POST {url} ({} bytes, shift={}, formant={}, base={})",
            clip.len(),
            params.pitch_shift,
            params.formant_shift,
            params.base_frequency
        );

        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let media_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("audio/wav")
            .to_string();
        let data = response.bytes().await?;

        Ok(AudioArtifact::new(data, media_type))
    }
}

// ---------------------------------------------------------------------------
// Test double
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
