use std::io::Cursor;

use tracing::debug;

use crate::audio::chunk::SAMPLE_RATE;
use crate::error::{LuminoError, Result};

/// Converts a normalized sample buffer into transcript text.
///
/// The loop's policy on failure is to skip the iteration entirely: the
/// accumulated line buffer is retained and re-transcribed on the next
/// drain, so nothing is lost and no placeholder is emitted.
#[async_trait::async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// `samples` are mono 16 kHz floats in [-1, 1]. The returned text is
    /// trimmed of surrounding whitespace.
    async fn transcribe(&self, samples: &[f32]) -> Result<String>;
}

/// HTTP client for a whisper-server style transcription endpoint: the
/// buffer is posted as an in-memory WAV file and the JSON `text` field of
/// the response is the transcript.
pub struct WhisperApi {
    client: reqwest::Client,
    endpoint: String,
}

impl WhisperApi {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl TranscriptionEngine for WhisperApi {
    async fn transcribe(&self, samples: &[f32]) -> Result<String> {
        let wav = encode_wav(samples)?;
        debug!(bytes = wav.len(), "posting audio for transcription");

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("response_format", "json");

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        #[derive(serde::Deserialize)]
        struct TranscriptionResponse {
            text: String,
        }

        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text.trim().to_string())
    }
}

/// Encode normalized samples as a 16-bit mono 16 kHz WAV in memory.
fn encode_wav(samples: &[f32]) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| LuminoError::Internal(format!("failed to create WAV writer: {e}")))?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| LuminoError::Internal(format!("failed to write WAV sample: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| LuminoError::Internal(format!("failed to finalize WAV: {e}")))?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_wav_produces_riff_header_and_data() {
        let wav = encode_wav(&[0.0, 0.5, -0.5]).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte header plus 3 samples * 2 bytes.
        assert_eq!(wav.len(), 44 + 6);
    }
}
