//! Audio and video conversions through the ffmpeg command-line tools.
//!
//! `ffprobe` inspects the source's audio streams; `ffmpeg` does the
//! re-encode. Sample rate and channel layout are left to ffmpeg, which keeps
//! them unless the target encoder cannot take them.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info};

use super::error::ConvertError;
use super::format::Format;

/// Highest sample rate libmp3lame accepts.
const MP3_MAX_SAMPLE_RATE: u32 = 48_000;
/// How much ffmpeg stderr to keep in an error message.
const STDERR_TAIL: usize = 600;

/// Paths and encoder settings for the ffmpeg tools.
#[derive(Debug, Clone)]
pub struct MediaTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub mp3_bitrate: String,
}

impl Default for MediaTools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            mp3_bitrate: "192k".to_string(),
        }
    }
}

/// One audio stream as reported by ffprobe.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioStream {
    pub index: u32,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub channels: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<AudioStream>,
}

/// ffprobe prints sample rates as strings.
fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u32),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Text(s)) => s.parse().ok(),
        None => None,
    })
}

/// Parse `ffprobe -of json -show_streams` output.
pub fn parse_probe(json: &[u8]) -> Result<Vec<AudioStream>, ConvertError> {
    let probe: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| ConvertError::library("ffprobe", format!("unreadable output: {e}")))?;
    Ok(probe.streams)
}

impl MediaTools {
    /// Whether `ffmpeg -version` runs.
    pub fn available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// List the audio streams of a media file.
    pub fn probe_audio(&self, input: &Path) -> Result<Vec<AudioStream>, ConvertError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "a", "-show_streams", "-of", "json"])
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ConvertError::library("ffprobe", format!("failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ConvertError::library("ffprobe", stderr_tail(&output.stderr)));
        }

        let streams = parse_probe(&output.stdout)?;
        debug!("ffprobe found {} audio stream(s) in {:?}", streams.len(), input);
        Ok(streams)
    }

    /// Re-encode audio into `target`.
    pub fn convert_audio(&self, input: &Path, output: &Path, target: Format) -> Result<(), ConvertError> {
        let streams = self.probe_audio(input)?;
        let stream = streams.first().ok_or_else(|| {
            ConvertError::library("audio decode", "no audio stream found in input")
        })?;
        let args = encode_args(target, stream, &self.mp3_bitrate)?;
        self.run_ffmpeg(input, output, &["-map", "0:a:0"], &args)
    }

    /// Extract the first audio track of a video as MP3.
    pub fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), ConvertError> {
        let streams = self.probe_audio(input)?;
        let Some(stream) = streams.first() else {
            return Err(ConvertError::NoAudioTrack);
        };
        let args = encode_args(Format::Mp3, stream, &self.mp3_bitrate)?;
        self.run_ffmpeg(input, output, &["-vn", "-map", "0:a:0"], &args)
    }

    fn run_ffmpeg(
        &self,
        input: &Path,
        output: &Path,
        mapping: &[&str],
        encode: &[String],
    ) -> Result<(), ConvertError> {
        info!("🎬 ffmpeg {:?} -> {:?}", input, output);

        let result = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-nostdin", "-y", "-i"])
            .arg(input)
            .args(mapping)
            .args(encode)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ConvertError::library("ffmpeg", format!("failed to run ffmpeg: {e}")))?;

        if !result.status.success() {
            return Err(ConvertError::library("ffmpeg", stderr_tail(&result.stderr)));
        }
        Ok(())
    }
}

/// Encoder arguments for an audio target.
pub fn encode_args(target: Format, stream: &AudioStream, mp3_bitrate: &str) -> Result<Vec<String>, ConvertError> {
    let mut args: Vec<String> = match target {
        Format::Mp3 => vec!["-codec:a".into(), "libmp3lame".into(), "-b:a".into(), mp3_bitrate.into()],
        Format::Ogg => vec!["-codec:a".into(), "libvorbis".into(), "-q:a".into(), "5".into()],
        Format::Wav => vec!["-codec:a".into(), "pcm_s16le".into()],
        other => {
            return Err(ConvertError::library(
                "audio encode",
                format!("{other} is not an audio format"),
            ));
        }
    };

    if target == Format::Mp3
        && let Some(rate) = stream.sample_rate
        && rate > MP3_MAX_SAMPLE_RATE
    {
        args.extend(["-ar".to_string(), MP3_MAX_SAMPLE_RATE.to_string()]);
    }

    args.extend(["-f".to_string(), target.extension().to_string()]);
    Ok(args)
}

/// Last few hundred bytes of stderr, where ffmpeg puts the actual error.
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}
