//! ffmpeg frame-grab command builder.
//!
//! Builds the single ffmpeg invocation this server ever runs: decode a live
//! stream and keep rewriting one grayscale JPEG in place. E-ink panels
//! refresh slowly and only show grayscale, so 1 fps and `format=gray` are
//! deliberate, not placeholders.

use std::path::{Path, PathBuf};

use crate::error::{MediaError, MediaResult};

/// Default frame width: Kobo Elipsa native portrait width (1404x1872),
/// which keeps on-screen text crisp.
pub const DEFAULT_FRAME_WIDTH: u32 = 1404;

/// Default mjpeg qscale. Lower is better; 2 is near-lossless.
pub const DEFAULT_JPEG_QSCALE: u32 = 2;

/// Builder for the frame-grab ffmpeg command.
#[derive(Debug, Clone)]
pub struct FrameGrabCommand {
    /// Input stream URL (HLS URL resolved by streamlink)
    input_url: String,
    /// Output frame path, continuously overwritten
    frame_path: PathBuf,
    /// Target width; 0 disables scaling
    width: u32,
    /// mjpeg quality scale
    jpeg_qscale: u32,
    /// ffmpeg log level
    log_level: String,
}

impl FrameGrabCommand {
    /// Create a new frame-grab command.
    pub fn new(input_url: impl Into<String>, frame_path: impl AsRef<Path>) -> Self {
        Self {
            input_url: input_url.into(),
            frame_path: frame_path.as_ref().to_path_buf(),
            width: DEFAULT_FRAME_WIDTH,
            jpeg_qscale: DEFAULT_JPEG_QSCALE,
            log_level: "error".to_string(),
        }
    }

    /// Set the target frame width. `0` disables downscaling entirely;
    /// aggressive downscaling makes on-screen text blurry.
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the mjpeg quality scale.
    pub fn jpeg_qscale(mut self, qscale: u32) -> Self {
        self.jpeg_qscale = qscale;
        self
    }

    /// Set the ffmpeg log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Path of the continuously rewritten frame file.
    pub fn frame_path(&self) -> &Path {
        &self.frame_path
    }

    /// Build the video filter chain.
    fn video_filter(&self) -> String {
        let mut parts = vec!["fps=1".to_string(), "format=gray".to_string()];
        if self.width > 0 {
            // -2 preserves aspect ratio and keeps dimensions even;
            // lanczos for sharp text on the e-ink panel.
            parts.push(format!("scale={}:-2:flags=lanczos", self.width));
        }
        parts.join(",")
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        // Overwrite output without prompting
        args.push("-y".to_string());

        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Read at native frame rate: required for live inputs
        args.push("-re".to_string());

        args.push("-i".to_string());
        args.push(self.input_url.clone());

        args.push("-vf".to_string());
        args.push(self.video_filter());

        args.push("-q:v".to_string());
        args.push(self.jpeg_qscale.to_string());

        // Keep rewriting the same image file
        args.push("-update".to_string());
        args.push("1".to_string());

        args.push(self.frame_path.to_string_lossy().to_string());

        args
    }
}

/// Check if ffmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if streamlink is available.
pub fn check_streamlink() -> MediaResult<PathBuf> {
    which::which("streamlink").map_err(|_| MediaError::StreamlinkNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_grab_args() {
        let cmd = FrameGrabCommand::new("https://example.com/stream.m3u8", "current.jpg");
        let args = cmd.build_args();

        assert!(args.contains(&"-re".to_string()));
        assert!(args.contains(&"https://example.com/stream.m3u8".to_string()));
        assert!(args.contains(&"-update".to_string()));
        assert_eq!(args.last().unwrap(), "current.jpg");

        let vf_pos = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf_pos + 1], "fps=1,format=gray,scale=1404:-2:flags=lanczos");
    }

    #[test]
    fn test_zero_width_disables_scaling() {
        let cmd = FrameGrabCommand::new("url", "frame.jpg").width(0);
        let args = cmd.build_args();

        let vf_pos = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf_pos + 1], "fps=1,format=gray");
    }

    #[test]
    fn test_qscale_override() {
        let cmd = FrameGrabCommand::new("url", "frame.jpg").jpeg_qscale(5);
        let args = cmd.build_args();

        let q_pos = args.iter().position(|a| a == "-q:v").unwrap();
        assert_eq!(args[q_pos + 1], "5");
    }
}
