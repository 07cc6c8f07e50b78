//! Blocking extraction contract and the options passed to it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ExtractResult;
use crate::model::Metadata;

/// Blocking access to a media extraction tool.
///
/// Implementations may take minutes per call; async callers go through
/// [`crate::ExtractionPool`].
pub trait MediaExtractor: Send + Sync + 'static {
    /// Resolve metadata for `url` without writing any files.
    ///
    /// # Errors
    ///
    /// Returns an error when the tool fails or its output cannot be parsed.
    fn peek(&self, url: &str) -> ExtractResult<Metadata>;

    /// Resolve metadata for `url` and materialise the media as `options` describe.
    ///
    /// # Errors
    ///
    /// Returns an error when the tool fails or its output cannot be parsed.
    /// Partial files may be left behind on failure.
    fn extract(&self, url: &str, options: &ExtractOptions) -> ExtractResult<Metadata>;
}

/// Audio extraction settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Format selector.
    pub format: String,
    /// Codec the audio is transcoded to.
    pub audio_format: String,
    /// Transcoder quality (`0` is best).
    pub audio_quality: String,
    /// Write tags from the source metadata.
    pub embed_metadata: bool,
    /// Download the thumbnail and embed it as cover art.
    pub embed_thumbnail: bool,
    /// Output path template.
    pub output_template: PathBuf,
    /// Suppress progress and warnings.
    pub quiet: bool,
}

impl ExtractOptions {
    /// Best available audio transcoded to MP3 inside `dir`, with tags and cover art.
    #[must_use]
    pub fn audio(dir: &Path) -> Self {
        Self {
            format: "bestaudio/best".to_string(),
            audio_format: "mp3".to_string(),
            audio_quality: "0".to_string(),
            embed_metadata: true,
            embed_thumbnail: true,
            output_template: dir.join("%(title)s.%(ext)s"),
            quiet: true,
        }
    }

    /// Render the options as `yt-dlp` command line arguments.
    #[must_use]
    pub fn to_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--format".into(),
            self.format.clone().into(),
            "--extract-audio".into(),
            "--audio-format".into(),
            self.audio_format.clone().into(),
            "--audio-quality".into(),
            self.audio_quality.clone().into(),
        ];
        if self.embed_metadata {
            args.push("--embed-metadata".into());
        }
        if self.embed_thumbnail {
            args.push("--write-thumbnail".into());
            args.push("--embed-thumbnail".into());
        }
        args.push("--output".into());
        args.push(self.output_template.clone().into_os_string());
        if self.quiet {
            args.push("--quiet".into());
            args.push("--no-warnings".into());
            args.push("--no-progress".into());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_options_match_expected_pipeline() {
        let options = ExtractOptions::audio(Path::new("/test/path"));
        assert_eq!(options.format, "bestaudio/best");
        assert_eq!(options.audio_format, "mp3");
        assert_eq!(options.audio_quality, "0");
        assert!(options.embed_metadata && options.embed_thumbnail && options.quiet);
        assert_eq!(
            options.output_template,
            PathBuf::from("/test/path/%(title)s.%(ext)s")
        );
    }

    #[test]
    fn args_include_transcode_and_template() {
        let args = ExtractOptions::audio(Path::new("/w")).to_args();
        let rendered: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        let joined = rendered.join(" ");
        assert!(joined.contains("--format bestaudio/best"));
        assert!(joined.contains("--extract-audio --audio-format mp3 --audio-quality 0"));
        assert!(joined.contains("--embed-metadata --write-thumbnail --embed-thumbnail"));
        assert!(joined.contains("--output /w/%(title)s.%(ext)s"));
        assert!(rendered.iter().any(|arg| arg == "--quiet"));
    }
}
