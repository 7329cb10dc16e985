/// Conversion modes offered by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionMode {
    VideoToVideo,
    VideoToAudio,
    AudioToAudio,
    VideoToImages,
    ImagesToVideo,
    VideoToGif,
    SubtitleExtract,
    SubtitleConvert,
    SubtitleBurn,
}

impl ConversionMode {
    pub fn all() -> &'static [ConversionMode] {
        &[
            ConversionMode::VideoToVideo,
            ConversionMode::VideoToAudio,
            ConversionMode::AudioToAudio,
            ConversionMode::VideoToImages,
            ConversionMode::ImagesToVideo,
            ConversionMode::VideoToGif,
            ConversionMode::SubtitleExtract,
            ConversionMode::SubtitleConvert,
            ConversionMode::SubtitleBurn,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConversionMode::VideoToVideo => "Video → Video",
            ConversionMode::VideoToAudio => "Video → Audio",
            ConversionMode::AudioToAudio => "Audio → Audio",
            ConversionMode::VideoToImages => "Video → Images",
            ConversionMode::ImagesToVideo => "Images → Video",
            ConversionMode::VideoToGif => "Video → GIF",
            ConversionMode::SubtitleExtract => "Subtitles: Extract",
            ConversionMode::SubtitleConvert => "Subtitles: Convert",
            ConversionMode::SubtitleBurn => "Subtitles: Burn into Video",
        }
    }

    /// Output format suggested when the mode is selected.
    pub fn default_format(&self) -> &'static str {
        match self {
            ConversionMode::VideoToVideo | ConversionMode::ImagesToVideo => "mp4",
            ConversionMode::VideoToAudio | ConversionMode::AudioToAudio => "mp3",
            ConversionMode::VideoToImages => "png",
            ConversionMode::VideoToGif => "gif",
            ConversionMode::SubtitleExtract | ConversionMode::SubtitleConvert => "srt",
            ConversionMode::SubtitleBurn => "mp4",
        }
    }

    pub fn uses_video_codec(&self) -> bool {
        matches!(self, ConversionMode::VideoToVideo | ConversionMode::ImagesToVideo)
    }

    pub fn uses_audio_codec(&self) -> bool {
        matches!(
            self,
            ConversionMode::VideoToVideo
                | ConversionMode::ImagesToVideo
                | ConversionMode::VideoToAudio
                | ConversionMode::AudioToAudio
        )
    }

    /// Image sequences are the only source that does not come from the input field.
    pub fn requires_input_file(&self) -> bool {
        !matches!(self, ConversionMode::ImagesToVideo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodecChoice {
    Copy,
    H264,
    Hevc,
    Vp9,
    Av1,
}

impl VideoCodecChoice {
    pub fn all() -> &'static [VideoCodecChoice] {
        &[
            VideoCodecChoice::Copy,
            VideoCodecChoice::H264,
            VideoCodecChoice::Hevc,
            VideoCodecChoice::Vp9,
            VideoCodecChoice::Av1,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoCodecChoice::Copy => "copy (no re-encode)",
            VideoCodecChoice::H264 => "h264",
            VideoCodecChoice::Hevc => "hevc (h265)",
            VideoCodecChoice::Vp9 => "vp9",
            VideoCodecChoice::Av1 => "av1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodecChoice {
    Copy,
    Aac,
    Mp3,
    Opus,
    Vorbis,
    Flac,
    PcmS16le,
}

impl AudioCodecChoice {
    pub fn all() -> &'static [AudioCodecChoice] {
        &[
            AudioCodecChoice::Copy,
            AudioCodecChoice::Aac,
            AudioCodecChoice::Mp3,
            AudioCodecChoice::Opus,
            AudioCodecChoice::Vorbis,
            AudioCodecChoice::Flac,
            AudioCodecChoice::PcmS16le,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioCodecChoice::Copy => "copy (no re-encode)",
            AudioCodecChoice::Aac => "aac",
            AudioCodecChoice::Mp3 => "mp3",
            AudioCodecChoice::Opus => "opus",
            AudioCodecChoice::Vorbis => "vorbis",
            AudioCodecChoice::Flac => "flac",
            AudioCodecChoice::PcmS16le => "pcm_s16le",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteStrategy {
    Simple,
    Optimized,
}

impl PaletteStrategy {
    pub fn all() -> &'static [PaletteStrategy] {
        &[PaletteStrategy::Simple, PaletteStrategy::Optimized]
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaletteStrategy::Simple => "auto (simple)",
            PaletteStrategy::Optimized => "optimized (palettegen)",
        }
    }
}

/// Everything the user has entered in the form.
///
/// Free-text fields are kept exactly as typed; a blank field means "use the
/// default for the selected codec" and is resolved when commands are built.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingParameters {
    pub input: String,
    pub output: String,
    pub output_format: String,
    pub video_codec: VideoCodecChoice,
    pub audio_codec: AudioCodecChoice,
    pub crf: String,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    pub scale: String,
    pub fps: String,
    pub start_time: String,
    pub duration: String,
    pub gif_palette: PaletteStrategy,
    pub subtitle_stream: String,
    pub subtitle_in_format: String,
    pub subtitle_out_format: String,
    /// Folder or glob of images; also the subtitle file when burning subtitles.
    pub image_source: String,
    pub images_fps: String,
}

impl Default for EncodingParameters {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            output_format: "mp4".to_string(),
            video_codec: VideoCodecChoice::Copy,
            audio_codec: AudioCodecChoice::Copy,
            crf: String::new(),
            video_bitrate: String::new(),
            audio_bitrate: String::new(),
            scale: String::new(),
            fps: String::new(),
            start_time: String::new(),
            duration: String::new(),
            gif_palette: PaletteStrategy::Optimized,
            subtitle_stream: "0".to_string(),
            subtitle_in_format: "srt".to_string(),
            subtitle_out_format: "vtt".to_string(),
            image_source: String::new(),
            images_fps: "24".to_string(),
        }
    }
}

impl EncodingParameters {
    /// Switch to a new mode: reset the format and re-suggest the output path.
    pub fn apply_mode(&mut self, mode: ConversionMode) {
        self.output_format = match mode {
            ConversionMode::SubtitleConvert => self.subtitle_out_format.clone(),
            _ => mode.default_format().to_string(),
        };
        self.suggest_output(mode);
    }

    /// Derive an output path from the input path, if there is one.
    pub fn suggest_output(&mut self, mode: ConversionMode) {
        if let Some(output) = crate::ui::suggest_output_path(self.input.trim(), mode, &self.output_format) {
            if mode == ConversionMode::VideoToImages {
                self.output_format = "png".to_string();
            }
            self.output = output;
        }
    }
}

/// Returns the trimmed value of a free-text field, or `None` when blank.
pub fn field(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

pub const VIDEO_CONTAINERS: &[&str] = &["mp4", "mkv", "mov", "avi", "ts", "flv", "webm", "m4v", "3gp", "mpg"];
pub const AUDIO_FORMATS: &[&str] = &["mp3", "aac", "m4a", "wav", "flac", "ogg", "opus", "wma", "aiff", "amr"];
pub const IMAGE_FORMATS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "webp"];
pub const SUBTITLE_FORMATS: &[&str] = &["srt", "vtt", "ass", "ssa"];

/// Every format offered by the output format selector.
pub fn output_formats() -> impl Iterator<Item = &'static str> {
    VIDEO_CONTAINERS
        .iter()
        .chain(AUDIO_FORMATS)
        .chain(IMAGE_FORMATS)
        .chain(SUBTITLE_FORMATS)
        .chain(std::iter::once(&"gif"))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_treats_whitespace_as_blank() {
        assert_eq!(field(""), None);
        assert_eq!(field("   "), None);
        assert_eq!(field(" 23 "), Some("23"));
    }

    #[test]
    fn test_apply_mode_resets_format_and_output() {
        let mut params = EncodingParameters {
            input: "/videos/clip.mov".to_string(),
            ..Default::default()
        };

        params.apply_mode(ConversionMode::VideoToAudio);
        assert_eq!(params.output_format, "mp3");
        assert_eq!(params.output, "/videos/clip.mp3");

        params.apply_mode(ConversionMode::VideoToImages);
        assert_eq!(params.output_format, "png");
        assert_eq!(params.output, "/videos/clip_frame_%04d.png");
    }

    #[test]
    fn test_apply_mode_without_input_keeps_output() {
        let mut params = EncodingParameters {
            output: "/out/kept.mkv".to_string(),
            ..Default::default()
        };
        params.apply_mode(ConversionMode::VideoToGif);
        assert_eq!(params.output_format, "gif");
        assert_eq!(params.output, "/out/kept.mkv");
    }

    #[test]
    fn test_subtitle_convert_uses_subtitle_out_format() {
        let mut params = EncodingParameters::default();
        params.subtitle_out_format = "ass".to_string();
        params.apply_mode(ConversionMode::SubtitleConvert);
        assert_eq!(params.output_format, "ass");
    }

    #[test]
    fn test_output_formats_include_gif() {
        let formats: Vec<_> = output_formats().collect();
        assert!(formats.contains(&"gif"));
        assert!(formats.contains(&"mkv"));
        assert!(formats.contains(&"vtt"));
    }
}
