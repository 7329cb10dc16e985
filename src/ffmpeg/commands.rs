use crate::error::BuildError;
use crate::project::{
    field, AudioCodecChoice, ConversionMode, EncodingParameters, PaletteStrategy, VideoCodecChoice,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DEFAULT_GIF_FILTER: &str = "fps=15,scale=640:-1:flags=lanczos";
const DEFAULT_IMAGES_FPS: &str = "24";
const DEFAULT_BURN_CRF: &str = "20";
const STAGED_IMAGE_PREFIX: &str = "img_";

/// One FFmpeg execution with a fixed argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// A failing step that may fail is logged and skipped instead of aborting the run.
    pub may_fail: bool,
}

impl Invocation {
    pub fn new(program: &Path, args: Vec<String>) -> Self {
        Self {
            program: program.to_path_buf(),
            args,
            may_fail: false,
        }
    }

    /// Printable command line, as echoed into the log.
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// The ordered invocations of one run, plus the scratch files the run owns.
///
/// Scratch files (the staged image folder, the GIF palette) are removed by
/// [`ConversionPlan::close`] or, failing that, when the plan is dropped.
#[derive(Debug)]
pub struct ConversionPlan {
    pub invocations: Vec<Invocation>,
    staging: Option<TempDir>,
    scratch_files: Vec<PathBuf>,
}

impl ConversionPlan {
    pub fn single(invocation: Invocation) -> Self {
        Self::sequence(vec![invocation])
    }

    /// Every invocation but the last is allowed to fail.
    pub fn sequence(mut invocations: Vec<Invocation>) -> Self {
        let last = invocations.len().saturating_sub(1);
        for (i, invocation) in invocations.iter_mut().enumerate() {
            invocation.may_fail = i < last;
        }
        Self {
            invocations,
            staging: None,
            scratch_files: Vec::new(),
        }
    }

    fn with_staging(mut self, staging: Option<TempDir>) -> Self {
        self.staging = staging;
        self
    }

    fn with_scratch_file(mut self, path: PathBuf) -> Self {
        self.scratch_files.push(path);
        self
    }

    #[cfg(test)]
    pub fn staging_dir(&self) -> Option<&Path> {
        self.staging.as_ref().map(|dir| dir.path())
    }

    /// Remove the scratch files now, reporting the first failure.
    pub fn close(mut self) -> std::io::Result<()> {
        let mut result = Ok(());
        for path in std::mem::take(&mut self.scratch_files) {
            if let Err(e) = remove_if_present(&path) {
                result = result.and(Err(e));
            }
        }
        if let Some(staging) = self.staging.take() {
            result = result.and(staging.close());
        }
        result
    }
}

impl Drop for ConversionPlan {
    fn drop(&mut self) {
        for path in &self.scratch_files {
            let _ = remove_if_present(path);
        }
        // TempDir removes itself when dropped
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Build the plan for `mode` from a snapshot of the form.
///
/// Only `ImagesToVideo` with a folder source touches the filesystem: the
/// images are staged into a temporary directory owned by the returned plan.
pub fn build_plan(
    mode: ConversionMode,
    params: &EncodingParameters,
    ffmpeg: &Path,
) -> Result<ConversionPlan, BuildError> {
    if mode.requires_input_file() && field(&params.input).is_none() {
        return Err(BuildError::MissingInput);
    }
    if field(&params.output).is_none() {
        return Err(BuildError::MissingOutput);
    }

    match mode {
        ConversionMode::VideoToVideo => build_video_to_video(params, ffmpeg).map(ConversionPlan::single),
        ConversionMode::VideoToAudio => build_video_to_audio(params, ffmpeg).map(ConversionPlan::single),
        ConversionMode::AudioToAudio => build_audio_to_audio(params, ffmpeg).map(ConversionPlan::single),
        ConversionMode::VideoToImages => build_video_to_images(params, ffmpeg).map(ConversionPlan::single),
        ConversionMode::ImagesToVideo => build_images_to_video(params, ffmpeg),
        ConversionMode::VideoToGif => build_video_to_gif(params, ffmpeg),
        ConversionMode::SubtitleExtract => build_subtitle_extract(params, ffmpeg).map(ConversionPlan::single),
        ConversionMode::SubtitleConvert => build_subtitle_convert(params, ffmpeg).map(ConversionPlan::single),
        ConversionMode::SubtitleBurn => build_subtitle_burn(params, ffmpeg).map(ConversionPlan::single),
    }
}

fn args<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `-ss` / `-t` trims; placed before the `-i` they apply to.
fn trim_args(params: &EncodingParameters) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(start) = field(&params.start_time) {
        out.extend(args(["-ss", start]));
    }
    if let Some(duration) = field(&params.duration) {
        out.extend(args(["-t", duration]));
    }
    out
}

/// Scale and fps joined into one filter expression, if either is set.
fn video_filters(params: &EncodingParameters) -> Option<String> {
    let mut filters = Vec::new();
    if let Some(scale) = field(&params.scale) {
        filters.push(format!("scale={}", scale));
    }
    if let Some(fps) = field(&params.fps) {
        filters.push(format!("fps={}", fps));
    }

    if filters.is_empty() {
        None
    } else {
        Some(filters.join(","))
    }
}

/// `-y [trim] -i <input>`
fn input_prefix(params: &EncodingParameters) -> Vec<String> {
    let mut out = vec!["-y".to_string()];
    out.extend(trim_args(params));
    out.extend(args(["-i", params.input.trim()]));
    out
}

/// Encoder flags for the video stream. CRF codecs ignore the bitrate field.
fn video_codec_args(params: &EncodingParameters) -> Vec<String> {
    let crf = |default| field(&params.crf).unwrap_or(default);
    let bitrate = field(&params.video_bitrate).unwrap_or("0");

    match params.video_codec {
        VideoCodecChoice::Copy => args(["-c:v", "copy"]),
        VideoCodecChoice::H264 => args(["-c:v", "libx264", "-preset", "medium", "-crf", crf("23")]),
        VideoCodecChoice::Hevc => args(["-c:v", "libx265", "-preset", "medium", "-crf", crf("28")]),
        VideoCodecChoice::Vp9 => args(["-c:v", "libvpx-vp9", "-b:v", bitrate]),
        VideoCodecChoice::Av1 => args(["-c:v", "libaom-av1", "-crf", crf("30"), "-b:v", "0"]),
    }
}

/// Encoder flags for the audio stream, with per-codec bitrate defaults.
fn audio_codec_args(params: &EncodingParameters) -> Vec<String> {
    let bitrate = |default| field(&params.audio_bitrate).unwrap_or(default);

    match params.audio_codec {
        AudioCodecChoice::Copy => args(["-c:a", "copy"]),
        AudioCodecChoice::Aac => args(["-c:a", "aac", "-b:a", bitrate("192k")]),
        AudioCodecChoice::Mp3 => args(["-c:a", "libmp3lame", "-b:a", bitrate("192k")]),
        AudioCodecChoice::Opus => args(["-c:a", "libopus", "-b:a", bitrate("128k")]),
        AudioCodecChoice::Vorbis => args(["-c:a", "libvorbis", "-b:a", bitrate("160k")]),
        AudioCodecChoice::Flac => args(["-c:a", "flac"]),
        AudioCodecChoice::PcmS16le => args(["-c:a", "pcm_s16le"]),
    }
}

/// FFmpeg muxer for a known video container, used to force the output format.
pub fn muxer_for_container(format: &str) -> Option<&'static str> {
    match format.to_lowercase().as_str() {
        "mp4" => Some("mp4"),
        "mkv" => Some("matroska"),
        "mov" => Some("mov"),
        "avi" => Some("avi"),
        "ts" => Some("mpegts"),
        "flv" => Some("flv"),
        "webm" => Some("webm"),
        "m4v" => Some("ipod"),
        "3gp" => Some("3gp"),
        "mpg" => Some("mpeg"),
        _ => None,
    }
}

pub fn build_video_to_video(params: &EncodingParameters, ffmpeg: &Path) -> Result<Invocation, BuildError> {
    let mut cmd = input_prefix(params);
    cmd.extend(video_codec_args(params));

    if let Some(vf) = video_filters(params) {
        cmd.extend(args(["-vf", &vf]));
    }

    cmd.extend(audio_codec_args(params));

    if let Some(muxer) = muxer_for_container(params.output_format.trim()) {
        cmd.extend(args(["-f", muxer]));
    }

    cmd.push(params.output.trim().to_string());
    Ok(Invocation::new(ffmpeg, cmd))
}

pub fn build_video_to_audio(params: &EncodingParameters, ffmpeg: &Path) -> Result<Invocation, BuildError> {
    let mut cmd = input_prefix(params);
    cmd.push("-vn".to_string());
    cmd.extend(audio_codec_args(params));
    cmd.push(params.output.trim().to_string());
    Ok(Invocation::new(ffmpeg, cmd))
}

pub fn build_audio_to_audio(params: &EncodingParameters, ffmpeg: &Path) -> Result<Invocation, BuildError> {
    build_video_to_audio(params, ffmpeg)
}

/// True when `path` contains a printf-style frame counter (`%d` or `%0Nd`).
pub fn has_frame_placeholder(path: &str) -> bool {
    path.match_indices('%').any(|(pos, _)| {
        let rest = &path[pos + 1..];
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        let zero_padded_or_bare = digits == 0 || rest.starts_with('0');
        zero_padded_or_bare && rest[digits..].starts_with('d')
    })
}

pub fn build_video_to_images(params: &EncodingParameters, ffmpeg: &Path) -> Result<Invocation, BuildError> {
    let output = params.output.trim();
    if !has_frame_placeholder(output) {
        return Err(BuildError::MissingFramePlaceholder(output.to_string()));
    }

    let mut cmd = input_prefix(params);
    if let Some(vf) = video_filters(params) {
        cmd.extend(args(["-vf", &vf]));
    }
    if let Some(fps) = field(&params.fps) {
        cmd.extend(args(["-r", fps]));
    }
    cmd.push(output.to_string());
    Ok(Invocation::new(ffmpeg, cmd))
}

fn is_sequence_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            matches!(ext.as_str(), "png" | "jpg" | "jpeg")
        })
        .unwrap_or(false)
}

fn normalized_image_extension(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ext == "jpeg" {
        "jpg".to_string()
    } else {
        ext
    }
}

/// Copy the folder's PNG/JPG images into a fresh temporary directory as a
/// contiguous `img_000001.<ext>` sequence, ordered by source file name.
///
/// Returns the directory together with the FFmpeg input pattern for it.
pub fn stage_image_sequence(source_dir: &Path) -> Result<(TempDir, PathBuf), BuildError> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(source_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_sequence_image(path))
        .collect();

    if images.is_empty() {
        return Err(BuildError::NoImagesFound(source_dir.to_path_buf()));
    }
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    // The image2 demuxer picks its decoder from the pattern's extension
    let ext = normalized_image_extension(&images[0]);
    if images.iter().any(|p| normalized_image_extension(p) != ext) {
        return Err(BuildError::MixedImageFormats(source_dir.to_path_buf()));
    }

    let staging = tempfile::Builder::new().prefix("umc_seq_").tempdir()?;
    for (i, image) in images.iter().enumerate() {
        let target = staging
            .path()
            .join(format!("{}{:06}.{}", STAGED_IMAGE_PREFIX, i + 1, ext));
        std::fs::copy(image, &target)?;
    }

    tracing::debug!(
        "Staged {} images from {} into {}",
        images.len(),
        source_dir.display(),
        staging.path().display()
    );

    let pattern = staging
        .path()
        .join(format!("{}%06d.{}", STAGED_IMAGE_PREFIX, ext));
    Ok((staging, pattern))
}

pub fn build_images_to_video(params: &EncodingParameters, ffmpeg: &Path) -> Result<ConversionPlan, BuildError> {
    let source = field(&params.image_source).ok_or(BuildError::MissingImageSource)?;

    let (staging, sequence) = if Path::new(source).is_dir() {
        let (dir, pattern) = stage_image_sequence(Path::new(source))?;
        (Some(dir), pattern.to_string_lossy().to_string())
    } else {
        (None, source.to_string())
    };

    let framerate = field(&params.images_fps).unwrap_or(DEFAULT_IMAGES_FPS);
    let mut cmd = args(["-y", "-framerate", framerate, "-i", &sequence]);

    if let Some(vf) = video_filters(params) {
        cmd.extend(args(["-vf", &vf]));
    }

    if params.output_format.trim().eq_ignore_ascii_case("webm") {
        let bitrate = field(&params.video_bitrate).unwrap_or("0");
        cmd.extend(args(["-c:v", "libvpx-vp9", "-b:v", bitrate]));
    } else {
        let crf = field(&params.crf).unwrap_or("23");
        cmd.extend(args(["-c:v", "libx264", "-preset", "medium", "-crf", crf]));
    }

    cmd.push(params.output.trim().to_string());
    Ok(ConversionPlan::single(Invocation::new(ffmpeg, cmd)).with_staging(staging))
}

/// Palette image path used by the two-pass GIF encode.
pub fn palette_path(output: &str) -> PathBuf {
    let output = Path::new(output);
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    output.with_file_name(format!("{}_palette.png", stem))
}

pub fn build_video_to_gif(params: &EncodingParameters, ffmpeg: &Path) -> Result<ConversionPlan, BuildError> {
    let output = params.output.trim();
    let vf = video_filters(params).unwrap_or_else(|| DEFAULT_GIF_FILTER.to_string());

    match params.gif_palette {
        PaletteStrategy::Optimized => {
            let palette = palette_path(output);
            let palette_str = palette.to_string_lossy().to_string();

            let mut generate = input_prefix(params);
            generate.extend(args(["-vf", &format!("{},palettegen", vf), &palette_str]));

            let mut encode = input_prefix(params);
            encode.extend(args([
                "-i",
                &palette_str,
                "-lavfi",
                &format!("{} [x]; [x][1:v] paletteuse", vf),
                output,
            ]));

            Ok(ConversionPlan::sequence(vec![
                Invocation::new(ffmpeg, generate),
                Invocation::new(ffmpeg, encode),
            ])
            .with_scratch_file(palette))
        }
        PaletteStrategy::Simple => {
            let mut cmd = input_prefix(params);
            cmd.extend(args(["-vf", &vf, output]));
            Ok(ConversionPlan::single(Invocation::new(ffmpeg, cmd)))
        }
    }
}

pub fn build_subtitle_extract(params: &EncodingParameters, ffmpeg: &Path) -> Result<Invocation, BuildError> {
    let index = field(&params.subtitle_stream).unwrap_or("0");
    let cmd = args([
        "-y",
        "-i",
        params.input.trim(),
        "-map",
        &format!("0:s:{}", index),
        params.output.trim(),
    ]);
    Ok(Invocation::new(ffmpeg, cmd))
}

pub fn build_subtitle_convert(params: &EncodingParameters, ffmpeg: &Path) -> Result<Invocation, BuildError> {
    let cmd = args(["-y", "-i", params.input.trim(), params.output.trim()]);
    Ok(Invocation::new(ffmpeg, cmd))
}

/// `subtitles=` filter argument for `path`, escaped for the filtergraph parser.
pub fn subtitles_filter(path: &str) -> String {
    let escaped = path
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', r"\'\''");
    format!("subtitles='{}'", escaped)
}

pub fn build_subtitle_burn(params: &EncodingParameters, ffmpeg: &Path) -> Result<Invocation, BuildError> {
    let subtitle = field(&params.image_source)
        .filter(|path| Path::new(path).exists())
        .ok_or_else(|| BuildError::MissingSubtitleFile(params.image_source.trim().to_string()))?;

    let vf = match video_filters(params) {
        Some(vf) => format!("{},{}", vf, subtitles_filter(subtitle)),
        None => subtitles_filter(subtitle),
    };
    let crf = field(&params.crf).unwrap_or(DEFAULT_BURN_CRF);

    let mut cmd = input_prefix(params);
    cmd.extend(args([
        "-vf", &vf, "-c:v", "libx264", "-preset", "medium", "-crf", crf, "-c:a", "copy",
        params.output.trim(),
    ]));
    Ok(Invocation::new(ffmpeg, cmd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ffmpeg() -> PathBuf {
        PathBuf::from("ffmpeg")
    }

    fn video_params() -> EncodingParameters {
        EncodingParameters {
            input: "in.mov".to_string(),
            output: "out.mp4".to_string(),
            output_format: "mp4".to_string(),
            ..Default::default()
        }
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    fn position(args: &[String], flag: &str) -> usize {
        args.iter().position(|a| a == flag).unwrap()
    }

    #[test]
    fn test_builder_is_deterministic() {
        let mut params = video_params();
        params.video_codec = VideoCodecChoice::H264;
        params.scale = "1280:-2".to_string();

        for mode in ConversionMode::all() {
            if *mode == ConversionMode::ImagesToVideo || *mode == ConversionMode::SubtitleBurn {
                continue;
            }
            let mut params = params.clone();
            if *mode == ConversionMode::VideoToImages {
                params.output = "frame_%04d.png".to_string();
            }
            let snapshot = params.clone();
            let first = build_plan(*mode, &params, &ffmpeg()).unwrap();
            let second = build_plan(*mode, &params, &ffmpeg()).unwrap();
            assert_eq!(first.invocations, second.invocations, "{:?}", mode);
            assert_eq!(params, snapshot);
        }
    }

    #[test]
    fn test_missing_input_is_rejected() {
        let mut params = video_params();
        params.input = "  ".to_string();
        let err = build_plan(ConversionMode::VideoToVideo, &params, &ffmpeg()).unwrap_err();
        assert!(matches!(err, BuildError::MissingInput));
    }

    #[test]
    fn test_missing_output_is_rejected() {
        let mut params = video_params();
        params.output = String::new();
        let err = build_plan(ConversionMode::VideoToAudio, &params, &ffmpeg()).unwrap_err();
        assert!(matches!(err, BuildError::MissingOutput));
    }

    #[test]
    fn test_video_copy_has_no_quality_flags() {
        let inv = build_video_to_video(&video_params(), &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-c:v", "copy"));
        assert!(!inv.args.iter().any(|a| a == "-crf" || a == "-b:v"));
        assert!(has_pair(&inv.args, "-c:a", "copy"));
        assert!(has_pair(&inv.args, "-f", "mp4"));
        assert_eq!(inv.args.first().map(String::as_str), Some("-y"));
        assert_eq!(inv.args.last().map(String::as_str), Some("out.mp4"));
        assert!(!inv.may_fail);
    }

    #[test]
    fn test_h264_default_crf() {
        let mut params = video_params();
        params.video_codec = VideoCodecChoice::H264;
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-c:v", "libx264"));
        assert!(has_pair(&inv.args, "-preset", "medium"));
        assert!(has_pair(&inv.args, "-crf", "23"));
    }

    #[test]
    fn test_crf_takes_precedence_over_bitrate() {
        let mut params = video_params();
        params.video_codec = VideoCodecChoice::Hevc;
        params.crf = "19".to_string();
        params.video_bitrate = "4000k".to_string();
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-crf", "19"));
        assert!(!inv.args.iter().any(|a| a == "4000k"));

        params.crf.clear();
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-crf", "28"));
    }

    #[test]
    fn test_bitrate_codecs() {
        let mut params = video_params();
        params.video_codec = VideoCodecChoice::Vp9;
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-b:v", "0"));

        params.video_bitrate = "2500k".to_string();
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-c:v", "libvpx-vp9"));
        assert!(has_pair(&inv.args, "-b:v", "2500k"));

        params.video_codec = VideoCodecChoice::Av1;
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-crf", "30"));
        assert!(has_pair(&inv.args, "-b:v", "0"));
    }

    #[test]
    fn test_audio_bitrate_defaults() {
        let mut params = video_params();
        let cases = [
            (AudioCodecChoice::Aac, "aac", Some("192k")),
            (AudioCodecChoice::Mp3, "libmp3lame", Some("192k")),
            (AudioCodecChoice::Opus, "libopus", Some("128k")),
            (AudioCodecChoice::Vorbis, "libvorbis", Some("160k")),
            (AudioCodecChoice::Flac, "flac", None),
            (AudioCodecChoice::PcmS16le, "pcm_s16le", None),
        ];
        for (choice, codec, bitrate) in cases {
            params.audio_codec = choice;
            let inv = build_video_to_audio(&params, &ffmpeg()).unwrap();
            assert!(has_pair(&inv.args, "-c:a", codec));
            match bitrate {
                Some(b) => assert!(has_pair(&inv.args, "-b:a", b)),
                None => assert!(!inv.args.iter().any(|a| a == "-b:a")),
            }
        }

        params.audio_codec = AudioCodecChoice::Opus;
        params.audio_bitrate = "96k".to_string();
        let inv = build_video_to_audio(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-b:a", "96k"));
    }

    #[test]
    fn test_filters_and_trim_placement() {
        let mut params = video_params();
        params.scale = "1280:720".to_string();
        params.fps = "30".to_string();
        params.start_time = "00:00:05".to_string();
        params.duration = "00:00:10".to_string();

        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-vf", "scale=1280:720,fps=30"));
        let input_pos = position(&inv.args, "-i");
        assert!(position(&inv.args, "-ss") < input_pos);
        assert!(position(&inv.args, "-t") < input_pos);

        params.scale.clear();
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-vf", "fps=30"));

        params.fps.clear();
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(!inv.args.iter().any(|a| a == "-vf"));
    }

    #[test]
    fn test_container_is_forced_with_muxer_name() {
        let mut params = video_params();
        params.output_format = "mkv".to_string();
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-f", "matroska"));

        params.output_format = "mp3".to_string();
        let inv = build_video_to_video(&params, &ffmpeg()).unwrap();
        assert!(!inv.args.iter().any(|a| a == "-f"));
    }

    #[test]
    fn test_audio_modes_share_builder() {
        let mut params = video_params();
        params.output = "out.ogg".to_string();
        params.audio_codec = AudioCodecChoice::Vorbis;
        let video = build_video_to_audio(&params, &ffmpeg()).unwrap();
        let audio = build_audio_to_audio(&params, &ffmpeg()).unwrap();
        assert_eq!(video, audio);
        assert!(video.args.iter().any(|a| a == "-vn"));
    }

    #[test]
    fn test_frame_placeholder_detection() {
        assert!(has_frame_placeholder("/tmp/frame_%04d.png"));
        assert!(has_frame_placeholder("/tmp/frame_%d.png"));
        assert!(!has_frame_placeholder("/tmp/frame.png"));
        assert!(!has_frame_placeholder("/tmp/100%.png"));
        assert!(!has_frame_placeholder("/tmp/frame_%4d.png"));
    }

    #[test]
    fn test_video_to_images_requires_placeholder() {
        let mut params = video_params();
        params.output = "/tmp/frame.png".to_string();
        let err = build_plan(ConversionMode::VideoToImages, &params, &ffmpeg()).unwrap_err();
        assert!(matches!(err, BuildError::MissingFramePlaceholder(_)));

        params.output = "/tmp/frame_%04d.png".to_string();
        params.fps = "2".to_string();
        let inv = build_video_to_images(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-vf", "fps=2"));
        assert!(has_pair(&inv.args, "-r", "2"));
    }

    #[test]
    fn test_optimized_gif_uses_two_passes() {
        let mut params = video_params();
        params.output = "/tmp/anim.gif".to_string();
        let plan = build_video_to_gif(&params, &ffmpeg()).unwrap();
        assert_eq!(plan.invocations.len(), 2);

        let palette = "/tmp/anim_palette.png";
        let first = &plan.invocations[0];
        let second = &plan.invocations[1];
        assert!(first.may_fail);
        assert!(!second.may_fail);
        assert!(has_pair(&first.args, "-vf", &format!("{},palettegen", DEFAULT_GIF_FILTER)));
        assert_eq!(first.args.last().map(String::as_str), Some(palette));
        assert!(has_pair(&second.args, "-i", palette));
        assert!(has_pair(
            &second.args,
            "-lavfi",
            &format!("{} [x]; [x][1:v] paletteuse", DEFAULT_GIF_FILTER)
        ));
        assert_eq!(second.args.last().map(String::as_str), Some("/tmp/anim.gif"));
    }

    #[test]
    fn test_simple_gif_uses_default_filter() {
        let mut params = video_params();
        params.output = "anim.gif".to_string();
        params.gif_palette = PaletteStrategy::Simple;
        let plan = build_video_to_gif(&params, &ffmpeg()).unwrap();
        assert_eq!(plan.invocations.len(), 1);
        assert!(has_pair(&plan.invocations[0].args, "-vf", DEFAULT_GIF_FILTER));

        params.fps = "10".to_string();
        let plan = build_video_to_gif(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&plan.invocations[0].args, "-vf", "fps=10"));
    }

    #[test]
    fn test_subtitle_extract_and_convert() {
        let mut params = video_params();
        params.output = "subs.srt".to_string();
        params.subtitle_stream = "2".to_string();
        let inv = build_subtitle_extract(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-map", "0:s:2"));

        params.subtitle_stream.clear();
        let inv = build_subtitle_extract(&params, &ffmpeg()).unwrap();
        assert!(has_pair(&inv.args, "-map", "0:s:0"));

        params.input = "subs.srt".to_string();
        params.output = "subs.vtt".to_string();
        let inv = build_subtitle_convert(&params, &ffmpeg()).unwrap();
        assert_eq!(inv.args, vec!["-y", "-i", "subs.srt", "subs.vtt"]);
    }

    #[test]
    fn test_subtitle_burn_requires_subtitle_file() {
        let mut params = video_params();
        let err = build_plan(ConversionMode::SubtitleBurn, &params, &ffmpeg()).unwrap_err();
        assert!(matches!(err, BuildError::MissingSubtitleFile(_)));

        params.image_source = "/definitely/not/here.srt".to_string();
        let err = build_plan(ConversionMode::SubtitleBurn, &params, &ffmpeg()).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.srt"));
    }

    #[test]
    fn test_subtitle_burn_builds_filter() {
        let mut subs = tempfile::Builder::new().suffix(".srt").tempfile().unwrap();
        writeln!(subs, "1\n00:00:00,000 --> 00:00:01,000\nhello").unwrap();

        let mut params = video_params();
        params.image_source = subs.path().to_string_lossy().to_string();
        params.scale = "640:-2".to_string();

        let inv = build_subtitle_burn(&params, &ffmpeg()).unwrap();
        let vf = &inv.args[position(&inv.args, "-vf") + 1];
        assert!(vf.starts_with("scale=640:-2,subtitles='"));
        assert!(has_pair(&inv.args, "-crf", "20"));
        assert!(has_pair(&inv.args, "-c:a", "copy"));
    }

    #[test]
    fn test_subtitles_filter_escaping() {
        assert_eq!(
            subtitles_filter(r"C:\subs\it's.srt"),
            r"subtitles='C\:/subs/it\'\''s.srt'"
        );
    }

    #[test]
    fn test_images_from_folder_are_staged_in_name_order() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("b.png"), b"second").unwrap();
        std::fs::write(source.path().join("a.png"), b"first").unwrap();
        std::fs::write(source.path().join("notes.txt"), b"ignored").unwrap();

        let mut params = video_params();
        params.input.clear();
        params.image_source = source.path().to_string_lossy().to_string();

        let plan = build_plan(ConversionMode::ImagesToVideo, &params, &ffmpeg()).unwrap();
        let staging = plan.staging_dir().unwrap().to_path_buf();

        let mut staged: Vec<String> = std::fs::read_dir(&staging)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        staged.sort();
        assert_eq!(staged, vec!["img_000001.png", "img_000002.png"]);
        assert_eq!(std::fs::read(staging.join("img_000001.png")).unwrap(), b"first");
        assert_eq!(std::fs::read(staging.join("img_000002.png")).unwrap(), b"second");

        let inv = &plan.invocations[0];
        let pattern = staging.join("img_%06d.png").to_string_lossy().to_string();
        assert!(has_pair(&inv.args, "-i", &pattern));
        assert!(has_pair(&inv.args, "-framerate", "24"));
        assert!(has_pair(&inv.args, "-crf", "23"));

        drop(plan);
        assert!(!staging.exists());
    }

    #[test]
    fn test_empty_image_folder_is_rejected() {
        let source = tempfile::tempdir().unwrap();
        let mut params = video_params();
        params.image_source = source.path().to_string_lossy().to_string();
        let err = build_plan(ConversionMode::ImagesToVideo, &params, &ffmpeg()).unwrap_err();
        assert!(matches!(err, BuildError::NoImagesFound(_)));
    }

    #[test]
    fn test_mixed_image_folder_is_rejected() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.png"), b"png").unwrap();
        std::fs::write(source.path().join("b.jpg"), b"jpg").unwrap();

        let mut params = video_params();
        params.image_source = source.path().to_string_lossy().to_string();
        let err = build_plan(ConversionMode::ImagesToVideo, &params, &ffmpeg()).unwrap_err();
        assert!(matches!(err, BuildError::MixedImageFormats(_)));
    }

    #[test]
    fn test_jpeg_and_jpg_stage_as_one_sequence() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.jpeg"), b"first").unwrap();
        std::fs::write(source.path().join("b.JPG"), b"second").unwrap();

        let (staging, pattern) = stage_image_sequence(source.path()).unwrap();
        assert_eq!(pattern, staging.path().join("img_%06d.jpg"));
        assert_eq!(std::fs::read(staging.path().join("img_000002.jpg")).unwrap(), b"second");
    }

    #[test]
    fn test_image_pattern_is_passed_through() {
        let mut params = video_params();
        params.image_source = "/shots/img_%03d.jpg".to_string();
        params.images_fps = "12".to_string();
        params.output = "out.webm".to_string();
        params.output_format = "webm".to_string();

        let plan = build_images_to_video(&params, &ffmpeg()).unwrap();
        assert!(plan.staging_dir().is_none());
        let inv = &plan.invocations[0];
        assert!(has_pair(&inv.args, "-i", "/shots/img_%03d.jpg"));
        assert!(has_pair(&inv.args, "-framerate", "12"));
        assert!(has_pair(&inv.args, "-c:v", "libvpx-vp9"));
    }

    #[test]
    fn test_images_to_video_requires_source() {
        let params = video_params();
        let err = build_plan(ConversionMode::ImagesToVideo, &params, &ffmpeg()).unwrap_err();
        assert!(matches!(err, BuildError::MissingImageSource));
    }

    #[test]
    fn test_sequence_marks_all_but_last_as_may_fail() {
        let inv = Invocation::new(&ffmpeg(), args(["-version"]));
        let plan = ConversionPlan::sequence(vec![inv.clone(), inv.clone(), inv]);
        let flags: Vec<bool> = plan.invocations.iter().map(|i| i.may_fail).collect();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn test_close_removes_palette() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("anim.gif");
        let mut params = video_params();
        params.output = output.to_string_lossy().to_string();

        let plan = build_video_to_gif(&params, &ffmpeg()).unwrap();
        let palette = palette_path(&params.output);
        std::fs::write(&palette, b"palette").unwrap();

        plan.close().unwrap();
        assert!(!palette.exists());
    }
}
