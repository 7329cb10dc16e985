use crate::project::{ConversionMode, SUBTITLE_FORMATS};
use std::path::{Path, PathBuf};

/// Extensions offered by the input picker for media files
pub const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", "wmv", "flv", "m4v", "ts", "mpg", "3gp",
    "mp3", "wav", "aac", "flac", "ogg", "m4a", "wma", "opus", "aiff", "amr",
];

/// Subtitle extensions for a picker filter, with `preferred` first.
pub fn subtitle_extensions(preferred: &str) -> Vec<&str> {
    let preferred = preferred.trim();
    let mut extensions = Vec::with_capacity(SUBTITLE_FORMATS.len() + 1);
    if !preferred.is_empty() {
        extensions.push(preferred);
    }
    extensions.extend(
        SUBTITLE_FORMATS
            .iter()
            .copied()
            .filter(|ext| !ext.eq_ignore_ascii_case(preferred)),
    );
    extensions
}

/// Open the appropriate picker for the main input of `mode`.
///
/// Subtitle modes that read a subtitle file filter on subtitle extensions,
/// leading with the selected input subtitle format.
pub fn pick_input(mode: ConversionMode, subtitle_in_format: &str) -> Option<PathBuf> {
    let dialog = rfd::FileDialog::new().set_title("Choose input file");
    let dialog = match mode {
        ConversionMode::SubtitleConvert => {
            dialog.add_filter("Subtitles", subtitle_extensions(subtitle_in_format).as_slice())
        }
        _ => dialog.add_filter("Media", MEDIA_EXTENSIONS),
    };
    dialog.add_filter("All Files", &["*"]).pick_file()
}

/// Pick the image folder, or the subtitle file to burn in.
pub fn pick_image_source(mode: ConversionMode, subtitle_in_format: &str) -> Option<PathBuf> {
    if mode == ConversionMode::SubtitleBurn {
        rfd::FileDialog::new()
            .set_title("Choose subtitle file to burn")
            .add_filter("Subtitles", subtitle_extensions(subtitle_in_format).as_slice())
            .pick_file()
    } else {
        rfd::FileDialog::new()
            .set_title("Choose images folder")
            .pick_folder()
    }
}

/// Ask for an output path; the result always carries `format`'s extension.
pub fn pick_output(current: &str, format: &str) -> Option<PathBuf> {
    let initial = if current.trim().is_empty() {
        format!("output.{}", format)
    } else {
        current.trim().to_string()
    };
    let file_name = Path::new(&initial)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    rfd::FileDialog::new()
        .set_title("Save as")
        .set_file_name(file_name)
        .add_filter(format.to_uppercase(), &[format])
        .add_filter("All Files", &["*"])
        .save_file()
        .map(|path| ensure_extension(&path, format))
}

/// Replace the extension of `path` unless it already matches `format`.
pub fn ensure_extension(path: &Path, format: &str) -> PathBuf {
    let matches = path
        .extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(format))
        .unwrap_or(false);

    if matches {
        path.to_path_buf()
    } else {
        path.with_extension(format)
    }
}

/// Output path suggested for an input: a numbered frame pattern when
/// extracting images, otherwise the input stem with the new format.
pub fn suggest_output_path(input: &str, mode: ConversionMode, format: &str) -> Option<String> {
    if input.is_empty() || format.is_empty() {
        return None;
    }

    let input = Path::new(input);
    let stem = input.file_stem()?.to_string_lossy().to_string();
    let parent = input.parent().unwrap_or_else(|| Path::new(""));

    let file_name = if mode == ConversionMode::VideoToImages {
        format!("{}_frame_%04d.png", stem)
    } else {
        format!("{}.{}", stem, format)
    };

    Some(parent.join(file_name).to_string_lossy().to_string())
}
