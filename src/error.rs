use std::io;
use std::path::PathBuf;

/// Problems detected before any FFmpeg process is launched.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Please choose an input file.")]
    MissingInput,

    #[error("Please choose an output file.")]
    MissingOutput,

    #[error("For 'Video → Images', set an output with a frame number, e.g. /path/frame_%04d.png (got '{0}')")]
    MissingFramePlaceholder(String),

    #[error("Choose an image folder or a pattern such as /path/img_%03d.png.")]
    MissingImageSource,

    #[error("No PNG/JPG images found in {}", .0.display())]
    NoImagesFound(PathBuf),

    #[error("{} mixes PNG and JPG images; keep one image type per folder", .0.display())]
    MixedImageFormats(PathBuf),

    #[error("Failed to stage images: {0}")]
    Staging(#[from] io::Error),

    #[error("Pick a subtitle file to burn (use the Images section's 'Browse…' to select .srt/.ass); not found: '{0}'")]
    MissingSubtitleFile(String),
}

/// A fatal step failed; earlier steps of the run may already have executed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("ffmpeg exited with {}", exit_label(.code))]
    StepFailed {
        code: Option<i32>,
        /// Last lines the process printed before exiting.
        output: Vec<String>,
    },

    #[error("I/O error while reading process output: {0}")]
    Io(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// Outcome of a failed conversion job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Precondition(#[from] BuildError),

    #[error(transparent)]
    Run(#[from] RunError),
}

impl JobError {
    /// Whether any FFmpeg process may have run before the failure.
    pub fn processes_ran(&self) -> bool {
        matches!(self, JobError::Run(_))
    }
}
