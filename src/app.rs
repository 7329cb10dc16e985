use crate::error::{JobError, RunError};
use crate::ffmpeg::{run_job, FFmpegWrapper, RunEvent, RunState, RunSummary};
use crate::project::{field, ConversionMode, EncodingParameters};
use crate::utils::format_elapsed;
use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, TryRecvError};
use eframe::egui;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Oldest lines are dropped past this many.
const MAX_LOG_LINES: usize = 10_000;

pub struct ErrorDialog {
    pub title: String,
    pub message: String,
}

pub struct ConverterApp {
    pub mode: ConversionMode,
    pub params: EncodingParameters,
    pub ffmpeg: FFmpegWrapper,
    pub tools_available: bool,
    pub run_state: RunState,
    pub status_message: String,
    pub log: Vec<String>,
    pub error_dialog: Option<ErrorDialog>,

    // Single worker thread that runs conversions
    runtime: Runtime,
    events: Option<Receiver<RunEvent>>,
}

impl ConverterApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, ffmpeg: FFmpegWrapper) -> Result<Self> {
        let tools_available = ffmpeg.is_available();
        let mut app = Self::with_tools(ffmpeg, tools_available)?;

        app.push_log(format!("Tip: FFmpeg binary: {}", app.ffmpeg.ffmpeg_path().display()));
        app.push_log(format!("Tip: FFprobe binary: {}", app.ffmpeg.ffprobe_path().display()));
        if !tools_available {
            tracing::warn!("ffmpeg/ffprobe self-check failed");
            app.push_log("Warning: ffmpeg/ffprobe not detected.".to_string());
        }

        Ok(app)
    }

    /// State for an already-run tool self-check.
    fn with_tools(ffmpeg: FFmpegWrapper, tools_available: bool) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("umc-worker")
            .enable_all()
            .build()
            .context("Failed to create Tokio runtime")?;

        let mode = ConversionMode::VideoToVideo;
        let mut params = EncodingParameters::default();
        params.apply_mode(mode);

        Ok(Self {
            mode,
            params,
            ffmpeg,
            tools_available,
            run_state: RunState::Idle,
            status_message: String::from("Ready"),
            log: Vec::new(),
            error_dialog: None,
            runtime,
            events: None,
        })
    }

    pub fn push_log(&mut self, line: String) {
        self.log.push(line);
        if self.log.len() > MAX_LOG_LINES {
            let excess = self.log.len() - MAX_LOG_LINES;
            self.log.drain(..excess);
        }
    }

    fn show_error(&mut self, title: &str, message: String) {
        self.error_dialog = Some(ErrorDialog {
            title: title.to_string(),
            message,
        });
    }

    pub fn set_mode(&mut self, mode: ConversionMode) {
        self.mode = mode;
        self.params.apply_mode(mode);
    }

    /// Input picker; for image sequences this picks the source folder instead.
    pub fn browse_input(&mut self) {
        if self.mode == ConversionMode::ImagesToVideo {
            if let Some(folder) = crate::ui::pick_image_source(self.mode, &self.params.subtitle_in_format) {
                self.params.image_source = folder.to_string_lossy().to_string();
            }
        } else if let Some(path) = crate::ui::pick_input(self.mode, &self.params.subtitle_in_format) {
            self.params.input = path.to_string_lossy().to_string();
            self.params.suggest_output(self.mode);
        }
    }

    pub fn browse_output(&mut self) {
        let format = self.params.output_format.trim().to_lowercase();
        if let Some(path) = crate::ui::pick_output(&self.params.output, &format) {
            self.params.output = path.to_string_lossy().to_string();
        }
    }

    pub fn browse_image_source(&mut self) {
        if let Some(path) = crate::ui::pick_image_source(self.mode, &self.params.subtitle_in_format) {
            self.params.image_source = path.to_string_lossy().to_string();
        }
    }

    /// Check what can be checked up front, then hand a snapshot of the form
    /// to the worker thread.
    pub fn start_conversion(&mut self) {
        if self.run_state.is_busy() {
            return;
        }

        // Startup self-check result; no processes are spawned on the UI thread
        if !self.tools_available {
            self.show_error(
                "ffmpeg not found",
                "ffmpeg/ffprobe are not installed or not found.\n\n\
                 Place ffmpeg & ffprobe next to this app, add them to PATH, \
                 or set UMC_FFMPEG_PATH / UMC_FFPROBE_PATH."
                    .to_string(),
            );
            return;
        }
        if self.mode.requires_input_file() && field(&self.params.input).is_none() {
            self.show_error("Missing input", "Please choose an input file.".to_string());
            return;
        }
        if field(&self.params.output).is_none() {
            self.params.suggest_output(self.mode);
        }
        if field(&self.params.output).is_none() {
            self.show_error("Missing output", "Please choose an output file.".to_string());
            return;
        }

        let (tx, rx) = crossbeam_channel::unbounded();
        self.events = Some(rx);
        self.run_state = RunState::Running { step: 0, total: 0 };
        self.status_message = self.run_state.message();

        self.runtime.spawn(run_job(
            self.mode,
            self.params.clone(),
            self.ffmpeg.ffmpeg_path().to_path_buf(),
            tx,
        ));
    }

    /// Drain worker events. Called every frame.
    pub fn poll_run(&mut self) {
        let Some(rx) = &self.events else {
            return;
        };

        let mut received = Vec::new();
        let disconnected = loop {
            match rx.try_recv() {
                Ok(event) => received.push(event),
                Err(TryRecvError::Empty) => break false,
                Err(TryRecvError::Disconnected) => break true,
            }
        };

        for event in received {
            self.handle_event(event);
        }

        if disconnected && self.run_state.is_busy() {
            // The worker went away without reporting: it panicked mid-run
            let message = "The conversion stopped unexpectedly.".to_string();
            self.push_log(format!("Error: {}", message));
            self.run_state = RunState::Failed(message.clone());
            self.status_message = self.run_state.message();
            self.show_error("Error", message);
        }

        if !self.run_state.is_busy() {
            self.events = None;
        }
    }

    fn handle_event(&mut self, event: RunEvent) {
        self.run_state.apply(&event);

        match event {
            RunEvent::Log(line) => self.push_log(line),
            RunEvent::StepStarted { .. } => {
                self.status_message = self.run_state.message();
            }
            RunEvent::Finished(Ok(summary)) => self.report_success(&summary),
            RunEvent::Finished(Err(error)) => self.report_failure(&error),
        }
    }

    fn report_success(&mut self, summary: &RunSummary) {
        let elapsed = format_elapsed(summary.elapsed);
        self.push_log(String::new());
        self.push_log(format!("Done in {}: {}", elapsed, self.params.output.trim()));
        if summary.failed_optional_steps > 0 {
            self.push_log(format!(
                "{} optional step(s) failed and were skipped.",
                summary.failed_optional_steps
            ));
        }
        self.status_message = format!("Done in {}", elapsed);
    }

    fn report_failure(&mut self, error: &JobError) {
        self.push_log(String::new());
        self.push_log(format!("Error: {}", error));
        self.status_message = self.run_state.message();

        let message = match error {
            JobError::Run(RunError::StepFailed { output, .. }) if !output.is_empty() => {
                format!("{}\n\n{}", error, output.join("\n"))
            }
            _ => error.to_string(),
        };
        let title = if error.processes_ran() {
            "Conversion failed"
        } else {
            "Cannot start conversion"
        };
        self.show_error(title, message);
    }
}

impl eframe::App for ConverterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_run();

        crate::ui::render_main_window(self, ctx);

        // Keep draining output while the worker is busy
        if self.run_state.is_busy() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn app(tools_available: bool) -> ConverterApp {
        let ffmpeg = FFmpegWrapper::with_paths(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("/nonexistent/ffprobe"),
        );
        let mut app = ConverterApp::with_tools(ffmpeg, tools_available).unwrap();
        app.params.input = "in.mp4".to_string();
        app.params.output = "out.mp4".to_string();
        app
    }

    #[test]
    fn test_convert_uses_startup_tool_check() {
        // The paths do not exist, so a fresh check would fail
        let mut app = app(true);
        app.start_conversion();
        assert!(app.error_dialog.is_none());
        assert!(app.run_state.is_busy());
        assert!(app.events.is_some());
    }

    #[test]
    fn test_convert_refused_without_tools() {
        let mut app = app(false);
        app.start_conversion();
        assert_eq!(app.error_dialog.as_ref().map(|d| d.title.as_str()), Some("ffmpeg not found"));
        assert!(!app.run_state.is_busy());
        assert!(app.events.is_none());
    }

    #[test]
    fn test_missing_input_is_reported_before_spawning() {
        let mut app = app(true);
        app.params.input.clear();
        app.start_conversion();
        assert_eq!(app.error_dialog.as_ref().map(|d| d.title.as_str()), Some("Missing input"));
        assert!(!app.run_state.is_busy());
    }

    #[test]
    fn test_log_is_capped() {
        let mut app = app(true);
        for i in 0..MAX_LOG_LINES + 5 {
            app.push_log(i.to_string());
        }
        assert_eq!(app.log.len(), MAX_LOG_LINES);
        assert_eq!(app.log.first().map(String::as_str), Some("5"));
    }
}
