use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const FFMPEG_PATH_ENV: &str = "UMC_FFMPEG_PATH";
pub const FFPROBE_PATH_ENV: &str = "UMC_FFPROBE_PATH";

/// Locations of the FFmpeg executables used for conversions.
#[derive(Debug, Clone)]
pub struct FFmpegWrapper {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FFmpegWrapper {
    /// Find both tools: environment override, next to this executable,
    /// on `PATH`, and finally the bare name.
    pub fn discover() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        Self {
            ffmpeg_path: locate_tool(
                "ffmpeg",
                std::env::var_os(FFMPEG_PATH_ENV),
                exe_dir.as_deref(),
            ),
            ffprobe_path: locate_tool(
                "ffprobe",
                std::env::var_os(FFPROBE_PATH_ENV),
                exe_dir.as_deref(),
            ),
        }
    }

    #[cfg(test)]
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &Path {
        &self.ffprobe_path
    }

    /// Check that both tools start and answer `-version` successfully
    pub fn is_available(&self) -> bool {
        responds_to_version(&self.ffmpeg_path) && responds_to_version(&self.ffprobe_path)
    }
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Resolve one tool. An explicit override is taken as is.
pub fn locate_tool(name: &str, override_path: Option<OsString>, exe_dir: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    if let Some(dir) = exe_dir {
        let bundled = dir.join(executable_name(name));
        if bundled.exists() {
            tracing::debug!("Using bundled {}: {}", name, bundled.display());
            return bundled;
        }
    }

    match which::which(name) {
        Ok(path) => path,
        Err(_) => {
            tracing::warn!("{} not found next to the application or on PATH", name);
            PathBuf::from(name)
        }
    }
}

fn responds_to_version(program: &Path) -> bool {
    let mut cmd = Command::new(program);
    cmd.arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x08000000;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    cmd.status().map(|s| s.success()).unwrap_or(false)
}
