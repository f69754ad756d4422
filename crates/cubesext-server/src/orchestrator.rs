//! Slicer process orchestration
//!
//! Writes a slicer configuration for a model and database, then starts the
//! slicer server, replacing the one started previously by the same
//! orchestrator.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut orchestrator = SlicerOrchestrator::new(&config.slicer);
//! let outcome = orchestrator.start_or_restart("sqlite:///shop.db", &model_path)?;
//! println!("slicer running as pid {}", outcome.pid);
//! ```

use crate::templates;
use cubesext_core::SlicerSettings;
use minijinja::context;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Errors raised while configuring or launching the slicer
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write slicer configuration {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render slicer configuration: {0}")]
    Template(#[from] minijinja::Error),
}

/// Slicer configuration file contents
#[derive(Debug, Clone, PartialEq)]
pub struct SlicerConfig {
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub reload: bool,
    pub prettyprint: bool,
    pub json_record_limit: u32,
    pub allow_cors_origin: String,
    pub processes: u32,

    /// Store backend
    pub store_type: String,

    /// Database the store reads from
    pub db_url: String,

    /// Model document
    pub model_path: PathBuf,
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

impl SlicerConfig {
    pub fn new(settings: &SlicerSettings, db_url: impl Into<String>, model_path: impl Into<PathBuf>) -> Self {
        Self {
            log_level: settings.log_level.clone(),
            host: settings.host.clone(),
            port: settings.port,
            reload: settings.reload,
            prettyprint: settings.prettyprint,
            json_record_limit: settings.json_record_limit,
            allow_cors_origin: settings.allow_cors_origin.clone(),
            processes: settings.processes,
            store_type: "sql".to_string(),
            db_url: db_url.into(),
            model_path: model_path.into(),
        }
    }

    /// Render the INI text
    pub fn render(&self) -> Result<String, OrchestratorError> {
        let ini = templates::render(
            templates::SLICER_INI,
            context! {
                log_level => &self.log_level,
                host => &self.host,
                port => self.port,
                reload => yes_no(self.reload),
                prettyprint => yes_no(self.prettyprint),
                json_record_limit => self.json_record_limit,
                allow_cors_origin => &self.allow_cors_origin,
                processes => self.processes,
                store_type => &self.store_type,
                db_url => &self.db_url,
                model_path => self.model_path.display().to_string(),
            },
        )?;
        Ok(ini)
    }

    /// Write the configuration to a kept temporary `cubes-slicer-*.ini` file
    pub fn write_temp(&self) -> Result<PathBuf, OrchestratorError> {
        let ini = self.render()?;
        let config_error = |source: std::io::Error| OrchestratorError::Config {
            path: std::env::temp_dir(),
            source,
        };

        let mut file = tempfile::Builder::new()
            .prefix("cubes-slicer-")
            .suffix(".ini")
            .tempfile()
            .map_err(config_error)?;
        file.write_all(ini.as_bytes()).map_err(config_error)?;

        let (_, path) = file.keep().map_err(|e| config_error(e.error))?;
        Ok(path)
    }
}

/// Where a child's output stream goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Inherit,
    Null,

    /// Appended to a file
    File(PathBuf),
}

impl Capture {
    fn to_stdio(&self) -> std::io::Result<Stdio> {
        match self {
            Capture::Inherit => Ok(Stdio::inherit()),
            Capture::Null => Ok(Stdio::null()),
            Capture::File(path) => {
                let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
                Ok(Stdio::from(file))
            }
        }
    }
}

/// Fully specified child process: no shell is involved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub stdout: Capture,
    pub stderr: Capture,
}

impl ServerCommand {
    /// `<program> serve <config>`
    pub fn slicer(program: impl Into<String>, config_path: &Path) -> Self {
        Self {
            program: program.into(),
            args: vec!["serve".to_string(), config_path.display().to_string()],
            working_dir: None,
            stdout: Capture::Null,
            stderr: Capture::Inherit,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_output(mut self, stdout: Capture, stderr: Capture) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    /// Start the process in its own process group
    pub fn spawn(&self) -> Result<Child, OrchestratorError> {
        let launch_error = |source: std::io::Error| OrchestratorError::Launch {
            program: self.program.clone(),
            source,
        };

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(self.stdout.to_stdio().map_err(launch_error)?)
            .stderr(self.stderr.to_stdio().map_err(launch_error)?);

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command.spawn().map_err(launch_error)
    }
}

/// Result of a start-or-restart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Process id of the new server
    pub pid: u32,

    /// Process id of the server that was terminated, if any
    pub replaced: Option<u32>,

    /// Configuration file the server was started with
    pub config_path: PathBuf,
}

/// Owns the slicer process started last
///
/// Dropping the orchestrator leaves the server running.
pub struct SlicerOrchestrator {
    settings: SlicerSettings,
    grace: Duration,
    working_dir: Option<PathBuf>,
    stdout: Capture,
    stderr: Capture,
    current: Option<Child>,
}

impl SlicerOrchestrator {
    pub fn new(settings: &SlicerSettings) -> Self {
        Self {
            grace: Duration::from_millis(settings.restart_grace_ms),
            settings: settings.clone(),
            working_dir: None,
            stdout: Capture::Null,
            stderr: Capture::Inherit,
            current: None,
        }
    }

    /// Delay between terminating the old server and starting the new one
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_output(mut self, stdout: Capture, stderr: Capture) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    /// Write a configuration for `db_url` and `model_path` and (re)start the server
    pub fn start_or_restart(
        &mut self,
        db_url: &str,
        model_path: &Path,
    ) -> Result<LaunchOutcome, OrchestratorError> {
        let config_path = SlicerConfig::new(&self.settings, db_url, model_path).write_temp()?;
        tracing::info!(config = %config_path.display(), "slicer configuration written");
        self.restart_with(&config_path)
    }

    /// (Re)start the server with an existing configuration file
    pub fn restart_with(&mut self, config_path: &Path) -> Result<LaunchOutcome, OrchestratorError> {
        let replaced = match self.current.take() {
            Some(mut previous) => {
                let pid = previous.id();
                tracing::info!(pid, "terminating slicer process");
                terminate(&previous);
                std::thread::sleep(self.grace);
                // Reap it if it is gone; otherwise leave it behind
                let _ = previous.try_wait();
                Some(pid)
            }
            None => None,
        };

        let mut command = ServerCommand::slicer(&self.settings.command, config_path)
            .with_output(self.stdout.clone(), self.stderr.clone());
        if let Some(dir) = &self.working_dir {
            command = command.with_working_dir(dir);
        }

        let child = command.spawn()?;
        let pid = child.id();
        tracing::info!(pid, program = %command.program, "launched slicer process");
        self.current = Some(child);

        Ok(LaunchOutcome {
            pid,
            replaced,
            config_path: config_path.to_path_buf(),
        })
    }
}

/// Best-effort SIGTERM to the child's process group
#[cfg(unix)]
fn terminate(child: &Child) {
    // The child leads its own group, so its pid is the group id
    let pgid = child.id() as libc::pid_t;
    // SAFETY: killpg only sends a signal; no memory is shared
    let rc = unsafe { libc::killpg(pgid, libc::SIGTERM) };
    if rc != 0 {
        tracing::debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "could not signal slicer process group"
        );
    }
}

#[cfg(not(unix))]
fn terminate(child: &Child) {
    // No process groups: signal the child alone
    let pid = child.id();
    let status = Command::new("taskkill")
        .args(["/T", "/F", "/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    if let Err(e) = status {
        tracing::debug!(pid, error = %e, "could not terminate slicer process");
    }
}
