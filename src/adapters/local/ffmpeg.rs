//! `TranscodeEngine` backed by the system ffmpeg binary.
//!
//! Scratch files live in a private temporary directory that doubles as the
//! working directory of every command, so argument lists can refer to scratch
//! names directly.

use crate::config::EngineConfig;
use crate::ports::engine::{validate_name, EngineError, EngineLog, TranscodeEngine};
use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::broadcast;

/// Lines of diagnostic output kept for error messages.
const LOG_TAIL: usize = 20;
const LOG_CHANNEL_CAPACITY: usize = 256;

pub struct FfmpegEngine {
    binary: PathBuf,
    scratch: TempDir,
    logs: broadcast::Sender<EngineLog>,
}

impl FfmpegEngine {
    /// Check that ffmpeg runs, then set up the scratch directory.
    pub async fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        if !is_ffmpeg_available(&config.ffmpeg_bin).await {
            return Err(EngineError::Unavailable(format!(
                "'{}' could not be executed (is ffmpeg installed and on PATH?)",
                config.ffmpeg_bin.display()
            )));
        }
        Self::with_scratch(config)
    }

    /// Set up the scratch directory without probing the binary.
    pub fn with_scratch(config: &EngineConfig) -> Result<Self, EngineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("reelwright-");
        let scratch = match &config.scratch_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|source| EngineError::Io {
                    name: parent.display().to_string(),
                    source,
                })?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(|source| EngineError::Io {
            name: String::from("<scratch>"),
            source,
        })?;

        let (logs, _) = broadcast::channel(LOG_CHANNEL_CAPACITY);
        tracing::debug!(dir = %scratch.path().display(), "ffmpeg scratch directory ready");

        Ok(Self {
            binary: config.ffmpeg_bin.clone(),
            scratch,
            logs,
        })
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, EngineError> {
        validate_name(name)?;
        Ok(self.scratch.path().join(name))
    }

    fn publish(&self, line: &str, tail: &mut VecDeque<String>) {
        let Some(entry) = parse_log_line(line) else {
            return;
        };
        if let EngineLog::Message(message) = &entry {
            if tail.len() == LOG_TAIL {
                tail.pop_front();
            }
            tail.push_back(message.clone());
        }
        // Nobody listening is fine.
        let _ = self.logs.send(entry);
    }
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        let path = self.path_for(name)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|source| EngineError::Io {
                name: name.to_string(),
                source,
            })
    }

    async fn read_file(&self, name: &str) -> Result<Bytes, EngineError> {
        let path = self.path_for(name)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|source| EngineError::Io {
                name: name.to_string(),
                source,
            })?;
        Ok(Bytes::from(data))
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(EngineError::Io {
                name: name.to_string(),
                source,
            }),
        }
    }

    async fn exec(&self, args: &[String]) -> Result<(), EngineError> {
        tracing::debug!(args = %args.join(" "), "running ffmpeg");

        let mut child = Command::new(&self.binary)
            .current_dir(self.scratch.path())
            .args(["-hide_banner", "-nostdin", "-nostats", "-progress", "pipe:2"])
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            // Dropping the future (cancellation) must not leave ffmpeg running.
            .kill_on_drop(true)
            .spawn()
            .map_err(EngineError::Spawn)?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineError::Spawn(io::Error::other("stderr was not captured")))?;

        let mut reader = BufReader::new(stderr);
        let mut tail = VecDeque::with_capacity(LOG_TAIL);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(EngineError::Spawn)?;
            if read == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&buf);
            for line in text.split(['\r', '\n']) {
                self.publish(line, &mut tail);
            }
        }

        let status = child.wait().await.map_err(EngineError::Spawn)?;
        if !status.success() {
            return Err(EngineError::Exec {
                status: status.to_string(),
                log: Vec::from(tail).join("\n"),
            });
        }
        Ok(())
    }

    fn subscribe_logs(&self) -> broadcast::Receiver<EngineLog> {
        self.logs.subscribe()
    }
}

pub async fn is_ffmpeg_available(binary: &Path) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

fn out_time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^out_time=(\d+):(\d{2}):(\d{2}(?:\.\d+)?)$").expect("static regex")
    })
}

fn progress_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_0-9]+=\S*$").expect("static regex"))
}

/// Classify one stderr line. `-progress` key/value noise other than the
/// output position is dropped.
pub(crate) fn parse_log_line(line: &str) -> Option<EngineLog> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Some(caps) = out_time_re().captures(line) {
        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps[2].parse().ok()?;
        let secs: f64 = caps[3].parse().ok()?;
        return Some(EngineLog::Progress {
            seconds: hours * 3600.0 + minutes * 60.0 + secs,
            line: line.to_string(),
        });
    }
    if progress_key_re().is_match(line) {
        return None;
    }
    Some(EngineLog::Message(line.to_string()))
}
