//! In-memory engine and fetcher doubles for pipeline tests.
//!
//! `FakeEngine` understands the three command shapes the pipeline issues and
//! writes a readable description of the result, so tests can assert on what
//! ended up in the final output and in which order.

use crate::ports::engine::{validate_name, EngineError, EngineLog, TranscodeEngine};
use crate::ports::fetcher::{FetchError, MockAssetFetcher};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::broadcast;

pub struct FakeEngine {
    files: Mutex<BTreeMap<String, Bytes>>,
    execs: Mutex<Vec<Vec<String>>>,
    failing_outputs: Mutex<HashSet<String>>,
    logs: broadcast::Sender<EngineLog>,
}

impl FakeEngine {
    pub fn new() -> Self {
        let (logs, _) = broadcast::channel(64);
        Self {
            files: Mutex::new(BTreeMap::new()),
            execs: Mutex::new(Vec::new()),
            failing_outputs: Mutex::new(HashSet::new()),
            logs,
        }
    }

    /// Make every command writing `output` fail.
    pub fn fail_output(&self, output: &str) {
        self.failing_outputs
            .lock()
            .unwrap()
            .insert(output.to_string());
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn execs(&self) -> Vec<Vec<String>> {
        self.execs.lock().unwrap().clone()
    }

    fn content(&self, name: &str) -> Result<String, EngineError> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .map(|data| String::from_utf8_lossy(data).into_owned())
            .ok_or_else(|| EngineError::Exec {
                status: "exit status: 1".into(),
                log: format!("{}: No such file or directory", name),
            })
    }

    fn simulate(&self, args: &[String]) -> Result<(String, String), EngineError> {
        let output = args.last().cloned().unwrap_or_default();
        let value_after = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
                .unwrap_or_default()
        };
        let inputs: Vec<&String> = args
            .iter()
            .enumerate()
            .filter(|(_, a)| *a == "-i")
            .filter_map(|(i, _)| args.get(i + 1))
            .collect();

        let rendered = match value_after("-f").as_str() {
            "lavfi" => format!("silence({})", value_after("-t")),
            "concat" => {
                let manifest = self.content(inputs[0])?;
                let clips = manifest
                    .lines()
                    .filter_map(|line| line.strip_prefix("file '"))
                    .filter_map(|line| line.strip_suffix('\''))
                    .map(|name| self.content(name))
                    .collect::<Result<Vec<_>, _>>()?;
                clips.join("|")
            }
            _ => {
                let streams = inputs
                    .iter()
                    .map(|name| self.content(name))
                    .collect::<Result<Vec<_>, _>>()?;
                format!("clip({})@{}", streams.join("+"), value_after("-t"))
            }
        };
        Ok((output, rendered))
    }
}

#[async_trait]
impl TranscodeEngine for FakeEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), EngineError> {
        validate_name(name)?;
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), Bytes::copy_from_slice(data));
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Bytes, EngineError> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::Io {
                name: name.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
    }

    async fn delete_file(&self, name: &str) -> Result<(), EngineError> {
        self.files.lock().unwrap().remove(name);
        Ok(())
    }

    async fn exec(&self, args: &[String]) -> Result<(), EngineError> {
        self.execs.lock().unwrap().push(args.to_vec());
        let _ = self
            .logs
            .send(EngineLog::Message(format!("fake ffmpeg {}", args.join(" "))));

        let output = args.last().cloned().unwrap_or_default();
        if self.failing_outputs.lock().unwrap().contains(&output) {
            return Err(EngineError::Exec {
                status: "exit status: 1".into(),
                log: format!("{}: simulated encoder failure", output),
            });
        }

        let (output, rendered) = self.simulate(args)?;
        self.files
            .lock()
            .unwrap()
            .insert(output, Bytes::from(rendered));
        Ok(())
    }

    fn subscribe_logs(&self) -> broadcast::Receiver<EngineLog> {
        self.logs.subscribe()
    }
}

/// Fetcher answering from a fixed table; unknown URLs are 404s.
pub fn table_fetcher(entries: &[(&str, Result<&'static str, FetchError>)]) -> MockAssetFetcher {
    let table: HashMap<String, Result<Bytes, FetchError>> = entries
        .iter()
        .map(|(url, result)| {
            (
                url.to_string(),
                result.clone().map(|body| Bytes::from_static(body.as_bytes())),
            )
        })
        .collect();

    let mut fetcher = MockAssetFetcher::new();
    fetcher
        .expect_fetch()
        .returning(move |url, _| table.get(url).cloned().unwrap_or(Err(FetchError::Status(404))));
    fetcher
}
