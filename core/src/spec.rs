//! Job description handed over by whoever builds the encoder command line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Immutable description of one encoding job.
///
/// The supervisor never interprets the arguments; it only turns them into a
/// process launch. A spec is moved into the launcher and consumed there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSpec {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub envs: BTreeMap<String, String>,

    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl StreamSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Reads a job file: `program`, optional `args`, `envs` and `cwd`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Program followed by its arguments, for logging and for forwarding to a wrapper.
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_command_line() {
        let spec = StreamSpec::new("ffmpeg")
            .arg("-n")
            .args(["-i", "in.mp4", "out.mp4"])
            .env("AV_LOG_FORCE_NOCOLOR", "1");

        assert_eq!(
            spec.command_line(),
            vec!["ffmpeg", "-n", "-i", "in.mp4", "out.mp4"]
        );
        assert_eq!(spec.envs.get("AV_LOG_FORCE_NOCOLOR").map(String::as_str), Some("1"));
    }

    #[test]
    fn deserializes_from_toml_with_defaults() {
        let spec: StreamSpec = toml::from_str(r#"program = "ffmpeg""#).unwrap();
        assert_eq!(spec, StreamSpec::new("ffmpeg"));
    }

    #[test]
    fn loads_job_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(
            &path,
            r#"
program = "ffmpeg"
args = ["-i", "in.mp4", "out.mkv"]
cwd = "/srv/media"

[envs]
AV_LOG_FORCE_NOCOLOR = "1"
"#,
        )
        .unwrap();

        let spec = StreamSpec::load(&path).unwrap();
        assert_eq!(
            spec,
            StreamSpec::new("ffmpeg")
                .args(["-i", "in.mp4", "out.mkv"])
                .env("AV_LOG_FORCE_NOCOLOR", "1")
                .current_dir("/srv/media")
        );
    }

    #[test]
    fn missing_job_file_is_a_read_error() {
        let err = StreamSpec::load(Path::new("/nonexistent/job.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
