use std::{
    io,
    path::PathBuf,
    process::{Command, ExitStatus},
};

use tracing::debug;

/// `%A|%a|%T|%C|%m`: job id, account, state, allocated cpus, allocated memory
pub const SQUEUE_FORMAT: &str = "%A|%a|%T|%C|%m";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("could not run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` failed with {status}: {stderr}")]
    Failed { program: String, status: ExitStatus, stderr: String },
    #[error("could not read queue listing from {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Something that produces a raw queue listing, one `id|account|state|cpus|memoryM` per line.
///
/// Any error is meant to fail the whole scrape; there are no partial results.
pub trait QueueSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

/// Runs `squeue` for all jobs in all partitions.
#[derive(Debug, Clone)]
pub struct Squeue {
    program: String,
}

impl Squeue {
    pub fn new(program: impl Into<String>) -> Self {
        Squeue { program: program.into() }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-a", "-r", "-h", "--noconvert"]).args(["-o", SQUEUE_FORMAT]);
        cmd
    }
}

impl Default for Squeue {
    fn default() -> Self {
        Self::new("squeue")
    }
}

impl QueueSource for Squeue {
    /// Blocks until `squeue` exits. No timeout.
    #[tracing::instrument(skip(self), fields(program = %self.program))]
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        let output = self.command().output().map_err(|source| FetchError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(FetchError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(bytes = output.stdout.len(), "squeue finished");
        Ok(output.stdout)
    }
}

/// Re-reads a saved queue listing on every fetch. Useful to replay captured `squeue` output.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
}

impl QueueSource for FileSource {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        std::fs::read(&self.path).map_err(|source| FetchError::Read { path: self.path.clone(), source })
    }
}

/// Always returns the same listing.
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub Vec<u8>);

impl QueueSource for StaticSource {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        Ok(self.0.clone())
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use std::io::Write as _;

    use color_eyre::Result;

    use super::*;

    #[test]
    fn Squeue__command__arguments() {
        let cmd = Squeue::default().command();
        assert_eq!(cmd.get_program(), "squeue");
        let args = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect::<Vec<_>>();
        assert_eq!(args, ["-a", "-r", "-h", "--noconvert", "-o", "%A|%a|%T|%C|%m"]);
    }

    #[test]
    fn Squeue__fetch__missing_program() {
        let err = Squeue::new("/nonexistent/squeue-binary").fetch().unwrap_err();
        assert!(matches!(err, FetchError::Spawn { .. }), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn Squeue__fetch__nonzero_exit() {
        // `false` ignores its arguments and exits with 1
        let err = Squeue::new("false").fetch().unwrap_err();
        assert!(matches!(err, FetchError::Failed { .. }), "{err:?}");
    }

    #[test]
    fn FileSource__fetch() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"1|a|RUNNING|1|1M\n")?;
        let source = FileSource { path: file.path().to_owned() };
        assert_eq!(source.fetch()?, b"1|a|RUNNING|1|1M\n");

        let missing = FileSource { path: PathBuf::from("/nonexistent/queue.txt") };
        assert!(matches!(missing.fetch(), Err(FetchError::Read { .. })));
        Ok(())
    }
}
