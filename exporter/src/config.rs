use std::{net::SocketAddr, path::Path};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_SQUEUE: &str = "squeue";
const ENV_PREFIX: &str = "SLURM_EXPORTER";

/// What to do when the job queue can't be fetched during a scrape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchErrorPolicy {
    /// answer the scrape with a 500, keep serving
    #[default]
    FailScrape,
    /// terminate the process
    Exit,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub listen_address: SocketAddr,
    /// path or name of the `squeue` binary
    pub squeue: String,
    pub on_fetch_error: FetchErrorPolicy,
}

impl Settings {
    /// Defaults, then `file` (if given, must exist), then `SLURM_EXPORTER_*` environment variables.
    pub fn new(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::with_environment(file, Environment::with_prefix(ENV_PREFIX))
    }

    fn with_environment(file: Option<&Path>, environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("listen_address", DEFAULT_LISTEN_ADDRESS)?
            .set_default("squeue", DEFAULT_SQUEUE)?
            .set_default("on_fetch_error", "fail-scrape")?;
        if let Some(file) = file {
            builder = builder.add_source(File::from(file));
        }

        builder.add_source(environment).build()?.try_deserialize()
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use std::io::Write as _;

    use color_eyre::Result;

    use super::*;

    #[test]
    fn Settings__new__defaults() -> Result<()> {
        let settings = Settings::new(None)?;
        assert_eq!(settings.listen_address, "0.0.0.0:8080".parse::<SocketAddr>()?);
        assert_eq!(settings.squeue, "squeue");
        assert_eq!(settings.on_fetch_error, FetchErrorPolicy::FailScrape);
        Ok(())
    }

    #[test]
    fn Settings__new__from_file() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, r#"listen_address = "127.0.0.1:9341""#)?;
        writeln!(file, r#"squeue = "/opt/slurm/bin/squeue""#)?;
        writeln!(file, r#"on_fetch_error = "exit""#)?;

        let settings = Settings::new(Some(file.path()))?;
        assert_eq!(settings.listen_address, "127.0.0.1:9341".parse::<SocketAddr>()?);
        assert_eq!(settings.squeue, "/opt/slurm/bin/squeue");
        assert_eq!(settings.on_fetch_error, FetchErrorPolicy::Exit);
        Ok(())
    }

    #[test]
    fn Settings__new__invalid_policy() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, r#"on_fetch_error = "retry""#)?;
        assert!(Settings::new(Some(file.path())).is_err());
        Ok(())
    }

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert(key.to_string(), value.to_string());
        }
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn Settings__with_environment__overrides_file() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, r#"listen_address = "127.0.0.1:9341""#)?;
        writeln!(file, r#"squeue = "/opt/slurm/bin/squeue""#)?;

        let env = environment(&[
            ("SLURM_EXPORTER_LISTEN_ADDRESS", "10.0.0.1:9100"),
            ("SLURM_EXPORTER_ON_FETCH_ERROR", "exit"),
        ]);
        let settings = Settings::with_environment(Some(file.path()), env)?;
        assert_eq!(settings.listen_address, "10.0.0.1:9100".parse::<SocketAddr>()?);
        assert_eq!(settings.squeue, "/opt/slurm/bin/squeue");
        assert_eq!(settings.on_fetch_error, FetchErrorPolicy::Exit);
        Ok(())
    }

    #[test]
    fn Settings__with_environment__bad_address() {
        let env = environment(&[("SLURM_EXPORTER_LISTEN_ADDRESS", "not an address")]);
        assert!(Settings::with_environment(None, env).is_err());
    }

    #[test]
    fn Settings__new__missing_file() {
        assert!(Settings::new(Some(Path::new("/nonexistent/exporter.toml"))).is_err());
    }
}
