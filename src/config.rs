use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATA_DIR: &str = "database";
const DEFAULT_SESSION_HOURS: u64 = 24;

/// Runtime settings for the web server
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address the HTTP server binds to (`DASHBOARD_ADDR`)
    pub addr: SocketAddr,

    /// Directory holding records, profiles and accounts (`DASHBOARD_DATA_DIR`)
    pub data_dir: PathBuf,

    /// How long a login stays valid (`DASHBOARD_SESSION_HOURS`)
    pub session_lifetime: Duration,
}

impl Config {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, falling back to defaults for unset keys
    ///
    /// # Errors
    /// * A message naming the variable whose value could not be parsed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let addr = lookup("DASHBOARD_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse()
            .map_err(|_| format!("DASHBOARD_ADDR is not a socket address: {}", addr))?;

        let data_dir = lookup("DASHBOARD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let hours = match lookup("DASHBOARD_SESSION_HOURS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("DASHBOARD_SESSION_HOURS is not a number: {}", raw))?,
            None => DEFAULT_SESSION_HOURS,
        };

        Ok(Config {
            addr,
            data_dir,
            session_lifetime: Duration::from_secs(hours * 60 * 60),
        })
    }

    /// Let a command-line address override the environment.
    pub fn with_addr_arg(mut self, arg: Option<&str>) -> Result<Self, String> {
        if let Some(raw) = arg {
            self.addr = raw
                .parse()
                .map_err(|_| format!("not a socket address: {}", raw))?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.data_dir, PathBuf::from("database"));
        assert_eq!(config.session_lifetime, Duration::from_secs(86_400));
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DASHBOARD_ADDR", "0.0.0.0:8080"),
            ("DASHBOARD_DATA_DIR", "/tmp/ethanol"),
            ("DASHBOARD_SESSION_HOURS", "2"),
        ]))
        .unwrap()
        .with_addr_arg(Some("127.0.0.1:9000"))
        .unwrap();

        assert_eq!(config.addr.port(), 9000);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/ethanol"));
        assert_eq!(config.session_lifetime, Duration::from_secs(7200));
    }

    #[test]
    fn bad_values_are_reported() {
        let err = Config::from_lookup(lookup(&[("DASHBOARD_SESSION_HOURS", "soon")])).unwrap_err();
        assert!(err.contains("DASHBOARD_SESSION_HOURS"));
        assert!(Config::from_lookup(lookup(&[("DASHBOARD_ADDR", "nowhere")])).is_err());
    }
}
