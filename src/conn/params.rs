//! Connection parameters and DSN parsing.
//!
//! Kept intentionally small: no TLS, no network group, no redirect chain —
//! this protocol has none of those.

use crate::error::{FourDError, FourDResult};

/// The default TCP port of a 4D server.
pub const DEFAULT_PORT: u16 = 19812;

/// All information necessary to open a new connection to a 4D server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConnectParams {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) user: String,
    pub(crate) password: String,
    pub(crate) database: Option<String>,
}

impl ConnectParams {
    /// Builds `ConnectParams` from a semicolon-delimited DSN (`key=value;...`)
    /// overlaid with explicit keyword arguments, which take precedence.
    ///
    /// Recognized DSN keys: `host`, `port`, `user`, `password`, `database`.
    /// Unset values default to empty strings (host/user/password/database)
    /// or [`DEFAULT_PORT`].
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        dsn: Option<&str>,
        host: Option<&str>,
        port: Option<u16>,
        user: Option<&str>,
        password: Option<&str>,
        database: Option<&str>,
    ) -> FourDResult<Self> {
        let dsn_values = match dsn {
            Some(dsn) => parse_dsn(dsn)?,
            None => DsnValues::default(),
        };
        let host = host
            .map(str::to_string)
            .or(dsn_values.host)
            .unwrap_or_default();
        let port = port
            .or(dsn_values.port)
            .unwrap_or(DEFAULT_PORT);
        let user = user
            .map(str::to_string)
            .or(dsn_values.user)
            .unwrap_or_default();
        let password = password
            .map(str::to_string)
            .or(dsn_values.password)
            .unwrap_or_default();
        let database = database
            .map(str::to_string)
            .or(dsn_values.database);
        Ok(Self {
            host,
            port,
            user,
            password,
            database,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

#[derive(Default)]
struct DsnValues {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

fn parse_dsn(dsn: &str) -> FourDResult<DsnValues> {
    let mut values = DsnValues::default();
    for pair in dsn.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            FourDError::interface(format!("malformed DSN entry (expected key=value): {pair}"))
        })?;
        match key.trim() {
            "host" => values.host = Some(value.trim().to_string()),
            "port" => {
                values.port = Some(value.trim().parse().map_err(|_| {
                    FourDError::interface(format!("malformed DSN port: {value}"))
                })?);
            }
            "user" => values.user = Some(value.trim().to_string()),
            "password" => values.password = Some(value.trim().to_string()),
            "database" => values.database = Some(value.trim().to_string()),
            other => {
                return Err(FourDError::interface(format!(
                    "unrecognized DSN key: {other}"
                )))
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsn_parses_all_keys() {
        let params = ConnectParams::build(
            Some("host=db.example.com;port=19813;user=alice;password=secret;database=Main"),
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(params.host(), "db.example.com");
        assert_eq!(params.port(), 19813);
        assert_eq!(params.user(), "alice");
        assert_eq!(params.database(), Some("Main"));
    }

    #[test]
    fn explicit_args_override_dsn() {
        let params = ConnectParams::build(
            Some("host=db.example.com;user=alice"),
            Some("override.example.com"),
            None,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(params.host(), "override.example.com");
        assert_eq!(params.user(), "alice");
    }

    #[test]
    fn default_port_is_19812() {
        let params = ConnectParams::build(None, Some("h"), None, None, None, None).unwrap();
        assert_eq!(params.port(), DEFAULT_PORT);
    }
}
