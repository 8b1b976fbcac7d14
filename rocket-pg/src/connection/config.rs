//! Postgres configuration.
use std::{borrow::Cow, env::var, fmt};

use crate::{common::ByteStr, postgres::frontend::Startup};

/// Postgres connection config.
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) user: ByteStr,
    pub(crate) pass: ByteStr,
    pub(crate) socket: Option<ByteStr>,
    pub(crate) host: ByteStr,
    pub(crate) port: u16,
    pub(crate) dbname: Option<ByteStr>,
    pub(crate) params: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: ByteStr::from_static("postgres"),
            pass: ByteStr::new(),
            socket: None,
            host: ByteStr::from_static("localhost"),
            port: 5432,
            dbname: None,
            params: vec![],
        }
    }
}

impl Config {
    /// Retrieve configuration from environment variable.
    ///
    /// It reads:
    /// - `PGUSER`
    /// - `PGPASS`
    /// - `PGHOST`
    /// - `PGDATABASE`
    /// - `PGPORT`
    ///
    /// Additionally, it also read `DATABASE_URL` to provide missing value from
    /// previous variables before fallback to default value.
    pub fn from_env() -> Config {
        let url = var("DATABASE_URL").ok().and_then(|e|Config::parse_inner(e.into()).ok());
        let def = Config::default();

        macro_rules! env {
            ($name:literal,$field:ident) => {
                match (var($name),url.as_ref()) {
                    (Ok(ok),_) => ok.into(),
                    (Err(_),Some(e)) => e.$field.clone(),
                    (Err(_),None) => def.$field.clone(),
                }
            };
        }

        let user = env!("PGUSER",user);
        let pass = env!("PGPASS",pass);
        let host = env!("PGHOST",host);
        let dbname = match (var("PGDATABASE"),url.as_ref()) {
            (Ok(ok),_) => Some(ok.into()),
            (Err(_),Some(e)) => e.dbname.clone(),
            (Err(_),None) => None,
        };
        let socket = url.as_ref().and_then(|e|e.socket.clone());

        let port = match (var("PGPORT"),url.as_ref()) {
            (Ok(ok),_) => ok.parse().unwrap_or(def.port),
            (Err(_),Some(e)) => e.port,
            (Err(_),None) => def.port,
        };

        Self { user, pass, socket, host, port, dbname, params: vec![] }
    }

    /// Parse config from url.
    pub fn parse(url: &str) -> Result<Config, ParseError> {
        Self::parse_inner(ByteStr::copy_from_str(url))
    }

    /// Parse config from static string url.
    ///
    /// This is for micro optimization, see [`Bytes::from_static`][1].
    ///
    /// [1]: bytes::Bytes::from_static
    pub fn parse_static(url: &'static str) -> Result<Config, ParseError> {
        Self::parse_inner(ByteStr::from_static(url))
    }

    fn parse_inner(url: ByteStr) -> Result<Self, ParseError> {
        let mut read = url.as_str();

        macro_rules! eat {
            (@ $delim:literal,$id:tt,$len:literal) => {{
                let Some(idx) = read.find($delim) else {
                    return Err(ParseError { reason: concat!(stringify!($id), " missing").into() })
                };
                let capture = &read[..idx];
                read = &read[idx + $len..];
                url.slice_ref(capture)
            }};
            ($delim:literal,$id:tt) => {
                eat!(@ $delim,$id,1)
            };
            ($delim:literal,$id:tt,$len:literal) => {
                eat!(@ $delim,$id,$len)
            };
        }

        let scheme = eat!("://", user, 3);
        if !matches!(scheme.as_str(), "postgres" | "postgresql") {
            return Err(ParseError { reason: format!("unsupported scheme `{scheme}`").into() })
        }

        let user = eat!(':', password);
        let pass = eat!('@', host);
        let host = eat!(':', port);
        let port = eat!('/', dbname);
        let dbname = url.slice_ref(read);

        if user.is_empty() {
            return Err(ParseError { reason: "user is empty".into() })
        }

        let Ok(port) = port.parse() else {
            return Err(ParseError { reason: "invalid port".into() })
        };

        let dbname = (!dbname.is_empty()).then_some(dbname);

        Ok(Self { user, pass, host, port, dbname, socket: None, params: vec![] })
    }

    /// Set the database user name.
    pub fn user(mut self, user: &str) -> Self {
        self.user = ByteStr::copy_from_str(user);
        self
    }

    /// Set the password.
    ///
    /// Only trust authentication is supported, the password is kept for
    /// completeness of the url.
    pub fn password(mut self, pass: &str) -> Self {
        self.pass = ByteStr::copy_from_str(pass);
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = ByteStr::copy_from_str(host);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database name, defaults to the user name.
    pub fn dbname(mut self, dbname: &str) -> Self {
        self.dbname = Some(ByteStr::copy_from_str(dbname));
        self
    }

    /// Connect over the unix socket at `path` instead of `host`.
    pub fn socket(mut self, path: &str) -> Self {
        self.socket = Some(ByteStr::copy_from_str(path));
        self
    }

    /// Add a run-time parameter sent in the startup message, e.g. `application_name`.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn get_user(&self) -> &str {
        &self.user
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    /// The database to connect to, the user name if not set.
    pub fn get_dbname(&self) -> &str {
        self.dbname.as_deref().unwrap_or(&self.user)
    }

    pub(crate) fn startup(&self) -> Startup<'_> {
        Startup {
            user: &self.user,
            database: self.get_dbname(),
            params: &self.params,
        }
    }
}

impl std::str::FromStr for Config {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Error when parsing url.
#[derive(Clone)]
pub struct ParseError {
    pub(crate) reason: Cow<'static,str>,
}

impl std::error::Error for ParseError { }

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f.write_str(&self.reason)
        }
        write!(f, "failed to parse url: {}", self.reason)
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
