//! Connection strings.
//!
//! ```text
//! mongodb://[user[:password]@]host[:port][,host[:port]...][/database][?key=value&...]
//! mongodb+srv://[user[:password]@]host[/database][?key=value&...]
//! memory://name[/database]
//! ```
//!
//! [ConnectionString::parse] validates the layout and splits it into parts.
//! The database segment is what [`MongoRepositoryBuilder`](crate::repository::MongoRepositoryBuilder)
//! uses when no database is set explicitly.

use crate::common::{MEMORY_SCHEME, MONGODB_SCHEME, MONGODB_SRV_SCHEME};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

#[derive(Clone, PartialEq, Eq)]
pub struct HostAddress {
    host: String,
    port: Option<u16>,
}

impl HostAddress {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl Display for HostAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => write!(f, "{}", self.host),
        }
    }
}

impl Debug for HostAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// A parsed connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    raw: String,
    scheme: String,
    username: Option<String>,
    password: Option<String>,
    hosts: Vec<HostAddress>,
    database: Option<String>,
    options: BTreeMap<String, String>,
}

impl ConnectionString {
    pub fn parse(value: &str) -> RepoResult<ConnectionString> {
        let (scheme, rest) = value
            .split_once("://")
            .ok_or_else(|| invalid(value, "missing scheme separator '://'"))?;
        if scheme != MONGODB_SCHEME && scheme != MONGODB_SRV_SCHEME && scheme != MEMORY_SCHEME {
            return Err(invalid(value, &format!("unsupported scheme '{}'", scheme)));
        }

        let (location, query) = match rest.split_once('?') {
            Some((location, query)) => (location, Some(query)),
            None => (rest, None),
        };
        let (authority, path) = match location.split_once('/') {
            Some((authority, path)) => (authority, Some(path)),
            None => (location, None),
        };

        let (credentials, host_list) = match authority.rsplit_once('@') {
            Some((credentials, hosts)) => (Some(credentials), hosts),
            None => (None, authority),
        };

        let (username, password) = match credentials {
            Some(credentials) => {
                let (user, password) = match credentials.split_once(':') {
                    Some((user, password)) => (user, Some(password)),
                    None => (credentials, None),
                };
                if user.is_empty() {
                    return Err(invalid(value, "empty user name"));
                }
                let password = match password {
                    Some(password) => Some(percent_decode(password).ok_or_else(|| {
                        invalid(value, "malformed percent encoding in password")
                    })?),
                    None => None,
                };
                let user = percent_decode(user)
                    .ok_or_else(|| invalid(value, "malformed percent encoding in user name"))?;
                (Some(user), password)
            }
            None => (None, None),
        };

        let hosts = host_list
            .split(',')
            .map(|host| parse_host(value, host))
            .collect::<RepoResult<Vec<_>>>()?;
        if scheme == MONGODB_SRV_SCHEME && (hosts.len() != 1 || hosts[0].port.is_some()) {
            return Err(invalid(value, "an srv connection string takes one host without port"));
        }

        let database = match path {
            Some(path) if !path.is_empty() => {
                if path.contains('/') || path.contains(' ') {
                    return Err(invalid(value, &format!("invalid database name '{}'", path)));
                }
                Some(path.to_string())
            }
            _ => None,
        };

        let mut options = BTreeMap::new();
        if let Some(query) = query {
            for pair in query.split('&').filter(|pair| !pair.is_empty()) {
                let (key, option) = pair
                    .split_once('=')
                    .ok_or_else(|| invalid(value, &format!("option '{}' has no value", pair)))?;
                if key.is_empty() {
                    return Err(invalid(value, "empty option name"));
                }
                options.insert(key.to_ascii_lowercase(), option.to_string());
            }
        }

        Ok(ConnectionString {
            raw: value.to_string(),
            scheme: scheme.to_string(),
            username,
            password,
            hosts,
            database,
            options,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn is_srv(&self) -> bool {
        self.scheme == MONGODB_SRV_SCHEME
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn hosts(&self) -> &[HostAddress] {
        &self.hosts
    }

    /// The host list rendered as `host[:port],...`.
    pub fn hosts_key(&self) -> String {
        self.hosts
            .iter()
            .map(|host| host.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Option names are matched case-insensitively.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(&key.to_ascii_lowercase()).map(String::as_str)
    }
}

impl FromStr for ConnectionString {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionString::parse(s)
    }
}

impl Display for ConnectionString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

// keeps the password out of logs
impl Debug for ConnectionString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionString")
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("hosts", &self.hosts)
            .field("database", &self.database)
            .field("options", &self.options)
            .finish()
    }
}

fn invalid(value: &str, reason: &str) -> RepoError {
    // the raw string may carry a password
    let shown = match value.rsplit_once('@') {
        Some((_, rest)) => format!("****@{}", rest),
        None => value.to_string(),
    };
    log::error!("Invalid connection string {}: {}", shown, reason);
    RepoError::new(
        &format!("Invalid connection string: {}", reason),
        ErrorKind::InvalidArgument,
    )
}

fn parse_host(value: &str, host: &str) -> RepoResult<HostAddress> {
    if host.is_empty() {
        return Err(invalid(value, "empty host"));
    }

    let (name, port) = if let Some(bracketed) = host.strip_prefix('[') {
        let (name, rest) = bracketed
            .split_once(']')
            .ok_or_else(|| invalid(value, &format!("unterminated IPv6 host '{}'", host)))?;
        match rest {
            "" => (name, None),
            _ => match rest.strip_prefix(':') {
                Some(port) => (name, Some(port)),
                None => return Err(invalid(value, &format!("invalid host '{}'", host))),
            },
        }
    } else {
        match host.split_once(':') {
            Some((name, port)) => (name, Some(port)),
            None => (host, None),
        }
    };

    if name.is_empty() {
        return Err(invalid(value, &format!("invalid host '{}'", host)));
    }
    let port = match port {
        Some(port) => match port.parse::<u16>() {
            Ok(port) if port > 0 => Some(port),
            _ => return Err(invalid(value, &format!("invalid port '{}'", port))),
        },
        None => None,
    };

    Ok(HostAddress {
        host: name.to_string(),
        port,
    })
}

fn percent_decode(value: &str) -> Option<String> {
    // every escape must be exactly two hex digits
    let bytes = value.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(index, byte)| {
        *byte != b'%'
            || bytes
                .get(index + 1..index + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return None;
    }
    percent_encoding::percent_decode_str(value)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}
