//! Derived configuration values.

use std::fmt;

/// Values accepted wherever a yes/no answer is expected.
pub const BOOLEAN_SYNONYMS: [&str; 8] = ["yes", "no", "y", "n", "true", "false", "0", "1"];

const TRUTHY: [&str; 4] = ["yes", "y", "true", "1"];

/// `true` for `yes`, `y`, `true` and `1` (case-insensitive).
pub fn str_to_bool(value: &str) -> bool {
    TRUTHY.contains(&value.to_lowercase().as_str())
}

/// TLS termination mode, derived from `web.use_ssl`.
///
/// Not stored anywhere: `builtin` and `external` are taken literally, any
/// truthy boolean synonym means `builtin`, everything else is `disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Disabled,
    Builtin,
    External,
}

impl SslMode {
    pub fn from_use_ssl(value: &str) -> SslMode {
        match value.to_lowercase().as_str() {
            "builtin" => SslMode::Builtin,
            "external" => SslMode::External,
            other if str_to_bool(other) => SslMode::Builtin,
            _ => SslMode::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, SslMode::Disabled)
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SslMode::Disabled => write!(f, "disabled"),
            SslMode::Builtin => write!(f, "builtin"),
            SslMode::External => write!(f, "external"),
        }
    }
}

/// Compose profiles activated for a given TLS setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentProfile {
    NoSsl,
    Ssl,
    SslLetsEncrypt,
}

impl DeploymentProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentProfile::NoSsl => "nossl",
            DeploymentProfile::Ssl => "ssl",
            DeploymentProfile::SslLetsEncrypt => "ssl,letsencrypt",
        }
    }
}

/// How the reverse proxy treats plain HTTP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpsMethod {
    NoHttps,
    Redirect,
}

impl HttpsMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpsMethod::NoHttps => "nohttps",
            HttpsMethod::Redirect => "redirect",
        }
    }
}
