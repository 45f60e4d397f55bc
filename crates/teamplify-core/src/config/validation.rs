//! Configuration validation.
//!
//! A validation pass never stops at the first problem: every option of every
//! known section is checked and each failure is recorded as
//! `[section] option: message`. Unknown sections are reported once, without
//! checking their options. The collected messages come back as a single
//! [`ValidationErrors`].
//!
//! Some rules depend on other options. The port rules for `web` read the SSL
//! mode (derived from `web.use_ssl`) and whether certificates are supplied
//! (`web.ssl_certs`): with built-in SSL and automatic certificate issuance
//! the web port must be 80 and the SSL port must be 443.

use std::net::{IpAddr, ToSocketAddrs};
use std::num::IntErrorKind;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::schema::{self, BUILTIN_DB_HOST, BUILTIN_SMTP_HOST, OptionKey};
use crate::config::store::ConfigStore;
use crate::config::types::{BOOLEAN_SYNONYMS, SslMode};
use crate::errors::ValidationErrors;

pub const UPDATE_CHANNELS: [&str; 2] = ["stable", "latest"];
pub const SSL_MODES: [&str; 3] = ["no", "builtin", "external"];
pub const SMTP_PROTOCOLS: [&str; 3] = ["plain", "ssl", "tls"];

pub const MIN_PORT: i64 = 0;
pub const MAX_PORT: i64 = 65535;
const HTTP_PORT: i64 = 80;
const HTTPS_PORT: i64 = 443;

static PRODUCT_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^svr_[A-Za-z0-9]{16}-[A-Za-z0-9]{20}$").expect("product key pattern is valid")
});

// Exactly one `@`, with word characters on both sides of it.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]*\w+@\w+[^@]*$").expect("email pattern is valid"));

/// Failure message for a single option, without the `[section] option:` prefix.
pub type FieldResult<T = ()> = Result<T, String>;

/// Hostname resolution used by validation.
pub trait HostResolver {
    /// Whether `host` resolves to at least one address.
    fn resolves(&self, host: &str) -> bool;
}

/// Resolves through the platform resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolves(&self, host: &str) -> bool {
        match (host, 0).to_socket_addrs() {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                debug!(
                    event = "core.config.resolve_failed",
                    host = host,
                    error = %e
                );
                false
            }
        }
    }
}

/// Check every section and option of `store`, collecting all failures.
pub fn validate_store(
    store: &ConfigStore,
    resolver: &dyn HostResolver,
) -> Result<(), ValidationErrors> {
    let mut messages = Vec::new();

    for section in store.sections() {
        if section.kind().is_none() {
            messages.push(format!("Unknown section: [{}]", section.name()));
            continue;
        }
        for (option, value) in section.options() {
            if let Err(message) = validate_option(store, resolver, section.name(), option, value) {
                messages.push(format!("[{}] {}: {}", section.name(), option, message));
            }
        }
    }

    match ValidationErrors::from_messages(messages) {
        Some(errors) => {
            warn!(
                event = "core.config.validation_failed",
                error_count = errors.len()
            );
            Err(errors)
        }
        None => {
            info!(event = "core.config.validation_completed");
            Ok(())
        }
    }
}

/// Check one option. Cross-field rules read the other values from `store`.
pub fn validate_option(
    store: &ConfigStore,
    resolver: &dyn HostResolver,
    section: &str,
    option: &str,
    value: &str,
) -> FieldResult {
    let Some(key) = OptionKey::lookup(section, option) else {
        if !schema::is_known_section(section) {
            return Err(format!("Unknown section: [{}]", section));
        }
        return Err("Unknown option".to_string());
    };

    match key {
        OptionKey::MainProductKey => validate_product_key(value),
        OptionKey::MainSendCrashReports => validate_boolean(value),
        OptionKey::MainUpdateChannel => validate_choice(value, &UPDATE_CHANNELS),
        OptionKey::WebHost => validate_hostname(resolver, value),
        OptionKey::WebPort => validate_web_port(store, value),
        OptionKey::WebSslPort => validate_web_ssl_port(store, value),
        OptionKey::WebUseSsl => validate_use_ssl(value),
        OptionKey::WebSslCerts => {
            let host = store.get_key(OptionKey::WebHost).to_lowercase();
            if !value.is_empty() && !host.is_empty() && store.ssl_mode() == SslMode::Builtin {
                validate_certs(Path::new(value), &host)
            } else {
                Ok(())
            }
        }
        OptionKey::DbHost => {
            if value.to_lowercase() == BUILTIN_DB_HOST {
                Ok(())
            } else {
                validate_hostname(resolver, value)
            }
        }
        OptionKey::DbPort | OptionKey::EmailSmtpPort => validate_port(value).map(drop),
        OptionKey::DbBackupMount => validate_backup_mount(Path::new(value)),
        OptionKey::EmailSmtpHost => {
            if value.to_lowercase() == BUILTIN_SMTP_HOST {
                Ok(())
            } else {
                validate_hostname(resolver, value)
            }
        }
        OptionKey::EmailSmtpProtocol => validate_choice(value, &SMTP_PROTOCOLS),
        OptionKey::EmailAddressFrom => validate_email(value),
        OptionKey::WorkerSlimCount | OptionKey::WorkerFatCount => {
            validate_integer(value, Some(1), None).map(drop)
        }
        OptionKey::DbName
        | OptionKey::DbUser
        | OptionKey::DbPassword
        | OptionKey::EmailSmtpUser
        | OptionKey::EmailSmtpPassword
        | OptionKey::CryptoSigningKey => Ok(()),
    }
}

pub fn validate_product_key(value: &str) -> FieldResult {
    if value.is_empty() {
        return Err("Product key is missing".to_string());
    }
    if !PRODUCT_KEY_RE.is_match(value) {
        return Err(format!("Invalid product key: {}", value));
    }
    Ok(())
}

pub fn validate_boolean(value: &str) -> FieldResult {
    if !BOOLEAN_SYNONYMS.contains(&value.to_lowercase().as_str()) {
        return Err(format!(
            "Must be yes or no, or true / false, or 1 / 0. You provided: {}",
            value
        ));
    }
    Ok(())
}

pub fn validate_choice(value: &str, choices: &[&str]) -> FieldResult {
    if !choices.contains(&value) {
        return Err(format!(
            "Must be one of the following: {}. You provided: {}",
            choices.join(", "),
            value
        ));
    }
    Ok(())
}

/// `no`, `builtin`, `external`, or any boolean synonym.
pub fn validate_use_ssl(value: &str) -> FieldResult {
    if BOOLEAN_SYNONYMS.contains(&value.to_lowercase().as_str()) {
        return Ok(());
    }
    validate_choice(value, &SSL_MODES)
}

/// Literal IP addresses pass without a lookup.
pub fn validate_hostname(resolver: &dyn HostResolver, value: &str) -> FieldResult {
    if value.parse::<IpAddr>().is_ok() || resolver.resolves(value) {
        return Ok(());
    }
    Err(format!("Can't resolve hostname: {}", value))
}

pub fn validate_integer(value: &str, min: Option<i64>, max: Option<i64>) -> FieldResult<i64> {
    let number: i64 = match value.trim().parse() {
        Ok(number) => number,
        Err(e) => {
            return Err(match (e.kind(), min, max) {
                (IntErrorKind::PosOverflow, _, Some(max)) => {
                    format!("Must be less or equal to {}. You provided: {}", max, value)
                }
                (IntErrorKind::NegOverflow, Some(min), _) => {
                    format!("Must be greater or equal to {}. You provided: {}", min, value)
                }
                _ => format!("Must be an integer. You provided: {}", value),
            });
        }
    };
    if let Some(min) = min
        && number < min
    {
        return Err(format!(
            "Must be greater or equal to {}. You provided: {}",
            min, number
        ));
    }
    if let Some(max) = max
        && number > max
    {
        return Err(format!(
            "Must be less or equal to {}. You provided: {}",
            max, number
        ));
    }
    Ok(number)
}

pub fn validate_port(value: &str) -> FieldResult<i64> {
    validate_integer(value, Some(MIN_PORT), Some(MAX_PORT))
}

fn pinned_by_builtin_ssl(store: &ConfigStore) -> bool {
    store.ssl_mode() == SslMode::Builtin && store.uses_automatic_certificates()
}

fn validate_web_port(store: &ConfigStore, value: &str) -> FieldResult {
    let port = validate_port(value)?;
    if port == HTTPS_PORT {
        return Err("Can't use port 443 because it's reserved for the SSL-enabled \
                    configuration. Please choose another port"
            .to_string());
    }
    if port != HTTP_PORT && pinned_by_builtin_ssl(store) {
        return Err(format!(
            "For the built-in support of the SSL-enabled configuration if there is no SSL \
             certificates provided, the web port must be set to 80. You provided: {}",
            value
        ));
    }
    Ok(())
}

fn validate_web_ssl_port(store: &ConfigStore, value: &str) -> FieldResult {
    let port = validate_port(value)?;
    if port == HTTP_PORT {
        return Err("Can't use port 80 because it's reserved for the SSL-enabled \
                    configuration. Please choose another port"
            .to_string());
    }
    if port != HTTPS_PORT && pinned_by_builtin_ssl(store) {
        return Err(format!(
            "For the built-in support of the SSL-enabled configuration if there is no SSL \
             certificates provided, the ssl port must be set to 443. You provided: {}",
            value
        ));
    }
    Ok(())
}

/// The directory must hold `<host>.crt` and `<host>.key`, or a `<host>`
/// subdirectory with at least one `.pem` file.
pub fn validate_certs(path: &Path, hostname: &str) -> FieldResult {
    if !path.is_dir() {
        return Err(format!(
            "The path to certificates directory must be valid. You provided: {}",
            path.display()
        ));
    }

    let cert_filename = format!("{}.crt", hostname);
    let key_filename = format!("{}.key", hostname);
    let cert_files_found =
        path.join(&cert_filename).is_file() && path.join(&key_filename).is_file();

    let cert_dir = path.join(hostname);
    let cert_dir_found = cert_dir.is_dir()
        && std::fs::read_dir(&cert_dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .any(|entry| entry.file_name().to_string_lossy().ends_with(".pem"))
            })
            .unwrap_or(false);

    if cert_files_found || cert_dir_found {
        return Ok(());
    }
    Err(format!(
        "The path to certificates directory must contain both certificate and key files \
         for the specified host ('{}', '{}') or '{}' directory with .pem files. \
         You provided: {}",
        cert_filename,
        key_filename,
        hostname,
        path.display()
    ))
}

pub fn validate_backup_mount(path: &Path) -> FieldResult {
    if !path.is_dir() {
        return Err(format!("Must be a directory: {}", path.display()));
    }
    if !is_writable(path) {
        return Err(format!("Write permission denied: {}", path.display()));
    }
    Ok(())
}

#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    nix::unistd::access(path, nix::unistd::AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|meta| !meta.permissions().readonly())
        .unwrap_or(false)
}

pub fn validate_email(value: &str) -> FieldResult {
    if !EMAIL_RE.is_match(value) {
        return Err(format!("Invalid email: {}", value));
    }
    Ok(())
}
