//! The closed catalog of configuration sections and options.
//!
//! Sections and options are typed: validation and projection match on
//! [`OptionKey`] instead of raw strings, so the catalog and the rules can't
//! drift apart. The ordering of [`SectionKind::ALL`] and [`OptionKey::ALL`]
//! is the serialization order.

use std::path::PathBuf;

use indexmap::IndexMap;
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::warn;

/// Length of the generated `crypto.signing_key`.
pub const SIGNING_KEY_LENGTH: usize = 50;

/// Sentinel host meaning "use the bundled database container".
pub const BUILTIN_DB_HOST: &str = "builtin_db";

/// Sentinel host meaning "use the bundled mail relay container".
pub const BUILTIN_SMTP_HOST: &str = "builtin_smtp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Main,
    Web,
    Db,
    Email,
    Crypto,
    Worker,
}

impl SectionKind {
    pub const ALL: [SectionKind; 6] = [
        SectionKind::Main,
        SectionKind::Web,
        SectionKind::Db,
        SectionKind::Email,
        SectionKind::Crypto,
        SectionKind::Worker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Main => "main",
            SectionKind::Web => "web",
            SectionKind::Db => "db",
            SectionKind::Email => "email",
            SectionKind::Crypto => "crypto",
            SectionKind::Worker => "worker",
        }
    }

    pub fn from_name(name: &str) -> Option<SectionKind> {
        SectionKind::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Options of this section in schema order.
    pub fn options(self) -> impl Iterator<Item = OptionKey> {
        OptionKey::ALL
            .into_iter()
            .filter(move |key| key.section() == self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKey {
    MainProductKey,
    MainUpdateChannel,
    MainSendCrashReports,
    WebHost,
    WebPort,
    WebSslPort,
    WebSslCerts,
    WebUseSsl,
    DbHost,
    DbName,
    DbPort,
    DbUser,
    DbPassword,
    DbBackupMount,
    EmailAddressFrom,
    EmailSmtpHost,
    EmailSmtpProtocol,
    EmailSmtpPort,
    EmailSmtpUser,
    EmailSmtpPassword,
    CryptoSigningKey,
    WorkerSlimCount,
    WorkerFatCount,
}

/// How the default of an option is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Fixed(&'static str),
    /// `<user data dir>/teamplify/backup`
    BackupMount,
    /// Random secret, generated once per fresh store.
    SigningKey,
}

impl OptionKey {
    pub const ALL: [OptionKey; 23] = [
        OptionKey::MainProductKey,
        OptionKey::MainUpdateChannel,
        OptionKey::MainSendCrashReports,
        OptionKey::WebHost,
        OptionKey::WebPort,
        OptionKey::WebSslPort,
        OptionKey::WebSslCerts,
        OptionKey::WebUseSsl,
        OptionKey::DbHost,
        OptionKey::DbName,
        OptionKey::DbPort,
        OptionKey::DbUser,
        OptionKey::DbPassword,
        OptionKey::DbBackupMount,
        OptionKey::EmailAddressFrom,
        OptionKey::EmailSmtpHost,
        OptionKey::EmailSmtpProtocol,
        OptionKey::EmailSmtpPort,
        OptionKey::EmailSmtpUser,
        OptionKey::EmailSmtpPassword,
        OptionKey::CryptoSigningKey,
        OptionKey::WorkerSlimCount,
        OptionKey::WorkerFatCount,
    ];

    pub fn section(&self) -> SectionKind {
        use OptionKey::*;
        match self {
            MainProductKey | MainUpdateChannel | MainSendCrashReports => SectionKind::Main,
            WebHost | WebPort | WebSslPort | WebSslCerts | WebUseSsl => SectionKind::Web,
            DbHost | DbName | DbPort | DbUser | DbPassword | DbBackupMount => SectionKind::Db,
            EmailAddressFrom | EmailSmtpHost | EmailSmtpProtocol | EmailSmtpPort
            | EmailSmtpUser | EmailSmtpPassword => SectionKind::Email,
            CryptoSigningKey => SectionKind::Crypto,
            WorkerSlimCount | WorkerFatCount => SectionKind::Worker,
        }
    }

    pub fn name(&self) -> &'static str {
        use OptionKey::*;
        match self {
            MainProductKey => "product_key",
            MainUpdateChannel => "update_channel",
            MainSendCrashReports => "send_crash_reports",
            WebHost => "host",
            WebPort => "port",
            WebSslPort => "ssl_port",
            WebSslCerts => "ssl_certs",
            WebUseSsl => "use_ssl",
            DbHost => "host",
            DbName => "name",
            DbPort => "port",
            DbUser => "user",
            DbPassword => "password",
            DbBackupMount => "backup_mount",
            EmailAddressFrom => "address_from",
            EmailSmtpHost => "smtp_host",
            EmailSmtpProtocol => "smtp_protocol",
            EmailSmtpPort => "smtp_port",
            EmailSmtpUser => "smtp_user",
            EmailSmtpPassword => "smtp_password",
            CryptoSigningKey => "signing_key",
            WorkerSlimCount => "slim_count",
            WorkerFatCount => "fat_count",
        }
    }

    /// Find the typed key for a `(section, option)` pair, if it is known.
    pub fn lookup(section: &str, option: &str) -> Option<OptionKey> {
        let section = SectionKind::from_name(section)?;
        section.options().find(|key| key.name() == option)
    }

    pub fn default_value(&self) -> DefaultValue {
        use OptionKey::*;
        match self {
            MainProductKey => DefaultValue::Fixed(""),
            MainUpdateChannel => DefaultValue::Fixed("stable"),
            MainSendCrashReports => DefaultValue::Fixed("yes"),
            WebHost => DefaultValue::Fixed("localhost"),
            WebPort => DefaultValue::Fixed("80"),
            WebSslPort => DefaultValue::Fixed("443"),
            WebSslCerts => DefaultValue::Fixed(""),
            WebUseSsl => DefaultValue::Fixed("no"),
            DbHost => DefaultValue::Fixed(BUILTIN_DB_HOST),
            DbName => DefaultValue::Fixed("teamplify"),
            DbPort => DefaultValue::Fixed("3306"),
            DbUser => DefaultValue::Fixed("root"),
            DbPassword => DefaultValue::Fixed("teamplify"),
            DbBackupMount => DefaultValue::BackupMount,
            EmailAddressFrom => DefaultValue::Fixed("Teamplify <support@teamplify.com>"),
            EmailSmtpHost => DefaultValue::Fixed(BUILTIN_SMTP_HOST),
            EmailSmtpProtocol => DefaultValue::Fixed("plain"),
            EmailSmtpPort => DefaultValue::Fixed("25"),
            EmailSmtpUser => DefaultValue::Fixed(""),
            EmailSmtpPassword => DefaultValue::Fixed(""),
            CryptoSigningKey => DefaultValue::SigningKey,
            WorkerSlimCount => DefaultValue::Fixed("1"),
            WorkerFatCount => DefaultValue::Fixed("2"),
        }
    }
}

impl DefaultValue {
    /// Produce the concrete default. `SigningKey` draws a new secret on
    /// every call, so callers must resolve it once per store.
    pub fn resolve(&self) -> String {
        match self {
            DefaultValue::Fixed(value) => value.to_string(),
            DefaultValue::BackupMount => prepare_backup_mount().to_string_lossy().into_owned(),
            DefaultValue::SigningKey => random_string(SIGNING_KEY_LENGTH),
        }
    }
}

pub fn is_known_section(section: &str) -> bool {
    SectionKind::from_name(section).is_some()
}

pub fn is_known_option(section: &str, option: &str) -> bool {
    OptionKey::lookup(section, option).is_some()
}

/// The full default catalog, in schema order.
pub fn defaults() -> IndexMap<&'static str, IndexMap<&'static str, String>> {
    SectionKind::ALL
        .into_iter()
        .map(|section| {
            let options = section
                .options()
                .map(|key| (key.name(), key.default_value().resolve()))
                .collect();
            (section.as_str(), options)
        })
        .collect()
}

/// Default location of the database backup mount.
pub fn default_backup_mount() -> PathBuf {
    let base = match dirs::data_local_dir() {
        Some(dir) => dir,
        None => std::env::temp_dir(),
    };
    base.join("teamplify").join("backup")
}

/// [`default_backup_mount`], created on first use. Failure is logged and
/// left for validation to report.
pub fn prepare_backup_mount() -> PathBuf {
    let path = default_backup_mount();
    if let Err(e) = std::fs::create_dir_all(&path) {
        warn!(
            event = "core.config.backup_mount_create_failed",
            path = %path.display(),
            error = %e
        );
    }
    path
}

/// Alphanumeric string drawn from the thread-local, OS-seeded CSPRNG.
pub fn random_string(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
