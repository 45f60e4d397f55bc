//! The in-memory configuration store and its persistence.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::env::{self, EnvironmentMap};
use crate::config::ini;
use crate::config::schema::{self, OptionKey, SectionKind};
use crate::config::types::SslMode;
use crate::config::validation::{self, HostResolver, SystemResolver};
use crate::errors::{ConfigError, ValidationErrors};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "TEAMPLIFY_CONF";

/// System-wide configuration file, the last place searched.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/teamplify/teamplify.ini";

/// Written by [`ConfigStore::dump`] right before the `[email]` section.
pub const EMAIL_ADVISORY: &str = "; please note: Teamplify does not require email address \
confirmation when only the admin user is registered.";

/// A named block of options, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    name: String,
    options: IndexMap<String, String>,
}

impl Section {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema kind, or `None` for a section the schema doesn't know.
    pub fn kind(&self) -> Option<SectionKind> {
        SectionKind::from_name(&self.name)
    }

    pub fn get(&self, option: &str) -> Option<&str> {
        self.options.get(option).map(String::as_str)
    }

    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Ordered `section -> option -> raw value` mapping, seeded with defaults.
///
/// Unknown sections and options loaded from a stale file are kept as-is
/// until [`ConfigStore::validate`] rejects them or
/// [`ConfigStore::remove_unknown`] strips them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    sections: IndexMap<String, Section>,
    path: Option<PathBuf>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// A fresh store holding every schema default, including a newly
    /// generated signing key.
    pub fn new() -> Self {
        let mut sections = IndexMap::new();
        for kind in SectionKind::ALL {
            let mut section = Section::new(kind.as_str());
            for key in kind.options() {
                section
                    .options
                    .insert(key.name().to_string(), key.default_value().resolve());
            }
            sections.insert(kind.as_str().to_string(), section);
        }
        Self {
            sections,
            path: None,
        }
    }

    /// A fresh store that remembers `path` for later `load`/`dump` calls.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::new();
        store.path = Some(path.into());
        store
    }

    /// First existing file of: `$TEAMPLIFY_CONF`, `~/.teamplify.ini`,
    /// `/etc/teamplify/teamplify.ini`.
    pub fn discover() -> Option<PathBuf> {
        search_locations().into_iter().find(|path| path.is_file())
    }

    /// Build a store from `explicit` (or the discovered file, if any) and
    /// overlay its contents onto the defaults.
    pub fn open(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit.map(Path::to_path_buf).or_else(Self::discover) {
            Some(path) => {
                let mut store = Self::with_path(path.clone());
                store.load(&path)?;
                Ok(store)
            }
            None => Ok(Self::new()),
        }
    }

    /// The file this store was last loaded from or dumped to.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Overlay the file at `path` onto the current values.
    pub fn load(&mut self, path: &Path) -> Result<&mut Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        self.loads(&text)?;
        self.path = Some(path.to_path_buf());
        info!(
            event = "core.config.load_completed",
            path = %path.display(),
            sections = self.sections.len()
        );
        Ok(self)
    }

    /// Overlay configuration text onto the current values. Options missing
    /// from the text keep their current value.
    pub fn loads(&mut self, text: &str) -> Result<&mut Self, ConfigError> {
        for parsed in ini::parse(text)? {
            let section = self
                .sections
                .entry(parsed.name.clone())
                .or_insert_with(|| Section::new(parsed.name));
            for (option, value) in parsed.options {
                section.options.insert(option, value);
            }
        }
        Ok(self)
    }

    /// Write the store to `path`, the remembered path, or `~/.teamplify.ini`,
    /// in that order of preference. Returns the path written.
    pub fn dump(&mut self, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let target = path
            .map(Path::to_path_buf)
            .or_else(|| self.path.clone())
            .unwrap_or_else(default_save_location);

        let contents = self.render(true);
        let write = |target: &Path| -> std::io::Result<()> {
            let mut writer = BufWriter::new(File::create(target)?);
            writer.write_all(contents.as_bytes())?;
            writer.flush()
        };
        write(&target).map_err(|source| ConfigError::WriteFailed {
            path: target.clone(),
            source,
        })?;

        info!(event = "core.config.dump_completed", path = %target.display());
        self.path = Some(target.clone());
        Ok(target)
    }

    /// Serialize without touching the filesystem.
    pub fn dumps(&self) -> String {
        self.render(false)
    }

    fn render(&self, with_advisory: bool) -> String {
        let mut out = String::new();
        for section in self.sections.values() {
            if with_advisory && section.kind() == Some(SectionKind::Email) {
                out.push_str(EMAIL_ADVISORY);
                out.push('\n');
            }
            ini::write_section(&mut out, &section.name, section.options());
        }
        out
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.sections.get(section)?.get(option)
    }

    /// Value of a known option; empty when it has been removed.
    pub fn get_key(&self, key: OptionKey) -> &str {
        self.get(key.section().as_str(), key.name()).unwrap_or("")
    }

    /// Set a value, creating the section if needed. Option names are
    /// lower-cased like the ones read from files.
    pub fn set(&mut self, section: &str, option: &str, value: impl Into<String>) -> &mut Self {
        self.sections
            .entry(section.to_string())
            .or_insert_with(|| Section::new(section))
            .options
            .insert(option.to_lowercase(), value.into());
        self
    }

    pub fn set_key(&mut self, key: OptionKey, value: impl Into<String>) -> &mut Self {
        self.set(key.section().as_str(), key.name(), value)
    }

    /// Drop every section and option the schema doesn't know. Retained
    /// entries keep their order.
    pub fn remove_unknown(&mut self) -> &mut Self {
        self.sections.retain(|name, section| {
            if !schema::is_known_section(name) {
                debug!(event = "core.config.unknown_section_removed", section = name.as_str());
                return false;
            }
            section
                .options
                .retain(|option, _| schema::is_known_option(name, option));
            true
        });
        self
    }

    pub fn ssl_mode(&self) -> SslMode {
        SslMode::from_use_ssl(self.get_key(OptionKey::WebUseSsl))
    }

    /// Certificates are issued automatically when none are supplied.
    pub fn uses_automatic_certificates(&self) -> bool {
        self.get_key(OptionKey::WebSslCerts).is_empty()
    }

    /// Validate with the platform resolver.
    pub fn validate(&self) -> Result<&Self, ValidationErrors> {
        self.validate_with(&SystemResolver)
    }

    pub fn validate_with(&self, resolver: &dyn HostResolver) -> Result<&Self, ValidationErrors> {
        validation::validate_store(self, resolver)?;
        Ok(self)
    }

    /// Project into the deployment environment. Call on a validated store.
    pub fn env(&self) -> EnvironmentMap {
        env::project(self)
    }
}

fn home_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".teamplify.ini"))
}

fn search_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Ok(explicit) = std::env::var(CONFIG_ENV_VAR)
        && !explicit.is_empty()
    {
        locations.push(PathBuf::from(explicit));
    }
    locations.extend(home_config_path());
    locations.push(PathBuf::from(SYSTEM_CONFIG_PATH));
    locations
}

/// Where `dump` writes when no path is known.
pub fn default_save_location() -> PathBuf {
    home_config_path().unwrap_or_else(|| PathBuf::from(".teamplify.ini"))
}
