//! # Configuration System
//!
//! Sectioned INI configuration for the Teamplify runner.
//!
//! ## Lifecycle
//!
//! 1. [`ConfigStore::new`] seeds every option with its schema default
//! 2. [`ConfigStore::load`] / [`ConfigStore::loads`] overlay a file or text
//! 3. [`ConfigStore::validate`] checks everything and reports all problems at once
//! 4. [`ConfigStore::env`] projects the store for the compose launcher
//!
//! ## File locations
//!
//! The first existing file wins:
//! 1. `$TEAMPLIFY_CONF`
//! 2. `~/.teamplify.ini`
//! 3. `/etc/teamplify/teamplify.ini`
//!
//! ## Usage Example
//!
//! ```ini
//! [main]
//! product_key = svr_xxxxxxxxxxxxxxxx-xxxxxxxxxxxxxxxxxxxx
//!
//! [web]
//! host = teamplify.example.com
//! use_ssl = builtin
//! ```
//!
//! ```rust,no_run
//! use teamplify_core::config::ConfigStore;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ConfigStore::open(None)?;
//!     let env = store.validate()?.env();
//!     println!("{}", env["WEB_HOST"]);
//!     Ok(())
//! }
//! ```

pub mod env;
pub mod ini;
pub mod schema;
pub mod store;
pub mod types;
pub mod validation;

pub use env::{EnvironmentMap, root_url};
pub use schema::{OptionKey, SectionKind, defaults};
pub use store::{ConfigStore, Section};
pub use types::SslMode;
pub use validation::{HostResolver, SystemResolver};
