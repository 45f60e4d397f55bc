//! Projection of the configuration into the deployment environment.
//!
//! Every stored option becomes `SECTION_OPTION`. On top of that come the
//! derived keys the compose file reads: reverse proxy and certificate
//! issuance hosts, the compose profiles and HTTPS policy selected by the SSL
//! mode, and the mail relay settings.

use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::config::schema::OptionKey;
use crate::config::store::ConfigStore;
use crate::config::types::{DeploymentProfile, HttpsMethod, SslMode};

/// Flat `KEY -> value` mapping handed to the compose launcher.
pub type EnvironmentMap = BTreeMap<String, String>;

/// Networks the bundled mail relay accepts mail from.
pub const POSTFIX_MYNETWORKS: &str = "127.0.0.1/32 192.168.0.0/16 172.16.0.0/12 10.0.0.0/8";

pub fn env_key(section: &str, option: &str) -> String {
    format!("{}_{}", section.to_uppercase(), option.to_uppercase())
}

/// TLS selectors for a given SSL mode.
pub fn tls_selectors(mode: SslMode, automatic_certificates: bool) -> (DeploymentProfile, HttpsMethod) {
    match mode {
        SslMode::Builtin if automatic_certificates => {
            (DeploymentProfile::SslLetsEncrypt, HttpsMethod::Redirect)
        }
        SslMode::Builtin => (DeploymentProfile::Ssl, HttpsMethod::Redirect),
        // The application redirects on the upstream protocol header itself.
        SslMode::External => (DeploymentProfile::NoSsl, HttpsMethod::NoHttps),
        SslMode::Disabled => (DeploymentProfile::NoSsl, HttpsMethod::NoHttps),
    }
}

/// `postmaster@<host>` for IP hosts, otherwise `postmaster@<text after the first dot>`.
pub fn postmaster_email(web_host: &str) -> String {
    if web_host.parse::<IpAddr>().is_ok() {
        return format!("postmaster@{}", web_host);
    }
    let domain = match web_host.split_once('.') {
        Some((_, domain)) => domain,
        None => web_host,
    };
    format!("postmaster@{}", domain)
}

pub fn project(store: &ConfigStore) -> EnvironmentMap {
    let mut env = EnvironmentMap::new();
    for section in store.sections() {
        for (option, value) in section.options() {
            env.insert(env_key(section.name(), option), value.to_string());
        }
    }

    let web_host = store.get_key(OptionKey::WebHost).to_string();
    let ssl_port = store.get_key(OptionKey::WebSslPort).to_string();
    let mode = store.ssl_mode();
    let (profile, https_method) = tls_selectors(mode, store.uses_automatic_certificates());

    // Always set, the proxy companion logs warnings without it.
    env.insert("LETSENCRYPT_HOST".into(), web_host.clone());
    env.insert("COMPOSE_PROFILES".into(), profile.as_str().into());
    env.insert("HTTPS_METHOD".into(), https_method.as_str().into());
    env.insert("HTTPS_PORT".into(), ssl_port);

    env.insert("ENABLE_CLAMAV".into(), "false".into());
    env.insert("POSTFIX_MYNETWORKS".into(), POSTFIX_MYNETWORKS.into());
    env.insert("POSTFIX_MYHOSTNAME".into(), web_host.clone());
    env.insert("POSTMASTER_EMAIL".into(), postmaster_email(&web_host));

    if mode == SslMode::Disabled {
        env.remove(&env_key("web", "ssl_port"));
    }

    env
}

/// Public URL of the app for a projected environment.
///
/// HTTPS URLs never carry a port; HTTP URLs carry it unless it is 80.
pub fn root_url(env: &EnvironmentMap) -> String {
    let host = env.get("WEB_HOST").map(String::as_str).unwrap_or("localhost");
    let use_ssl = env.get("WEB_USE_SSL").map(String::as_str).unwrap_or("");
    if SslMode::from_use_ssl(use_ssl).is_enabled() {
        return format!("https://{}", host);
    }
    match env.get("WEB_PORT").map(String::as_str) {
        Some(port) if port != "80" => format!("http://{}:{}", host, port),
        _ => format!("http://{}", host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(host: &str, use_ssl: &str, certs: &str) -> ConfigStore {
        let mut store = ConfigStore::new();
        store
            .set_key(OptionKey::WebHost, host)
            .set_key(OptionKey::WebUseSsl, use_ssl)
            .set_key(OptionKey::WebSslCerts, certs);
        store
    }

    #[test]
    fn test_every_option_is_projected() {
        let env = ConfigStore::new().env();
        assert_eq!(env["DB_PORT"], "3306");
        assert_eq!(env["WORKER_FAT_COUNT"], "2");
        assert_eq!(env["CRYPTO_SIGNING_KEY"].len(), 50);
        assert_eq!(env["MAIN_PRODUCT_KEY"], "");
    }

    #[test]
    fn test_disabled_ssl() {
        let env = store_with("teamplify.example.com", "no", "").env();
        assert_eq!(env["COMPOSE_PROFILES"], "nossl");
        assert_eq!(env["HTTPS_METHOD"], "nohttps");
        assert_eq!(env["HTTPS_PORT"], "443");
        assert!(!env.contains_key("WEB_SSL_PORT"));
    }

    #[test]
    fn test_builtin_ssl_with_automatic_certificates() {
        let env = store_with("teamplify.example.com", "builtin", "").env();
        assert_eq!(env["COMPOSE_PROFILES"], "ssl,letsencrypt");
        assert_eq!(env["HTTPS_METHOD"], "redirect");
        assert_eq!(env["WEB_SSL_PORT"], "443");
    }

    #[test]
    fn test_builtin_ssl_with_supplied_certificates() {
        let env = store_with("teamplify.example.com", "true", "/etc/certs").env();
        assert_eq!(env["COMPOSE_PROFILES"], "ssl");
        assert_eq!(env["HTTPS_METHOD"], "redirect");
    }

    #[test]
    fn test_external_ssl() {
        let env = store_with("teamplify.example.com", "external", "").env();
        assert_eq!(env["COMPOSE_PROFILES"], "nossl");
        assert_eq!(env["HTTPS_METHOD"], "nohttps");
        assert_eq!(env["WEB_SSL_PORT"], "443");
        assert_eq!(env["WEB_USE_SSL"], "external");
    }

    #[test]
    fn test_mail_relay_keys() {
        let env = store_with("teamplify.example.com", "no", "").env();
        assert_eq!(env["ENABLE_CLAMAV"], "false");
        assert_eq!(env["POSTFIX_MYNETWORKS"], POSTFIX_MYNETWORKS);
        assert_eq!(env["POSTFIX_MYHOSTNAME"], "teamplify.example.com");
        assert_eq!(env["POSTMASTER_EMAIL"], "postmaster@example.com");
        assert_eq!(env["LETSENCRYPT_HOST"], "teamplify.example.com");
    }

    #[test]
    fn test_postmaster_email() {
        assert_eq!(postmaster_email("10.1.2.3"), "postmaster@10.1.2.3");
        assert_eq!(postmaster_email("localhost"), "postmaster@localhost");
        assert_eq!(postmaster_email("a.b.example.com"), "postmaster@b.example.com");
    }

    #[test]
    fn test_unknown_entries_are_projected_too() {
        let mut store = ConfigStore::new();
        store.set("extra", "key", "value");
        assert_eq!(store.env()["EXTRA_KEY"], "value");
    }

    #[test]
    fn test_root_url() {
        let cases = [
            ("no", "80", "http://example.com"),
            ("no", "8080", "http://example.com:8080"),
            ("builtin", "80", "https://example.com"),
            ("external", "8000", "https://example.com"),
            ("yes", "80", "https://example.com"),
            ("true", "80", "https://example.com"),
        ];
        for (use_ssl, port, expected) in cases {
            let env: EnvironmentMap = [
                ("WEB_HOST", "example.com"),
                ("WEB_PORT", port),
                ("WEB_USE_SSL", use_ssl),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
            assert_eq!(root_url(&env), expected, "use_ssl={} port={}", use_ssl, port);
        }
    }
}
