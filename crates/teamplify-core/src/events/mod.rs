use tracing::{error, info};

pub fn log_app_startup() {
    info!(
        event = "core.app.startup_completed",
        version = env!("CARGO_PKG_VERSION")
    );
}

pub fn log_config_source(path: Option<&std::path::Path>) {
    match path {
        Some(path) => info!(event = "core.app.config_selected", path = %path.display()),
        None => info!(event = "core.app.config_defaults_only"),
    }
}

pub fn log_app_error(error: &dyn std::error::Error) {
    error!(
        event = "core.app.error_occurred",
        error = %error,
        error_type = std::any::type_name_of_val(error)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_events() {
        // Test that event functions don't panic
        log_app_startup();
        log_config_source(None);
        log_config_source(Some(std::path::Path::new("/etc/teamplify/teamplify.ini")));

        let test_error = std::io::Error::other("test");
        log_app_error(&test_error);
    }
}
