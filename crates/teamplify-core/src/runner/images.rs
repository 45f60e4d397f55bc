//! Container images used by the stack.

use crate::config::EnvironmentMap;

/// Repository of the application image; the tag is the update channel.
pub const APP_IMAGE: &str = "public.ecr.aws/q5a3z0t4/teamplify/server";

/// `(component, reference)` for every image in the stack.
pub const IMAGES: [(&str, &str); 6] = [
    ("db", "mysql:8.0.23"),
    ("redis", "redis:6.0.5"),
    ("nginx", "jwilder/nginx-proxy:latest"),
    ("letsencrypt", "jrcs/letsencrypt-nginx-proxy-companion:latest"),
    ("smtp", "instrumentisto/postfix:3.1.3"),
    ("app", APP_IMAGE),
];

/// Update channels the app image is published under.
pub const APP_CHANNELS: [&str; 2] = ["stable", "latest"];

pub fn app_image(channel: &str) -> String {
    format!("{}:{}", APP_IMAGE, channel)
}

/// `IMAGE_<COMPONENT>` keys for the compose file.
pub fn image_env(channel: &str) -> Vec<(String, String)> {
    IMAGES
        .iter()
        .map(|(component, reference)| {
            let reference = if *component == "app" {
                app_image(channel)
            } else {
                reference.to_string()
            };
            (format!("IMAGE_{}", component.to_uppercase()), reference)
        })
        .collect()
}

/// Add the image keys to a projected environment.
pub fn with_images(mut env: EnvironmentMap) -> EnvironmentMap {
    let channel = env
        .get("MAIN_UPDATE_CHANNEL")
        .cloned()
        .unwrap_or_else(|| APP_CHANNELS[0].to_string());
    env.extend(image_env(&channel));
    env
}

/// Every image reference the stack may have pulled, for `erase`.
pub fn all_references() -> Vec<String> {
    IMAGES
        .iter()
        .flat_map(|(component, reference)| {
            if *component == "app" {
                APP_CHANNELS.iter().map(|channel| app_image(channel)).collect()
            } else {
                vec![reference.to_string()]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_env_tags_app_with_channel() {
        let env: EnvironmentMap = image_env("latest").into_iter().collect();
        assert_eq!(env["IMAGE_APP"], format!("{}:latest", APP_IMAGE));
        assert_eq!(env["IMAGE_DB"], "mysql:8.0.23");
        assert_eq!(env.len(), IMAGES.len());
    }

    #[test]
    fn test_with_images_reads_update_channel() {
        let mut env = EnvironmentMap::new();
        env.insert("MAIN_UPDATE_CHANNEL".into(), "stable".into());
        let env = with_images(env);
        assert!(env["IMAGE_APP"].ends_with(":stable"));
        assert_eq!(env["IMAGE_REDIS"], "redis:6.0.5");
    }

    #[test]
    fn test_all_references_cover_both_channels() {
        let refs = all_references();
        assert!(refs.contains(&app_image("stable")));
        assert!(refs.contains(&app_image("latest")));
        assert!(refs.contains(&"mysql:8.0.23".to_string()));
        assert_eq!(refs.len(), IMAGES.len() + 1);
    }
}
