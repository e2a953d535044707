use std::path::PathBuf;

pub const APP_ID: &str = "it.dottorblaster.pique";
pub const USER_AGENT: &str = concat!("pique/", env!("CARGO_PKG_VERSION"));

// OAuth app with device flow enabled, no client secret needed
pub const CLIENT_ID: &str = "Ov23liBHg4b3h8St9NLy";
pub const SCOPES: &str = "repo user user:email";

pub const OAUTH_BASE_URL: &str = "https://github.com";
pub const API_BASE_URL: &str = "https://api.github.com";

/// Runtime settings, resolved from command line flags and environment.
#[derive(Clone, Debug)]
pub struct Settings {
    pub client_id: String,
    pub oauth_base_url: String,
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub open_browser: bool,
}

impl Settings {
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        Self {
            client_id: CLIENT_ID.to_owned(),
            oauth_base_url: OAUTH_BASE_URL.to_owned(),
            api_base_url: API_BASE_URL.to_owned(),
            data_dir: data_dir.unwrap_or_else(default_data_dir),
            open_browser: true,
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_ID);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::new(Some(PathBuf::from("/tmp/pique")));

        assert_eq!(settings.client_id, CLIENT_ID);
        assert_eq!(settings.oauth_base_url, "https://github.com");
        assert_eq!(settings.api_base_url, "https://api.github.com");
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/pique"));
        assert!(settings.open_browser);
    }

    #[test]
    fn test_default_data_dir_ends_with_app_id() {
        assert!(default_data_dir().ends_with(APP_ID));
    }
}
