//! Settings service
//!
//! Manages portal settings persistence using JSON file storage.

use crate::config;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// Which gateway implementation serves content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayBackend {
    /// SQLite database and object directory inside the data directory
    #[default]
    Local,
    /// Hosted Supabase project
    Remote,
}

/// Gateway connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default)]
    pub backend: GatewayBackend,
    /// Project URL, e.g. https://xyzcompany.supabase.co
    #[serde(default)]
    pub url: Option<String>,
    /// Public (anon) project key
    #[serde(default)]
    pub anon_key: Option<String>,
    #[serde(default = "default_materials_bucket")]
    pub materials_bucket: String,
    #[serde(default = "default_calendar_bucket")]
    pub calendar_bucket: String,
    #[serde(default = "default_cache_control_seconds")]
    pub cache_control_seconds: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_materials_bucket() -> String {
    config::DEFAULT_MATERIALS_BUCKET.to_string()
}

fn default_calendar_bucket() -> String {
    config::DEFAULT_CALENDAR_BUCKET.to_string()
}

fn default_cache_control_seconds() -> u32 {
    config::DEFAULT_CACHE_CONTROL_SECONDS
}

fn default_request_timeout_secs() -> u64 {
    config::DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            backend: GatewayBackend::Local,
            url: None,
            anon_key: None,
            materials_bucket: default_materials_bucket(),
            calendar_bucket: default_calendar_bucket(),
            cache_control_seconds: default_cache_control_seconds(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl GatewaySettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Staff portal credentials, stored as Argon2id PHC strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffCredentials {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default)]
    pub admin_password_hash: Option<String>,
    #[serde(default)]
    pub teacher_password_hash: Option<String>,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

impl Default for StaffCredentials {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            admin_password_hash: None,
            teacher_password_hash: None,
        }
    }
}

/// Display timings for the upload dialog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// How long the upload modal shows its confirmation before closing
    #[serde(default = "default_upload_success_delay_ms")]
    pub upload_success_delay_ms: u64,
}

fn default_upload_success_delay_ms() -> u64 {
    config::DEFAULT_UPLOAD_SUCCESS_DELAY_MS
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            upload_success_delay_ms: default_upload_success_delay_ms(),
        }
    }
}

impl UiSettings {
    pub fn upload_success_delay(&self) -> Duration {
        Duration::from_millis(self.upload_success_delay_ms)
    }
}

/// Portal settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub staff: StaffCredentials,
    #[serde(default)]
    pub ui: UiSettings,
}

impl AppSettings {
    /// Apply `SUPABASE_URL` / `SUPABASE_ANON_KEY` style overrides.
    ///
    /// When both values are present the remote backend is selected.
    pub fn apply_overrides(&mut self, url: Option<String>, anon_key: Option<String>) {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.gateway.url = Some(url);
        }
        if let Some(key) = anon_key.filter(|k| !k.trim().is_empty()) {
            self.gateway.anon_key = Some(key);
        }
        if self.gateway.url.is_some() && self.gateway.anon_key.is_some() {
            self.gateway.backend = GatewayBackend::Remote;
        }
    }

    /// Overrides read from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("SUPABASE_URL").ok(),
            std::env::var("SUPABASE_ANON_KEY").ok(),
        );
    }
}

/// Service for managing portal settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join("settings.json"),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !fs::try_exists(&self.settings_path).await? {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Generic(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    /// Edit the stored staff credentials, keeping everything else
    pub async fn update_staff<F>(&self, edit: F) -> Result<StaffCredentials>
    where
        F: FnOnce(&mut StaffCredentials),
    {
        let mut settings = self.load().await?;
        edit(&mut settings.staff);
        self.save(&settings).await?;
        Ok(settings.staff)
    }

    pub fn path(&self) -> &std::path::Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (SettingsService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());
        (service, temp_dir)
    }

    #[tokio::test]
    async fn test_default_settings_created_on_load() {
        let (service, _temp) = create_test_service();

        let settings = service.load().await.unwrap();

        assert!(service.path().exists());
        assert_eq!(settings.gateway.backend, GatewayBackend::Local);
        assert_eq!(settings.gateway.materials_bucket, "materials");
        assert_eq!(settings.gateway.calendar_bucket, "calendar_images");
        assert_eq!(settings.gateway.cache_control_seconds, 3600);
        assert_eq!(settings.staff.admin_username, "admin");
        assert!(settings.staff.teacher_password_hash.is_none());
        assert_eq!(settings.ui.upload_success_delay_ms, 2000);
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let (service, _temp) = create_test_service();

        tokio::fs::write(
            service.path(),
            r#"{ "gateway": { "backend": "remote", "url": "https://x.supabase.co" } }"#,
        )
        .await
        .unwrap();

        let settings = service.load().await.unwrap();
        assert_eq!(settings.gateway.backend, GatewayBackend::Remote);
        assert_eq!(settings.gateway.url.as_deref(), Some("https://x.supabase.co"));
        assert_eq!(settings.gateway.materials_bucket, "materials");
        assert_eq!(settings.ui.upload_success_delay_ms, 2000);
    }

    #[tokio::test]
    async fn test_staff_update_persists() {
        let temp_dir = TempDir::new().unwrap();

        {
            let service = SettingsService::new(temp_dir.path().to_path_buf());
            tokio::fs::write(
                service.path(),
                r#"{ "ui": { "upload_success_delay_ms": 500 } }"#,
            )
            .await
            .unwrap();

            let staff = service
                .update_staff(|staff| {
                    staff.admin_username = "principal".to_string();
                    staff.admin_password_hash = Some("$argon2id$hash".to_string());
                })
                .await
                .unwrap();
            assert!(staff.teacher_password_hash.is_none());
        }

        {
            let service = SettingsService::new(temp_dir.path().to_path_buf());
            let loaded = service.load().await.unwrap();
            assert_eq!(loaded.staff.admin_username, "principal");
            assert_eq!(
                loaded.staff.admin_password_hash.as_deref(),
                Some("$argon2id$hash")
            );
            assert_eq!(loaded.ui.upload_success_delay_ms, 500);
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let (service, _temp) = create_test_service();
        tokio::fs::write(service.path(), "{ not json").await.unwrap();

        assert!(service.load().await.is_err());
    }

    #[test]
    fn test_overrides_select_remote_backend() {
        let mut settings = AppSettings::default();

        settings.apply_overrides(Some("https://x.supabase.co".to_string()), None);
        assert_eq!(settings.gateway.backend, GatewayBackend::Local);

        settings.apply_overrides(None, Some("anon".to_string()));
        assert_eq!(settings.gateway.backend, GatewayBackend::Remote);
        assert_eq!(settings.gateway.anon_key.as_deref(), Some("anon"));
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let mut settings = AppSettings::default();
        settings.apply_overrides(Some("  ".to_string()), Some(String::new()));

        assert!(settings.gateway.url.is_none());
        assert!(settings.gateway.anon_key.is_none());
    }
}
