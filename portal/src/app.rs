//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! Settings, the gateway and the staff verifier are initialized here and
//! made available through AppState.

use crate::access::StaffVerifier;
use crate::error::{AppError, Result};
use crate::gateway::{AnyGateway, LocalGateway, RemoteGateway};
use crate::services::settings::{AppSettings, GatewayBackend};
use crate::services::{
    AnnouncementsService, CalendarService, MaterialUploader, MaterialsBrowser, SettingsService,
};
use std::path::PathBuf;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub settings: AppSettings,
    pub settings_service: SettingsService,
    pub gateway: AnyGateway,
    pub verifier: StaffVerifier,
}

impl AppState {
    pub fn browser(&self) -> MaterialsBrowser<AnyGateway> {
        MaterialsBrowser::new(self.gateway.clone())
    }

    pub fn uploader(&self) -> MaterialUploader<AnyGateway> {
        MaterialUploader::new(self.gateway.clone(), &self.settings.gateway.materials_bucket)
            .with_cache_control(self.settings.gateway.cache_control_seconds)
    }

    pub fn announcements(&self) -> AnnouncementsService<AnyGateway> {
        AnnouncementsService::new(self.gateway.clone())
    }

    pub fn calendar(&self) -> CalendarService<AnyGateway> {
        CalendarService::new(self.gateway.clone(), &self.settings.gateway.calendar_bucket)
    }
}

/// Build the gateway selected by settings
pub async fn connect_gateway(settings: &AppSettings, data_dir: &std::path::Path) -> Result<AnyGateway> {
    match settings.gateway.backend {
        GatewayBackend::Remote => {
            let url = settings.gateway.url.as_deref().ok_or_else(|| {
                AppError::Generic("Remote gateway selected but no URL configured".to_string())
            })?;
            let key = settings.gateway.anon_key.as_deref().ok_or_else(|| {
                AppError::Generic("Remote gateway selected but no anon key configured".to_string())
            })?;

            tracing::info!("Using remote gateway at {}", url);
            let gateway = RemoteGateway::new(url, key, settings.gateway.request_timeout())?;
            Ok(AnyGateway::Remote(gateway))
        }
        GatewayBackend::Local => {
            tracing::info!("Using local gateway in {:?}", data_dir);
            Ok(AnyGateway::Local(LocalGateway::open(data_dir).await?))
        }
    }
}

/// Application setup - called once on startup
pub async fn setup(data_dir: PathBuf) -> Result<AppState> {
    tracing::info!("Initializing application");
    tracing::info!("Data directory: {:?}", data_dir);

    tokio::fs::create_dir_all(&data_dir).await?;

    let settings_service = SettingsService::new(data_dir.clone());
    let mut settings = settings_service.load().await?;
    settings.apply_env_overrides();

    let gateway = connect_gateway(&settings, &data_dir).await?;
    let verifier = StaffVerifier::new(settings.staff.clone());

    tracing::info!("Application initialized successfully");

    Ok(AppState {
        settings,
        settings_service,
        gateway,
        verifier,
    })
}
