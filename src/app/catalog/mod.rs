pub mod parse;

use std::io::Read;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::app::catalog::parse::parse_details_page;
use crate::app::config::CatalogSettings;
use crate::app::error::AppError;

const PLAY_BASE_URL: &str = "https://play.google.com";
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const MAX_ICON_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLookup {
    Found(CatalogEntry),
    Degraded { reason: String },
}

impl CatalogLookup {
    pub fn degraded(reason: impl Into<String>) -> Self {
        CatalogLookup::Degraded {
            reason: reason.into(),
        }
    }
}

pub trait CatalogClient: Send + Sync {
    fn lookup(&self, package_name: &str, trace_id: &str) -> CatalogLookup;

    fn fetch_icon(&self, url: &str, trace_id: &str) -> Result<Vec<u8>, AppError>;
}

pub struct GooglePlayCatalog {
    agent: ureq::Agent,
    base_url: String,
    language: String,
    country: String,
}

impl GooglePlayCatalog {
    pub fn new(settings: &CatalogSettings) -> Self {
        Self::with_base_url(settings, PLAY_BASE_URL)
    }

    pub fn with_base_url(settings: &CatalogSettings, base_url: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: settings.language.clone(),
            country: settings.country.clone(),
        }
    }

    pub fn details_url(&self, package_name: &str) -> String {
        format!(
            "{}/store/apps/details?id={}&hl={}&gl={}",
            self.base_url, package_name, self.language, self.country
        )
    }

    fn fetch_details_html(&self, package_name: &str) -> Result<String, String> {
        let url = self.details_url(package_name);
        match self.agent.get(&url).call() {
            Ok(response) => response
                .into_string()
                .map_err(|err| format!("Failed to read details page: {err}")),
            Err(ureq::Error::Status(404, _)) => Err("App is not listed on Google Play".to_string()),
            Err(ureq::Error::Status(code, _)) => Err(format!("Google Play returned HTTP {code}")),
            Err(err) => Err(format!("Failed to reach Google Play: {err}")),
        }
    }
}

impl CatalogClient for GooglePlayCatalog {
    fn lookup(&self, package_name: &str, trace_id: &str) -> CatalogLookup {
        info!(trace_id = %trace_id, package_name = %package_name, "fetching app details");
        let page = self
            .fetch_details_html(package_name)
            .and_then(|html| parse_details_page(&html));
        match page {
            Ok(page) => CatalogLookup::Found(CatalogEntry {
                title: page.title,
                icon_url: page.icon_url,
            }),
            Err(reason) => {
                warn!(
                    trace_id = %trace_id,
                    package_name = %package_name,
                    error = %reason,
                    "failed to fetch app details"
                );
                CatalogLookup::degraded(reason)
            }
        }
    }

    fn fetch_icon(&self, url: &str, trace_id: &str) -> Result<Vec<u8>, AppError> {
        debug!(trace_id = %trace_id, url = %url, "downloading icon");
        let response = self.agent.get(url).call().map_err(|err| {
            AppError::dependency(format!("Failed to download icon: {err}"), trace_id)
        })?;
        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_ICON_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|err| AppError::dependency(format!("Failed to read icon bytes: {err}"), trace_id))?;
        Ok(bytes)
    }
}

pub struct OfflineCatalog;

impl CatalogClient for OfflineCatalog {
    fn lookup(&self, _package_name: &str, _trace_id: &str) -> CatalogLookup {
        CatalogLookup::degraded("Catalog lookups are disabled")
    }

    fn fetch_icon(&self, _url: &str, trace_id: &str) -> Result<Vec<u8>, AppError> {
        Err(AppError::validation("Catalog lookups are disabled", trace_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_url_carries_locale() {
        let catalog = GooglePlayCatalog::with_base_url(&CatalogSettings::default(), "https://example.test/");
        assert_eq!(
            catalog.details_url("org.fossify.gallery"),
            "https://example.test/store/apps/details?id=org.fossify.gallery&hl=en&gl=us"
        );
    }

    #[test]
    fn unreachable_catalog_degrades_instead_of_failing() {
        let settings = CatalogSettings {
            request_timeout_secs: 1,
            ..CatalogSettings::default()
        };
        // Port 9 (discard) on localhost is expected to refuse connections.
        let catalog = GooglePlayCatalog::with_base_url(&settings, "http://127.0.0.1:9");
        match catalog.lookup("com.example", "trace-offline") {
            CatalogLookup::Degraded { reason } => assert!(!reason.is_empty()),
            other => panic!("expected degraded lookup, got {other:?}"),
        }
    }

    #[test]
    fn offline_catalog_always_degrades() {
        assert!(matches!(
            OfflineCatalog.lookup("com.example", "t"),
            CatalogLookup::Degraded { .. }
        ));
        assert!(OfflineCatalog.fetch_icon("https://x", "t").is_err());
    }
}
