use serde::{Deserialize, Serialize};
use std::fmt;

use crate::app::data_url::png_bytes_to_data_url;

pub const APP_LIST_EVENT_NAME: &str = "app-list-event";
pub const DEFAULT_DISPLAY_NAME: &str = "No Name Found";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceSummary {
    pub serial: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetadataStatus {
    Found,
    Degraded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IconSource {
    Catalog,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    pub package_name: String,
    pub display_name: String,
    pub icon_png: Vec<u8>,
    pub icon_source: IconSource,
    pub metadata: MetadataStatus,
}

impl AppRecord {
    pub fn label(&self) -> String {
        format!("{} ({})", self.display_name, self.package_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppRow {
    pub package_name: String,
    pub display_name: String,
    pub label: String,
    pub icon_data_url: Option<String>,
    pub icon_source: IconSource,
    pub metadata: MetadataStatus,
}

impl From<&AppRecord> for AppRow {
    fn from(record: &AppRecord) -> Self {
        Self {
            package_name: record.package_name.clone(),
            display_name: record.display_name.clone(),
            label: record.label(),
            icon_data_url: png_bytes_to_data_url(&record.icon_png).ok(),
            icon_source: record.icon_source,
            metadata: record.metadata,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationKind {
    LoadApps,
    Uninstall { package_name: String },
    Install { apk_count: usize },
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::LoadApps => write!(f, "loading apps"),
            OperationKind::Uninstall { package_name } => write!(f, "uninstalling {package_name}"),
            OperationKind::Install { apk_count } => write!(f, "installing {apk_count} APK(s)"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationTicket {
    pub operation_id: String,
    pub operation: OperationKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    Completed { count: usize },
    Empty,
    Failed { message: String },
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AppListEvent {
    Started {
        trace_id: String,
        operation: OperationKind,
    },
    Progress {
        trace_id: String,
        done: usize,
        total: usize,
        package_name: String,
    },
    Row {
        trace_id: String,
        row: AppRow,
    },
    Finished {
        trace_id: String,
        outcome: LoadOutcome,
        finished_at: String,
    },
    Notice {
        trace_id: String,
        level: NoticeLevel,
        title: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApkInstallErrorCode {
    Success,
    InstallFailedAlreadyExists,
    InstallFailedUpdateIncompatible,
    InstallFailedOlderSdk,
    InstallFailedVersionDowngrade,
    InstallFailedInsufficientStorage,
    InstallFailedUserRestricted,
    InstallFailedVerificationFailure,
    InstallParseFailedNotApk,
    InstallParseFailedNoCertificates,
    InstallFailedInvalidApk,
    InstallFailedNoMatchingAbis,
    InstallFailedTestOnly,
    UnknownError,
}

impl ApkInstallErrorCode {
    const FAILURES: [ApkInstallErrorCode; 12] = [
        ApkInstallErrorCode::InstallFailedAlreadyExists,
        ApkInstallErrorCode::InstallFailedUpdateIncompatible,
        ApkInstallErrorCode::InstallFailedOlderSdk,
        ApkInstallErrorCode::InstallFailedVersionDowngrade,
        ApkInstallErrorCode::InstallFailedInsufficientStorage,
        ApkInstallErrorCode::InstallFailedUserRestricted,
        ApkInstallErrorCode::InstallFailedVerificationFailure,
        ApkInstallErrorCode::InstallParseFailedNotApk,
        ApkInstallErrorCode::InstallParseFailedNoCertificates,
        ApkInstallErrorCode::InstallFailedInvalidApk,
        ApkInstallErrorCode::InstallFailedNoMatchingAbis,
        ApkInstallErrorCode::InstallFailedTestOnly,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            ApkInstallErrorCode::Success => "SUCCESS",
            ApkInstallErrorCode::InstallFailedAlreadyExists => "INSTALL_FAILED_ALREADY_EXISTS",
            ApkInstallErrorCode::InstallFailedUpdateIncompatible => {
                "INSTALL_FAILED_UPDATE_INCOMPATIBLE"
            }
            ApkInstallErrorCode::InstallFailedOlderSdk => "INSTALL_FAILED_OLDER_SDK",
            ApkInstallErrorCode::InstallFailedVersionDowngrade => {
                "INSTALL_FAILED_VERSION_DOWNGRADE"
            }
            ApkInstallErrorCode::InstallFailedInsufficientStorage => {
                "INSTALL_FAILED_INSUFFICIENT_STORAGE"
            }
            ApkInstallErrorCode::InstallFailedUserRestricted => "INSTALL_FAILED_USER_RESTRICTED",
            ApkInstallErrorCode::InstallFailedVerificationFailure => {
                "INSTALL_FAILED_VERIFICATION_FAILURE"
            }
            ApkInstallErrorCode::InstallParseFailedNotApk => "INSTALL_PARSE_FAILED_NOT_APK",
            ApkInstallErrorCode::InstallParseFailedNoCertificates => {
                "INSTALL_PARSE_FAILED_NO_CERTIFICATES"
            }
            ApkInstallErrorCode::InstallFailedInvalidApk => "INSTALL_FAILED_INVALID_APK",
            ApkInstallErrorCode::InstallFailedNoMatchingAbis => "INSTALL_FAILED_NO_MATCHING_ABIS",
            ApkInstallErrorCode::InstallFailedTestOnly => "INSTALL_FAILED_TEST_ONLY",
            ApkInstallErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ApkInstallErrorCode::Success => "Installation successful",
            ApkInstallErrorCode::InstallFailedAlreadyExists => {
                "App already installed with different signature"
            }
            ApkInstallErrorCode::InstallFailedUpdateIncompatible => {
                "Update incompatible with existing installation"
            }
            ApkInstallErrorCode::InstallFailedOlderSdk => {
                "Device Android version too old for this APK"
            }
            ApkInstallErrorCode::InstallFailedVersionDowngrade => {
                "Cannot downgrade an installed app"
            }
            ApkInstallErrorCode::InstallFailedInsufficientStorage => {
                "Not enough storage space on device"
            }
            ApkInstallErrorCode::InstallFailedUserRestricted => {
                "User restricted from installing apps"
            }
            ApkInstallErrorCode::InstallFailedVerificationFailure => "Package verification failed",
            ApkInstallErrorCode::InstallParseFailedNotApk => "File is not a valid APK",
            ApkInstallErrorCode::InstallParseFailedNoCertificates => "APK is not signed",
            ApkInstallErrorCode::InstallFailedInvalidApk => "APK file is corrupted or invalid",
            ApkInstallErrorCode::InstallFailedNoMatchingAbis => {
                "APK not compatible with device CPU architecture"
            }
            ApkInstallErrorCode::InstallFailedTestOnly => "Test-only APK",
            ApkInstallErrorCode::UnknownError => "Unknown installation error",
        }
    }

    /// Classifies `adb install` output. Failure markers are checked before `Success`.
    pub fn from_output(output: &str) -> Self {
        let upper = output.to_uppercase();
        if let Some(code) = Self::FAILURES
            .into_iter()
            .find(|code| upper.contains(code.code()))
        {
            return code;
        }
        if upper.contains("SUCCESS") {
            return ApkInstallErrorCode::Success;
        }
        ApkInstallErrorCode::UnknownError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_apk_error_code() {
        let output = "Performing Streamed Install\nadb: failed to install app.apk: Failure [INSTALL_FAILED_VERSION_DOWNGRADE]";
        let code = ApkInstallErrorCode::from_output(output);
        assert_eq!(code, ApkInstallErrorCode::InstallFailedVersionDowngrade);
        assert_eq!(ApkInstallErrorCode::from_output("Success"), ApkInstallErrorCode::Success);
        assert_eq!(ApkInstallErrorCode::from_output(""), ApkInstallErrorCode::UnknownError);
    }

    #[test]
    fn record_label_combines_name_and_package() {
        let record = AppRecord {
            package_name: "com.example".to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            icon_png: Vec::new(),
            icon_source: IconSource::Placeholder,
            metadata: MetadataStatus::Degraded,
        };
        assert_eq!(record.label(), "No Name Found (com.example)");
        let row = AppRow::from(&record);
        assert_eq!(row.label, record.label());
        assert!(row.icon_data_url.is_none());
    }

    #[test]
    fn events_serialize_with_tags() {
        let event = AppListEvent::Finished {
            trace_id: "t".to_string(),
            outcome: LoadOutcome::Completed { count: 2 },
            finished_at: "now".to_string(),
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["event"], "finished");
        assert_eq!(value["outcome"]["status"], "completed");
        assert_eq!(value["outcome"]["count"], 2);
    }
}
