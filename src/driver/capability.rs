use serde::{Deserialize, Serialize};
use tracing::warn;

/// Launch method requested in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchPreference {
    /// Pick from the server version and the configured activity
    #[default]
    Auto,
    LaunchApp,
    StartActivity,
    ActivateApp,
}

/// Launch method a session is bound to. Resolved once at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchCapability {
    /// Legacy `appium/app/launch` (Appium 1.x servers)
    LaunchApp,
    /// `mobile: startActivity` with `package/activity`
    StartActivity,
    /// `appium/device/activate_app` by package id
    ActivateApp,
}

impl LaunchCapability {
    /// Resolve the launch method.
    ///
    /// An explicit preference wins, except `StartActivity` without an
    /// activity, which falls back to `ActivateApp`. `Auto` uses the legacy
    /// endpoint on 1.x servers, else `StartActivity` when an activity is
    /// known, else `ActivateApp`.
    pub fn resolve(
        preference: LaunchPreference,
        server_version: Option<&str>,
        has_activity: bool,
    ) -> Self {
        match preference {
            LaunchPreference::LaunchApp => LaunchCapability::LaunchApp,
            LaunchPreference::ActivateApp => LaunchCapability::ActivateApp,
            LaunchPreference::StartActivity if has_activity => LaunchCapability::StartActivity,
            LaunchPreference::StartActivity => {
                warn!("start_activity requested but no activity configured; using activate_app");
                LaunchCapability::ActivateApp
            }
            LaunchPreference::Auto => match server_version.and_then(major_version) {
                Some(major) if major < 2 => LaunchCapability::LaunchApp,
                _ if has_activity => LaunchCapability::StartActivity,
                _ => LaunchCapability::ActivateApp,
            },
        }
    }
}

/// Leading numeric component of a dotted version string.
pub fn major_version(version: &str) -> Option<u32> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .next()
        .and_then(|m| m.parse().ok())
}
