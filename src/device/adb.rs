use std::cell::RefCell;
use std::process::Command;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::device::cache::BoundedCache;
use crate::error::{PilotError, PilotResult};

// ============================================================================
// Process runner
// ============================================================================

/// Captured result of one external command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> PilotResult<CommandOutput>;
}

/// Runs commands with `std::process::Command`.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> PilotResult<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| PilotError::CommandSpawn {
                program: program.to_string(),
                source: e,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

// ============================================================================
// adb
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub device_name: String,
    pub platform_version: String,
    pub device_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbSettings {
    pub program: String,
    pub info_cache_size: usize,
    pub apps_cache_size: usize,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            program: "adb".to_string(),
            info_cache_size: 5,
            apps_cache_size: 20,
        }
    }
}

/// Device queries over `adb -s <serial> shell ...`, memoized per serial.
pub struct Adb<R: CommandRunner> {
    runner: R,
    program: String,
    info_cache: RefCell<BoundedCache<String, DeviceInfo>>,
    apps_cache: RefCell<BoundedCache<String, Vec<String>>>,
}

impl<R: CommandRunner> Adb<R> {
    pub fn new(runner: R, settings: &AdbSettings) -> Self {
        Self {
            runner,
            program: settings.program.clone(),
            info_cache: RefCell::new(BoundedCache::new(settings.info_cache_size)),
            apps_cache: RefCell::new(BoundedCache::new(settings.apps_cache_size)),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn shell(&self, device_id: &str, command: &[&str]) -> PilotResult<String> {
        let mut args = vec!["-s", device_id, "shell"];
        args.extend_from_slice(command);
        debug!(program = %self.program, ?args, "running adb");

        let output = self.runner.run(&self.program, &args)?;
        if !output.success {
            return Err(PilotError::CommandFailed {
                program: format!("{} {}", self.program, args.join(" ")),
                status: output
                    .code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Model name and Android release of `device_id`.
    pub fn device_info(&self, device_id: &str) -> PilotResult<DeviceInfo> {
        self.info_cache
            .borrow_mut()
            .get_or_insert_with(device_id.to_string(), || {
                let device_name = self.shell(device_id, &["getprop", "ro.product.model"])?;
                let platform_version =
                    self.shell(device_id, &["getprop", "ro.build.version.release"])?;
                info!(device = device_id, model = %device_name, android = %platform_version, "device info");
                Ok(DeviceInfo {
                    device_name,
                    platform_version,
                    device_id: device_id.to_string(),
                })
            })
    }

    /// Package names installed on `device_id`.
    pub fn installed_packages(&self, device_id: &str) -> PilotResult<Vec<String>> {
        self.apps_cache
            .borrow_mut()
            .get_or_insert_with(device_id.to_string(), || {
                let stdout = self.shell(device_id, &["pm", "list", "packages"])?;
                let packages = parse_package_list(&stdout);
                debug!(device = device_id, count = packages.len(), "installed packages");
                Ok(packages)
            })
    }

    /// Package for the app called `name`, if one is installed.
    pub fn find_app_by_name(&self, name: &str, device_id: &str) -> PilotResult<Option<String>> {
        let packages = self.installed_packages(device_id)?;
        let found = match_app_package(name, &packages);
        if found.is_none() {
            warn!(app = name, device = device_id, "no installed package matches app name");
        }
        Ok(found)
    }
}

/// `package:<name>` lines from `pm list packages`.
pub fn parse_package_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Exact match on the last dotted segment wins; otherwise the first package
/// containing `name`. Both comparisons ignore case.
pub fn match_app_package(name: &str, packages: &[String]) -> Option<String> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    let exact = packages.iter().find(|p| {
        p.rsplit('.')
            .next()
            .is_some_and(|last| last.to_lowercase() == wanted)
    });

    exact
        .or_else(|| packages.iter().find(|p| p.to_lowercase().contains(&wanted)))
        .cloned()
}
