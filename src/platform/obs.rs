//! OBS Studio installation, plugin deployment and log inspection.

use crate::config::test_config::DEFAULT_PLUGIN_NAME;
use crate::domain::ports::CommandRunner;
use crate::platform::{copy_dir_all, PlatformInfo};
use crate::utils::error::{HarnessError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};
use tokio::process::Command;

/// Binaries below this size are almost certainly broken builds.
const MIN_PLUGIN_BINARY_SIZE: u64 = 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogSearch {
    pub found_log: bool,
    pub plugin_loaded: bool,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub portable: bool,
    pub verbose: bool,
    pub additional_args: Vec<String>,
    /// Terminate OBS after this long. `None` leaves it running.
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    pub status: Option<i32>,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginLoadCheck {
    pub loaded: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObsRequirements {
    pub platform: String,
    pub obs_installed: bool,
    pub obs_path: Option<String>,
    pub obs_version: Option<String>,
    pub plugin_installed: bool,
    pub plugin_path: String,
    pub plugin_binary: String,
    /// Verification issues, only collected when the plugin is installed.
    pub plugin_issues: Option<Vec<String>>,
}

impl ObsRequirements {
    pub fn render(&self) -> String {
        let mark = |ok: bool| if ok { "✅" } else { "❌" };
        let mut lines = vec![
            String::new(),
            "📊 OBS Testing Environment Status".to_string(),
            "=".repeat(50),
            format!("Platform: {}", self.platform),
            format!("OBS Installed: {}", mark(self.obs_installed)),
        ];
        if let Some(path) = &self.obs_path {
            lines.push(format!("OBS Path: {}", path));
        }
        if let Some(version) = &self.obs_version {
            lines.push(format!("OBS Version: {}", version));
        }
        lines.push(String::new());
        lines.push(format!("Plugin Installed: {}", mark(self.plugin_installed)));
        lines.push(format!("Plugin Directory: {}", self.plugin_path));
        lines.push(format!("Plugin Binary: {}", self.plugin_binary));

        match &self.plugin_issues {
            Some(issues) if issues.is_empty() => {
                lines.push("Plugin Verification: ✅ Valid".to_string());
            }
            Some(issues) => {
                lines.push("Plugin Verification: ❌ Issues found:".to_string());
                lines.extend(issues.iter().map(|issue| format!("  - {}", issue)));
            }
            None => {}
        }
        lines.push("=".repeat(50));
        lines.join("\n")
    }
}

/// First whitespace-separated token starting with a digit, else the whole
/// trimmed output. `"OBS Studio 30.0.2"` yields `"30.0.2"`.
pub fn parse_obs_version(output: &str) -> Option<String> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .split_whitespace()
        .find(|part| part.starts_with(|c: char| c.is_ascii_digit()))
        .map(str::to_string)
        .or_else(|| Some(trimmed.to_string()))
}

pub fn search_log(content: &str, plugin_name: &str) -> LogSearch {
    let needle = plugin_name.to_lowercase();
    let mut search = LogSearch {
        found_log: true,
        ..Default::default()
    };

    for line in content.lines() {
        let lower = line.to_lowercase();
        if !lower.contains(&needle) {
            continue;
        }
        search.messages.push(line.trim().to_string());
        if lower.contains("loaded") || lower.contains("initialized") {
            search.plugin_loaded = true;
        }
    }
    search
}

#[derive(Debug, Clone)]
pub struct ObsManager {
    platform: PlatformInfo,
    plugin_name: String,
    obs_exe: Option<PathBuf>,
    plugin_dir: PathBuf,
    log_dir: PathBuf,
    binary_name: String,
}

impl ObsManager {
    pub fn new(plugin_name: impl Into<String>) -> Result<Self> {
        Self::with_platform(PlatformInfo::detect(), plugin_name)
    }

    pub fn with_platform(platform: PlatformInfo, plugin_name: impl Into<String>) -> Result<Self> {
        let plugin_name = plugin_name.into();
        let plugin_dir = platform.plugin_install_path(&plugin_name)?;
        let log_dir = platform.obs_log_dir()?;
        let binary_name = platform.plugin_binary_name(&plugin_name);
        let obs_exe = platform.find_obs_executable();

        Ok(Self {
            platform,
            plugin_name,
            obs_exe,
            plugin_dir,
            log_dir,
            binary_name,
        })
    }

    pub fn with_default_plugin() -> Result<Self> {
        Self::new(DEFAULT_PLUGIN_NAME)
    }

    pub fn with_obs_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.obs_exe = Some(path.into());
        self
    }

    pub fn with_plugin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugin_dir = dir.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn platform(&self) -> &PlatformInfo {
        &self.platform
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn obs_executable(&self) -> Option<&Path> {
        self.obs_exe.as_deref()
    }

    pub fn is_obs_installed(&self) -> bool {
        self.obs_exe.as_deref().is_some_and(Path::exists)
    }

    pub async fn obs_version<R: CommandRunner>(&self, runner: &R) -> Option<String> {
        let exe = self.obs_exe.as_ref().filter(|p| p.exists())?;
        let output = runner
            .run(
                &exe.to_string_lossy(),
                &["--version".to_string()],
                Some(Duration::from_secs(5)),
            )
            .await
            .ok()?;
        if !output.success() {
            return None;
        }
        parse_obs_version(&output.stdout)
    }

    pub fn plugin_path(&self) -> &Path {
        &self.plugin_dir
    }

    pub fn plugin_binary_path(&self) -> PathBuf {
        self.plugin_dir.join(&self.binary_name)
    }

    pub fn is_plugin_installed(&self) -> bool {
        self.plugin_binary_path().exists()
    }

    /// Where a CMake build may have put the plugin binary, most likely first.
    pub fn binary_search_paths(&self, build_dir: &Path) -> Vec<PathBuf> {
        let name = &self.plugin_name;
        if self.platform.is_windows() {
            vec![
                build_dir.join("Release").join(format!("{}.dll", name)),
                build_dir.join("Debug").join(format!("{}.dll", name)),
                build_dir.join(format!("{}.dll", name)),
            ]
        } else if self.platform.is_macos() {
            vec![
                build_dir.join(format!("{}.so", name)),
                build_dir.join(format!("{}.dylib", name)),
                build_dir.join("Release").join(format!("{}.so", name)),
            ]
        } else {
            vec![
                build_dir.join(format!("{}.so", name)),
                build_dir.join("lib").join(format!("{}.so", name)),
            ]
        }
    }

    /// Copies the built binary (and `data/`, if present) into the plugin dir.
    pub fn install_plugin(&self, build_dir: &Path) -> Result<PathBuf> {
        tracing::info!("📦 Installing plugin from {}...", build_dir.display());
        std::fs::create_dir_all(&self.plugin_dir)?;

        let search_paths = self.binary_search_paths(build_dir);
        let source = search_paths
            .iter()
            .find(|p| p.exists())
            .ok_or_else(|| HarnessError::PluginBinaryNotFound {
                build_dir: build_dir.display().to_string(),
                searched: search_paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
            })?;

        let dest = self.plugin_binary_path();
        std::fs::copy(source, &dest)?;
        tracing::info!("✓ Copied {} to {}", source.display(), dest.display());

        let data_dir = build_dir.join("data");
        if data_dir.is_dir() {
            copy_dir_all(&data_dir, &self.plugin_dir.join("data"))?;
            tracing::info!("✓ Copied data directory");
        }

        tracing::info!("✅ Plugin installed successfully");
        Ok(dest)
    }

    /// Removing a plugin that is not installed succeeds.
    pub fn uninstall_plugin(&self) -> Result<()> {
        tracing::info!("🗑️ Uninstalling plugin from {}...", self.plugin_dir.display());
        if !self.plugin_dir.exists() {
            tracing::info!("   Plugin not installed");
            return Ok(());
        }
        std::fs::remove_dir_all(&self.plugin_dir)?;
        tracing::info!("✓ Plugin uninstalled");
        Ok(())
    }

    /// Empty when the installation looks complete.
    pub fn verify_plugin_installation(&self) -> Vec<String> {
        if !self.plugin_dir.exists() {
            return vec![format!(
                "Plugin directory does not exist: {}",
                self.plugin_dir.display()
            )];
        }

        let binary = self.plugin_binary_path();
        match std::fs::metadata(&binary) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                vec![format!("Plugin binary not found: {}", binary.display())]
            }
            Err(e) => vec![format!("Cannot read plugin binary: {}", e)],
            Ok(meta) if meta.len() < MIN_PLUGIN_BINARY_SIZE => {
                vec![format!("Plugin binary suspiciously small: {} bytes", meta.len())]
            }
            Ok(_) => Vec::new(),
        }
    }

    pub fn obs_log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Newest `*.txt` in the OBS log directory.
    pub fn latest_log_file(&self) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.log_dir).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
            .map(|path| {
                let modified = std::fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, path)| path)
    }

    /// Reads `log_file`, or the latest log when `None`. Invalid UTF-8 is replaced.
    pub fn read_log_file(&self, log_file: Option<&Path>) -> Option<String> {
        let path = match log_file {
            Some(path) => path.to_path_buf(),
            None => self.latest_log_file()?,
        };
        let bytes = std::fs::read(path).ok()?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn search_log_for_plugin(&self, log_file: Option<&Path>) -> LogSearch {
        match self.read_log_file(log_file) {
            Some(content) if !content.is_empty() => search_log(&content, &self.plugin_name),
            _ => LogSearch::default(),
        }
    }

    pub fn launch_args(options: &LaunchOptions) -> Vec<String> {
        let mut args = Vec::new();
        if options.portable {
            args.push("--portable".to_string());
        }
        if options.verbose {
            args.push("--verbose".to_string());
        }
        args.extend(options.additional_args.iter().cloned());
        args
    }

    /// Starts OBS. With a timeout, waits for it and kills it once the
    /// timeout passes; otherwise returns as soon as it is spawned.
    pub async fn launch_obs(&self, options: &LaunchOptions) -> Result<LaunchOutcome> {
        let exe = self
            .obs_exe
            .as_ref()
            .filter(|p| p.exists())
            .ok_or(HarnessError::ObsNotInstalled)?;
        let args = Self::launch_args(options);
        tracing::info!("🚀 Launching OBS: {} {}", exe.display(), args.join(" "));

        let mut child = Command::new(exe)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let Some(limit) = options.timeout else {
            return Ok(LaunchOutcome {
                status: None,
                timed_out: false,
            });
        };

        match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => Ok(LaunchOutcome {
                status: status?.code(),
                timed_out: false,
            }),
            Err(_) => {
                tracing::info!("⏱️ Timeout reached ({}s), terminating OBS...", limit.as_secs());
                child.kill().await?;
                Ok(LaunchOutcome {
                    status: None,
                    timed_out: true,
                })
            }
        }
    }

    /// Runs OBS minimised for `timeout`, then checks the newest log.
    pub async fn test_plugin_load(&self, timeout: Duration) -> PluginLoadCheck {
        let fail = |message: String| PluginLoadCheck {
            loaded: false,
            message,
        };

        if !self.is_obs_installed() {
            return fail("OBS Studio is not installed".to_string());
        }
        if !self.is_plugin_installed() {
            return fail(format!("Plugin {} is not installed", self.plugin_name));
        }

        tracing::info!("🧪 Testing plugin load (timeout: {}s)...", timeout.as_secs());
        let options = LaunchOptions {
            verbose: true,
            additional_args: vec!["--minimize-to-tray".to_string()],
            timeout: Some(timeout),
            ..Default::default()
        };
        if let Err(e) = self.launch_obs(&options).await {
            return fail(format!("Error testing plugin: {}", e));
        }

        // Give OBS a moment to flush its log.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let search = self.search_log_for_plugin(None);

        if search.plugin_loaded {
            PluginLoadCheck {
                loaded: true,
                message: format!(
                    "Plugin loaded successfully (found {} log entries)",
                    search.messages.len()
                ),
            }
        } else if !search.messages.is_empty() {
            fail(format!(
                "Plugin mentioned in logs but not loaded: {:?}",
                search.messages
            ))
        } else {
            fail("Plugin not mentioned in OBS logs".to_string())
        }
    }

    pub async fn check_obs_requirements<R: CommandRunner>(&self, runner: &R) -> ObsRequirements {
        let plugin_installed = self.is_plugin_installed();
        ObsRequirements {
            platform: self.platform.to_string(),
            obs_installed: self.is_obs_installed(),
            obs_path: self.obs_exe.as_ref().map(|p| p.display().to_string()),
            obs_version: self.obs_version(runner).await,
            plugin_installed,
            plugin_path: self.plugin_dir.display().to_string(),
            plugin_binary: self.plugin_binary_path().display().to_string(),
            plugin_issues: plugin_installed.then(|| self.verify_plugin_installation()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::OsKind;

    fn manager_in(home: &Path, os: OsKind) -> ObsManager {
        let platform = PlatformInfo::for_os(os, "x86_64", home, Some(home.join("AppData")));
        ObsManager::with_platform(platform, "obs-polyemesis").unwrap()
    }

    #[test]
    fn test_parse_obs_version() {
        assert_eq!(parse_obs_version("OBS Studio 30.0.2\n"), Some("30.0.2".to_string()));
        assert_eq!(parse_obs_version("obs 29.1.3-1"), Some("29.1.3-1".to_string()));
        assert_eq!(parse_obs_version("unknown build"), Some("unknown build".to_string()));
        assert_eq!(parse_obs_version("   "), None);
    }

    #[test]
    fn test_search_log() {
        let log = "\
12:00:01.000: Loading module: obs-polyemesis.so
12:00:01.100: [OBS-Polyemesis] Plugin loaded (version 0.9.0)
12:00:02.000: Unrelated line";
        let search = search_log(log, "obs-polyemesis");
        assert!(search.found_log);
        assert!(search.plugin_loaded);
        assert_eq!(search.messages.len(), 2);

        let search = search_log("12:00: obs-polyemesis: failed to start", "obs-polyemesis");
        assert!(!search.plugin_loaded);
        assert_eq!(search.messages.len(), 1);
    }

    #[test]
    fn test_install_verify_uninstall_linux() {
        let home = tempfile::tempdir().unwrap();
        let build = tempfile::tempdir().unwrap();
        let manager = manager_in(home.path(), OsKind::Linux);

        std::fs::create_dir_all(build.path().join("lib")).unwrap();
        std::fs::write(build.path().join("lib/obs-polyemesis.so"), vec![0u8; 4096]).unwrap();
        std::fs::create_dir_all(build.path().join("data/locale")).unwrap();
        std::fs::write(build.path().join("data/locale/en-US.ini"), "x").unwrap();

        assert!(!manager.is_plugin_installed());
        let dest = manager.install_plugin(build.path()).unwrap();
        assert!(dest.ends_with("obs-polyemesis/obs-polyemesis.so"));
        assert!(manager.is_plugin_installed());
        assert!(manager.plugin_path().join("data/locale/en-US.ini").exists());
        assert!(manager.verify_plugin_installation().is_empty());

        manager.uninstall_plugin().unwrap();
        assert!(!manager.plugin_path().exists());
        // Second uninstall is a no-op.
        manager.uninstall_plugin().unwrap();
    }

    #[test]
    fn test_install_missing_binary_lists_search_paths() {
        let home = tempfile::tempdir().unwrap();
        let build = tempfile::tempdir().unwrap();
        let manager = manager_in(home.path(), OsKind::Windows);

        match manager.install_plugin(build.path()) {
            Err(HarnessError::PluginBinaryNotFound { searched, .. }) => {
                assert_eq!(searched.len(), 3);
                assert!(searched[0].contains("Release"));
                assert!(searched[1].contains("Debug"));
            }
            other => panic!("expected PluginBinaryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_flags_small_binary() {
        let home = tempfile::tempdir().unwrap();
        let manager = manager_in(home.path(), OsKind::Linux);

        let issues = manager.verify_plugin_installation();
        assert!(issues[0].starts_with("Plugin directory does not exist"));

        std::fs::create_dir_all(manager.plugin_path()).unwrap();
        let issues = manager.verify_plugin_installation();
        assert!(issues[0].starts_with("Plugin binary not found"));

        std::fs::write(manager.plugin_binary_path(), b"tiny").unwrap();
        let issues = manager.verify_plugin_installation();
        assert_eq!(issues, vec!["Plugin binary suspiciously small: 4 bytes".to_string()]);
    }

    #[test]
    fn test_latest_log_file_and_search() {
        let home = tempfile::tempdir().unwrap();
        let logs = tempfile::tempdir().unwrap();
        let manager = manager_in(home.path(), OsKind::Linux).with_log_dir(logs.path());

        assert!(manager.latest_log_file().is_none());
        assert!(!manager.search_log_for_plugin(None).found_log);

        let old = logs.path().join("2024-01-01 10-00-00.txt");
        let new = logs.path().join("2024-01-02 10-00-00.txt");
        std::fs::write(&old, "obs-polyemesis initialized").unwrap();
        std::fs::write(logs.path().join("crash.dmp"), "binary").unwrap();
        std::fs::write(&new, "nothing relevant").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();

        assert_eq!(manager.latest_log_file(), Some(new));
        assert!(!manager.search_log_for_plugin(None).plugin_loaded);
        assert!(manager.search_log_for_plugin(Some(&old)).plugin_loaded);
    }

    #[test]
    fn test_launch_args() {
        let options = LaunchOptions {
            portable: true,
            verbose: true,
            additional_args: vec!["--minimize-to-tray".to_string()],
            timeout: None,
        };
        assert_eq!(
            ObsManager::launch_args(&options),
            vec!["--portable", "--verbose", "--minimize-to-tray"]
        );
    }

    #[tokio::test]
    async fn test_plugin_load_without_obs() {
        let home = tempfile::tempdir().unwrap();
        let manager = manager_in(home.path(), OsKind::Linux)
            .with_obs_executable(home.path().join("no-such-obs"));
        let check = manager.test_plugin_load(Duration::from_secs(1)).await;
        assert!(!check.loaded);
        assert_eq!(check.message, "OBS Studio is not installed");

        let launched = manager.launch_obs(&LaunchOptions::default()).await;
        assert!(matches!(launched, Err(HarnessError::ObsNotInstalled)));
    }

    #[test]
    fn test_requirements_render() {
        let requirements = ObsRequirements {
            platform: "Linux (x86_64)".to_string(),
            obs_installed: true,
            obs_path: Some("/usr/bin/obs".to_string()),
            obs_version: Some("30.0.2".to_string()),
            plugin_installed: true,
            plugin_path: "/home/u/.config/obs-studio/plugins/obs-polyemesis".to_string(),
            plugin_binary: "/home/u/.config/obs-studio/plugins/obs-polyemesis/obs-polyemesis.so"
                .to_string(),
            plugin_issues: Some(vec!["Plugin binary suspiciously small: 4 bytes".to_string()]),
        };
        let text = requirements.render();
        assert!(text.contains("Platform: Linux (x86_64)"));
        assert!(text.contains("OBS Version: 30.0.2"));
        assert!(text.contains("Plugin Verification: ❌ Issues found:"));
        assert!(text.contains("  - Plugin binary suspiciously small: 4 bytes"));
    }
}
