pub mod command;
pub mod docker;
pub mod obs;

pub use command::SystemCommandRunner;
pub use obs::ObsManager;

use crate::utils::error::{HarnessError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl OsKind {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => OsKind::Windows,
            "macos" => OsKind::MacOs,
            "linux" => OsKind::Linux,
            _ => OsKind::Other,
        }
    }

    pub fn system_name(&self) -> &'static str {
        match self {
            OsKind::Windows => "Windows",
            OsKind::MacOs => "Darwin",
            OsKind::Linux => "Linux",
            OsKind::Other => std::env::consts::OS,
        }
    }
}

/// Host description used to locate OBS and Docker. All paths are derived
/// from the fields, so other platforms can be described in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformInfo {
    pub os: OsKind,
    pub machine: String,
    pub home: PathBuf,
    /// `%APPDATA%`; only consulted on Windows.
    pub appdata: Option<PathBuf>,
}

impl PlatformInfo {
    pub fn detect() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let appdata = std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .or_else(dirs::config_dir);
        Self::for_os(OsKind::current(), std::env::consts::ARCH, home, appdata)
    }

    pub fn for_os(
        os: OsKind,
        machine: impl Into<String>,
        home: impl Into<PathBuf>,
        appdata: Option<PathBuf>,
    ) -> Self {
        Self {
            os,
            machine: machine.into(),
            home: home.into(),
            appdata,
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == OsKind::Windows
    }

    pub fn is_macos(&self) -> bool {
        self.os == OsKind::MacOs
    }

    pub fn is_linux(&self) -> bool {
        self.os == OsKind::Linux
    }

    fn unsupported(&self) -> HarnessError {
        HarnessError::UnsupportedPlatform {
            system: self.os.system_name().to_string(),
        }
    }

    fn appdata_dir(&self) -> PathBuf {
        self.appdata
            .clone()
            .unwrap_or_else(|| self.home.join("AppData").join("Roaming"))
    }

    /// Per-user directory OBS scans for third-party plugins.
    pub fn obs_plugin_dir(&self) -> Result<PathBuf> {
        match self.os {
            OsKind::Windows => Ok(self.appdata_dir().join("obs-studio").join("plugins")),
            OsKind::MacOs => Ok(self
                .home
                .join("Library")
                .join("Application Support")
                .join("obs-studio")
                .join("plugins")),
            OsKind::Linux => Ok(self.home.join(".config").join("obs-studio").join("plugins")),
            OsKind::Other => Err(self.unsupported()),
        }
    }

    pub fn obs_executable_name(&self) -> Result<&'static str> {
        match self.os {
            OsKind::Windows => Ok("obs64.exe"),
            OsKind::MacOs => Ok("OBS"),
            OsKind::Linux => Ok("obs"),
            OsKind::Other => Err(self.unsupported()),
        }
    }

    pub fn obs_log_dir(&self) -> Result<PathBuf> {
        match self.os {
            OsKind::Windows => Ok(self.appdata_dir().join("obs-studio").join("logs")),
            OsKind::MacOs => Ok(self
                .home
                .join("Library")
                .join("Application Support")
                .join("obs-studio")
                .join("logs")),
            OsKind::Linux => Ok(self.home.join(".config").join("obs-studio").join("logs")),
            OsKind::Other => Err(self.unsupported()),
        }
    }

    /// `<name>.dll` on Windows, `<name>.so` elsewhere.
    pub fn plugin_binary_name(&self, plugin_name: &str) -> String {
        if self.is_windows() {
            format!("{}.dll", plugin_name)
        } else {
            format!("{}.so", plugin_name)
        }
    }

    pub fn plugin_install_path(&self, plugin_name: &str) -> Result<PathBuf> {
        Ok(self.obs_plugin_dir()?.join(plugin_name))
    }

    pub fn docker_socket(&self) -> &'static str {
        if self.is_windows() {
            "npipe:////./pipe/docker_engine"
        } else {
            "unix:///var/run/docker.sock"
        }
    }

    /// Well-known install locations, most likely first.
    pub fn obs_search_paths(&self) -> Vec<PathBuf> {
        match self.os {
            OsKind::Windows => vec![
                PathBuf::from(r"C:\Program Files\obs-studio\bin\64bit\obs64.exe"),
                PathBuf::from(r"C:\Program Files (x86)\obs-studio\bin\64bit\obs64.exe"),
            ],
            OsKind::MacOs => vec![
                PathBuf::from("/Applications/OBS.app/Contents/MacOS/OBS"),
                self.home.join("Applications/OBS.app/Contents/MacOS/OBS"),
            ],
            OsKind::Linux => vec![
                PathBuf::from("/usr/bin/obs"),
                PathBuf::from("/usr/local/bin/obs"),
                PathBuf::from("/snap/bin/obs"),
                PathBuf::from("/var/lib/flatpak/exports/bin/com.obsproject.Studio"),
            ],
            OsKind::Other => Vec::new(),
        }
    }

    /// Known install locations first, then `PATH`.
    pub fn find_obs_executable(&self) -> Option<PathBuf> {
        if let Some(found) = self.obs_search_paths().into_iter().find(|p| p.exists()) {
            return Some(found);
        }
        let name = self.obs_executable_name().ok()?;
        command::find_in_path(name)
    }
}

impl fmt::Display for PlatformInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.os.system_name(), self.machine)
    }
}

/// Recursively copies `src` into `dst`, creating directories as needed.
pub(crate) fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linux() -> PlatformInfo {
        PlatformInfo::for_os(OsKind::Linux, "x86_64", "/home/tester", None)
    }

    fn macos() -> PlatformInfo {
        PlatformInfo::for_os(OsKind::MacOs, "arm64", "/Users/tester", None)
    }

    fn windows() -> PlatformInfo {
        PlatformInfo::for_os(
            OsKind::Windows,
            "AMD64",
            r"C:\Users\tester",
            Some(PathBuf::from(r"C:\Users\tester\AppData\Roaming")),
        )
    }

    #[test]
    fn test_plugin_dirs() {
        assert_eq!(
            linux().obs_plugin_dir().unwrap(),
            PathBuf::from("/home/tester/.config/obs-studio/plugins")
        );
        assert_eq!(
            macos().obs_plugin_dir().unwrap(),
            PathBuf::from("/Users/tester/Library/Application Support/obs-studio/plugins")
        );
        let win = windows().obs_plugin_dir().unwrap();
        assert!(win.ends_with(PathBuf::from("obs-studio").join("plugins")));
        assert!(win.starts_with(r"C:\Users\tester\AppData\Roaming"));
    }

    #[test]
    fn test_executable_and_binary_names() {
        assert_eq!(linux().obs_executable_name().unwrap(), "obs");
        assert_eq!(macos().obs_executable_name().unwrap(), "OBS");
        assert_eq!(windows().obs_executable_name().unwrap(), "obs64.exe");

        assert_eq!(linux().plugin_binary_name("obs-polyemesis"), "obs-polyemesis.so");
        assert_eq!(macos().plugin_binary_name("obs-polyemesis"), "obs-polyemesis.so");
        assert_eq!(windows().plugin_binary_name("obs-polyemesis"), "obs-polyemesis.dll");
    }

    #[test]
    fn test_docker_socket() {
        assert_eq!(linux().docker_socket(), "unix:///var/run/docker.sock");
        assert_eq!(windows().docker_socket(), "npipe:////./pipe/docker_engine");
    }

    #[test]
    fn test_unsupported_platform() {
        let other = PlatformInfo::for_os(OsKind::Other, "riscv64", "/home/x", None);
        assert!(matches!(
            other.obs_plugin_dir(),
            Err(HarnessError::UnsupportedPlatform { .. })
        ));
        assert!(other.obs_executable_name().is_err());
        assert!(other.obs_search_paths().is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(linux().to_string(), "Linux (x86_64)");
        assert_eq!(macos().to_string(), "Darwin (arm64)");
    }

    #[test]
    fn test_copy_dir_all() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("locale")).unwrap();
        std::fs::write(src.path().join("locale").join("en-US.ini"), "Name=Polyemesis").unwrap();

        copy_dir_all(src.path(), &dst.path().join("data")).unwrap();

        let copied = std::fs::read_to_string(dst.path().join("data/locale/en-US.ini")).unwrap();
        assert_eq!(copied, "Name=Polyemesis");
    }

    #[test]
    fn test_copy_dir_all_nested_and_empty_dirs() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("themes/dark/icons")).unwrap();
        std::fs::create_dir_all(src.path().join("empty")).unwrap();
        std::fs::write(src.path().join("themes/dark/icons/play.svg"), "<svg/>").unwrap();
        std::fs::write(src.path().join("README"), "data").unwrap();

        let target = dst.path().join("data");
        copy_dir_all(src.path(), &target).unwrap();

        assert!(target.join("empty").is_dir());
        assert_eq!(std::fs::read_to_string(target.join("README")).unwrap(), "data");
        assert_eq!(
            std::fs::read_to_string(target.join("themes/dark/icons/play.svg")).unwrap(),
            "<svg/>"
        );
    }
}
