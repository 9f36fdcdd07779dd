//! Locates the hostfxr library the way the platform's `nethost` does.
//!
//! Exactly one dotnet root is chosen: `DOTNET_ROOT_<ARCH>` or `DOTNET_ROOT`
//! when set, else the registered install location, else the default one.
//! hostfxr must then be in that root; other roots are never tried.

use crate::error::{HostError, Result};
use crate::pal::{self, HOSTFXR_LIBRARY_NAME};
use std::cmp::Ordering;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides discovery with an exact library path.
pub const HOSTFXR_PATH_ENV: &str = "RUSTFXR_HOSTFXR_PATH";

/// Path of the hostfxr library to load.
pub fn hostfxr_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(HOSTFXR_PATH_ENV) {
        debug!("Using hostfxr from {}: {:?}", HOSTFXR_PATH_ENV, path);
        return Ok(PathBuf::from(path));
    }

    let root = select_root(
        environment_root(),
        registered_install_location(),
        &default_install_locations(),
    )
    .ok_or_else(|| {
        HostError::HostFxrNotFound(
            "no dotnet root found; set DOTNET_ROOT or install the .NET runtime".to_string(),
        )
    })?;
    debug!("Using dotnet root {}", root.display());

    let path = find_in_root(&root)?;
    debug!("Found hostfxr at {}", path.display());
    Ok(path)
}

/// The first configured root wins. Default locations only count when they
/// exist on disk.
fn select_root(environment : Option<PathBuf>, registered : Option<PathBuf>, defaults : &[PathBuf]) -> Option<PathBuf> {
    environment
        .or(registered)
        .or_else(|| defaults.iter().find(|dir| dir.is_dir()).cloned())
}

fn environment_root() -> Option<PathBuf> {
    let arch_var = format!("DOTNET_ROOT_{}", pal::arch_name().to_uppercase());
    [arch_var.as_str(), "DOTNET_ROOT"]
        .iter()
        .find_map(|var| env::var_os(var).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
}

#[cfg(unix)]
fn registered_install_location() -> Option<PathBuf> {
    let config_dir = Path::new("/etc/dotnet");
    let arch_file = config_dir.join(format!("install_location_{}", pal::arch_name()));
    [arch_file, config_dir.join("install_location")]
        .iter()
        .find_map(|file| read_install_location(file))
}

#[cfg(not(unix))]
fn registered_install_location() -> Option<PathBuf> {
    None
}

fn read_install_location(file : &Path) -> Option<PathBuf> {
    let contents = fs::read_to_string(file).ok()?;
    let line = contents.lines().next()?.trim();
    if line.is_empty() {
        None
    } else {
        Some(PathBuf::from(line))
    }
}

#[cfg(windows)]
fn default_install_locations() -> Vec<PathBuf> {
    env::var_os("ProgramFiles")
        .map(|dir| vec![PathBuf::from(dir).join("dotnet")])
        .unwrap_or_default()
}

#[cfg(target_os = "macos")]
fn default_install_locations() -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/local/share/dotnet")]
}

#[cfg(all(unix, not(target_os = "macos")))]
fn default_install_locations() -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/share/dotnet"), PathBuf::from("/usr/lib/dotnet")]
}

/// `<root>/host/fxr/<highest version>/<library>`. The highest version
/// directory must contain the library; older versions are not a fallback.
pub fn find_in_root(root : &Path) -> Result<PathBuf> {
    let fxr_dir = root.join("host").join("fxr");
    let entries = fs::read_dir(&fxr_dir)
        .map_err(|e| HostError::HostFxrNotFound(format!("cannot read {}: {}", fxr_dir.display(), e)))?;

    let (version, dir) = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let version = FxrVersion::parse(entry.file_name().to_str()?)?;
            Some((version, entry.path()))
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .ok_or_else(|| HostError::HostFxrNotFound(format!("no version directory under {}", fxr_dir.display())))?;

    let library = dir.join(HOSTFXR_LIBRARY_NAME);
    if !library.is_file() {
        return Err(HostError::HostFxrNotFound(format!(
            "{} is missing from hostfxr {}",
            library.display(),
            version
        )));
    }
    Ok(library)
}

/// Version directory name under `host/fxr`, e.g. `8.0.11` or
/// `9.0.0-rc.2.24473.5`. Ordered by semver precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxrVersion {
    major : u64,
    minor : u64,
    patch : u64,
    pre : Option<String>,
}

impl FxrVersion {
    pub fn parse(text : &str) -> Option<FxrVersion> {
        let (core, pre) = match text.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (text, None),
        };
        let mut parts = core.split('.').map(|p| p.parse::<u64>().ok());
        let major = parts.next()??;
        let minor = parts.next()??;
        let patch = parts.next()??;
        if parts.next().is_some() {
            return None;
        }
        Some(FxrVersion { major, minor, patch, pre })
    }
}

impl std::fmt::Display for FxrVersion {
    fn fmt(&self, f : &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

/// Numeric identifiers compare as numbers and sort before alphanumeric ones;
/// when one list is a prefix of the other, the shorter one is lower.
fn compare_prerelease(a : &str, b : &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match (x.parse::<u64>(), y.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => x.cmp(y),
            },
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

impl Ord for FxrVersion {
    fn cmp(&self, other : &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }
}

impl PartialOrd for FxrVersion {
    fn partial_cmp(&self, other : &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
