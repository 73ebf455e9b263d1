//! Build metadata
//!
//! Captured at compile time. `VM_METRICS_GIT_COMMIT` and
//! `VM_METRICS_BUILD_TIME` may be set in the build environment; both fall
//! back to `unknown`.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub git_commit: &'static str,
    pub build_time: &'static str,
    pub os: &'static str,
    pub arch: &'static str,
}

const UNKNOWN: &str = "unknown";

impl BuildInfo {
    pub const fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            git_commit: match option_env!("VM_METRICS_GIT_COMMIT") {
                Some(commit) => commit,
                None => UNKNOWN,
            },
            build_time: match option_env!("VM_METRICS_BUILD_TIME") {
                Some(time) => time,
                None => UNKNOWN,
            },
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        }
    }

    /// Just the version number.
    pub fn short(&self) -> &'static str {
        self.version
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.name, self.version)?;
        writeln!(f, "  commit:     {}", self.git_commit)?;
        writeln!(f, "  built:      {}", self.build_time)?;
        write!(f, "  platform:   {}/{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_reports_package() {
        let info = BuildInfo::current();
        assert_eq!(info.name, "vm-metrics");
        assert_eq!(info.short(), env!("CARGO_PKG_VERSION"));
        assert!(info.to_string().starts_with("vm-metrics "));
    }

    #[test]
    fn test_json_fields() {
        let value = serde_json::to_value(BuildInfo::current()).unwrap();
        for key in ["name", "version", "git_commit", "build_time", "os", "arch"] {
            assert!(value.get(key).is_some(), "{key}");
        }
    }
}
