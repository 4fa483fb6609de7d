//! Detected stack models

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Project architecture as seen by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Static,
    Spa,
    Ssr,
    Api,
    Fullstack,
    Container,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Static => "static",
            ProjectType::Spa => "spa",
            ProjectType::Ssr => "ssr",
            ProjectType::Api => "api",
            ProjectType::Fullstack => "fullstack",
            ProjectType::Container => "container",
        }
    }

    /// Types that ship a running server rather than a directory of static files
    pub fn is_server_side(&self) -> bool {
        matches!(
            self,
            ProjectType::Api | ProjectType::Fullstack | ProjectType::Container
        )
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" => Ok(ProjectType::Static),
            "spa" => Ok(ProjectType::Spa),
            "ssr" => Ok(ProjectType::Ssr),
            "api" => Ok(ProjectType::Api),
            "fullstack" => Ok(ProjectType::Fullstack),
            "container" => Ok(ProjectType::Container),
            _ => Err(format!("Invalid project type: {}", s)),
        }
    }
}

/// JavaScript package manager, detected from lock files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    /// Shell command installing the project's dependencies
    pub fn install_command(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm install",
            PackageManager::Yarn => "yarn install",
            PackageManager::Pnpm => "pnpm install",
            PackageManager::Bun => "bun install",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a cloned repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedStack {
    #[serde(rename = "type")]
    pub project_type: ProjectType,

    /// Free-form framework label, "unknown" when nothing matched
    pub framework: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_cmd: Option<String>,

    /// Output directory relative to the workspace root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_hint: Option<u16>,

    pub package_manager: PackageManager,

    /// Runtime version declared by the manifest (`engines.node`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_version: Option<String>,

    pub has_dockerfile: bool,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl DetectedStack {
    /// Degraded classification used when the workspace cannot be analyzed
    pub fn fallback() -> Self {
        Self {
            project_type: ProjectType::Static,
            framework: "unknown".to_string(),
            build_cmd: None,
            dist_dir: None,
            port_hint: None,
            package_manager: PackageManager::Npm,
            node_version: None,
            has_dockerfile: false,
            dependencies: BTreeMap::new(),
        }
    }
}
