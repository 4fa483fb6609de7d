//! Stack detection
//!
//! Classification is split in two: an async scan that snapshots the file names
//! and manifests of a workspace into [`ProjectFiles`], and a pure
//! [`StackDetector::classify`] over that snapshot. Rules are evaluated in order
//! and the first match wins, so meta-frameworks sit above the UI libraries they
//! build on and specific frameworks above generic fallbacks.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use crate::errors::DeployError;
use crate::models::stack::{DetectedStack, PackageManager, ProjectType};

/// Directory levels below the workspace root that are scanned
pub const SCAN_DEPTH: usize = 2;

/// Hidden files that are still collected
const DOCKERFILE_NAMES: &[&str] = &["Dockerfile", "dockerfile", ".dockerfile"];

/// Lock files in priority order
const LOCKFILES: &[(&str, PackageManager)] = &[
    ("bun.lockb", PackageManager::Bun),
    ("bun.lock", PackageManager::Bun),
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("yarn.lock", PackageManager::Yarn),
];

const DEFAULT_BUILD_CMD: &str = "npm run build";
const PIP_INSTALL_CMD: &str = "pip install -r requirements.txt";

/// The parts of a `package.json` the rules read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageManifest {
    pub main: Option<String>,
    pub scripts: BTreeMap<String, String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub engines: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Parse leniently: non-string entries are ignored, invalid JSON yields `None`
    pub fn parse(contents: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(contents).ok()?;
        let object = value.as_object()?;

        let string_map = |key: &str| -> BTreeMap<String, String> {
            object
                .get(key)
                .and_then(Value::as_object)
                .map(|map| {
                    map.iter()
                        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                        .collect()
                })
                .unwrap_or_default()
        };

        Some(Self {
            main: object.get("main").and_then(Value::as_str).map(str::to_string),
            scripts: string_map("scripts"),
            dependencies: string_map("dependencies"),
            dev_dependencies: string_map("devDependencies"),
            engines: string_map("engines"),
        })
    }

    fn script(&self, name: &str) -> Option<String> {
        self.scripts.get(name).cloned()
    }
}

/// Snapshot of a workspace that classification runs on
#[derive(Debug, Clone, Default)]
pub struct ProjectFiles {
    /// Names of files found within [`SCAN_DEPTH`]
    pub files: BTreeSet<String>,

    /// Names of entries directly in the workspace root
    pub root_files: BTreeSet<String>,

    /// Parsed root `package.json`
    pub manifest: Option<PackageManifest>,

    /// Lowercased contents of `requirements.txt` and `pyproject.toml`
    pub python_requirements: Option<String>,
}

impl ProjectFiles {
    /// Snapshot from plain file names, all treated as living in the root
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        Self {
            root_files: files.clone(),
            files,
            manifest: None,
            python_requirements: None,
        }
    }

    pub fn with_manifest(mut self, manifest: PackageManifest) -> Self {
        self.files.insert("package.json".to_string());
        self.root_files.insert("package.json".to_string());
        self.manifest = Some(manifest);
        self
    }

    pub fn with_python_requirements(mut self, contents: &str) -> Self {
        self.python_requirements = Some(contents.to_lowercase());
        self
    }

    fn has_file(&self, name: &str) -> bool {
        self.files.contains(name)
    }
}

/// What a matching rule contributes to the final stack
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature {
    project_type: ProjectType,
    framework: String,
    build_cmd: Option<String>,
    dist_dir: Option<String>,
    port_hint: Option<u16>,
}

impl Signature {
    fn new(project_type: ProjectType, framework: &str) -> Self {
        Self {
            project_type,
            framework: framework.to_string(),
            build_cmd: None,
            dist_dir: None,
            port_hint: None,
        }
    }

    fn build(mut self, cmd: impl Into<String>) -> Self {
        self.build_cmd = Some(cmd.into());
        self
    }

    fn maybe_build(mut self, cmd: Option<String>) -> Self {
        self.build_cmd = cmd;
        self
    }

    fn dist(mut self, dir: &str) -> Self {
        self.dist_dir = Some(dir.to_string());
        self
    }

    fn port(mut self, port: u16) -> Self {
        self.port_hint = Some(port);
        self
    }
}

/// Inputs handed to each rule
struct RuleInput<'a> {
    project: &'a ProjectFiles,
    // runtime and dev dependencies merged
    deps: BTreeSet<&'a str>,
}

impl RuleInput<'_> {
    fn has_dep(&self, name: &str) -> bool {
        self.deps.contains(name)
    }

    fn script(&self, name: &str) -> Option<String> {
        self.project.manifest.as_ref().and_then(|m| m.script(name))
    }
}

struct Rule {
    name: &'static str,
    check: fn(&RuleInput<'_>) -> Option<Signature>,
}

const RULES: &[Rule] = &[
    Rule { name: "next", check: next_js },
    Rule { name: "remix", check: remix },
    Rule { name: "gatsby", check: gatsby },
    Rule { name: "nuxt", check: nuxt },
    Rule { name: "vue-cli", check: vue_cli },
    Rule { name: "angular", check: angular },
    Rule { name: "svelte", check: svelte },
    Rule { name: "express", check: express },
    Rule { name: "nestjs", check: nestjs },
    Rule { name: "fastify", check: fastify },
    Rule { name: "vite", check: vite },
    Rule { name: "eleventy", check: eleventy },
    Rule { name: "react", check: react },
    Rule { name: "node", check: generic_node },
    Rule { name: "static-html", check: static_html },
    Rule { name: "python", check: python },
];

fn next_js(input: &RuleInput<'_>) -> Option<Signature> {
    input.has_dep("next").then(|| {
        Signature::new(ProjectType::Ssr, "Next.js")
            .build(DEFAULT_BUILD_CMD)
            .dist(".next")
            .port(3000)
    })
}

fn remix(input: &RuleInput<'_>) -> Option<Signature> {
    (input.has_dep("@remix-run/node") || input.has_dep("@remix-run/dev")).then(|| {
        Signature::new(ProjectType::Ssr, "Remix")
            .build(DEFAULT_BUILD_CMD)
            .dist("build")
            .port(3000)
    })
}

fn gatsby(input: &RuleInput<'_>) -> Option<Signature> {
    input.has_dep("gatsby").then(|| {
        Signature::new(ProjectType::Static, "Gatsby")
            .build(DEFAULT_BUILD_CMD)
            .dist("public")
    })
}

fn nuxt(input: &RuleInput<'_>) -> Option<Signature> {
    input.has_dep("nuxt").then(|| {
        Signature::new(ProjectType::Ssr, "Nuxt.js")
            .build(DEFAULT_BUILD_CMD)
            .dist(".nuxt/dist")
            .port(3000)
    })
}

fn vue_cli(input: &RuleInput<'_>) -> Option<Signature> {
    (input.has_dep("@vue/cli-service") || input.project.has_file("vue.config.js")).then(|| {
        Signature::new(ProjectType::Spa, "Vue.js")
            .build(DEFAULT_BUILD_CMD)
            .dist("dist")
    })
}

fn angular(input: &RuleInput<'_>) -> Option<Signature> {
    (input.has_dep("@angular/core") || input.project.has_file("angular.json")).then(|| {
        Signature::new(ProjectType::Spa, "Angular")
            .build(DEFAULT_BUILD_CMD)
            .dist("dist")
    })
}

fn svelte(input: &RuleInput<'_>) -> Option<Signature> {
    input.has_dep("svelte").then(|| {
        Signature::new(ProjectType::Spa, "Svelte")
            .build(DEFAULT_BUILD_CMD)
            .dist("dist")
    })
}

fn express(input: &RuleInput<'_>) -> Option<Signature> {
    input.has_dep("express").then(|| {
        Signature::new(ProjectType::Api, "Express.js")
            .build(input.script("build").unwrap_or_else(|| DEFAULT_BUILD_CMD.to_string()))
            .port(3000)
    })
}

fn nestjs(input: &RuleInput<'_>) -> Option<Signature> {
    input.has_dep("@nestjs/core").then(|| {
        Signature::new(ProjectType::Api, "NestJS")
            .build(DEFAULT_BUILD_CMD)
            .dist("dist")
            .port(3000)
    })
}

fn fastify(input: &RuleInput<'_>) -> Option<Signature> {
    input.has_dep("fastify").then(|| {
        Signature::new(ProjectType::Api, "Fastify")
            .build(input.script("build").unwrap_or_else(|| "npm start".to_string()))
            .port(3000)
    })
}

fn vite(input: &RuleInput<'_>) -> Option<Signature> {
    if !input.has_dep("vite") {
        return None;
    }
    let framework = if input.has_dep("react") {
        "React (Vite)"
    } else if input.has_dep("vue") {
        "Vue (Vite)"
    } else {
        "Vite"
    };
    Some(
        Signature::new(ProjectType::Spa, framework)
            .build(DEFAULT_BUILD_CMD)
            .dist("dist"),
    )
}

fn eleventy(input: &RuleInput<'_>) -> Option<Signature> {
    input.has_dep("@11ty/eleventy").then(|| {
        Signature::new(ProjectType::Static, "11ty")
            .build(DEFAULT_BUILD_CMD)
            .dist("_site")
    })
}

fn react(input: &RuleInput<'_>) -> Option<Signature> {
    (input.has_dep("react") && !input.has_dep("next")).then(|| {
        Signature::new(ProjectType::Spa, "React")
            .build(input.script("build").unwrap_or_else(|| DEFAULT_BUILD_CMD.to_string()))
            .dist("build")
    })
}

fn generic_node(input: &RuleInput<'_>) -> Option<Signature> {
    let manifest = input.project.manifest.as_ref()?;
    manifest.main.as_ref()?;
    Some(
        Signature::new(ProjectType::Api, "Node.js")
            .maybe_build(manifest.script("build"))
            .port(3000),
    )
}

fn static_html(input: &RuleInput<'_>) -> Option<Signature> {
    input
        .project
        .has_file("index.html")
        .then(|| Signature::new(ProjectType::Static, "Static HTML").dist("."))
}

fn python(input: &RuleInput<'_>) -> Option<Signature> {
    let project = input.project;
    if !project.has_file("requirements.txt") && !project.has_file("pyproject.toml") {
        return None;
    }
    let requirements = project.python_requirements.as_deref().unwrap_or("");
    let install = if project.has_file("requirements.txt") {
        PIP_INSTALL_CMD
    } else {
        "pip install ."
    };

    let signature = if requirements.contains("django") {
        Signature::new(ProjectType::Api, "Django").port(8000)
    } else if requirements.contains("flask") {
        Signature::new(ProjectType::Api, "Flask").port(5000)
    } else {
        Signature::new(ProjectType::Api, "Python").port(8000)
    };
    Some(signature.build(install))
}

/// Classifies cloned repositories
#[derive(Debug, Clone, Copy, Default)]
pub struct StackDetector;

impl StackDetector {
    pub fn new() -> Self {
        Self
    }

    /// Analyze a workspace. Never fails: any scan error degrades to
    /// [`DetectedStack::fallback`].
    pub async fn analyze(&self, workspace_dir: &Path) -> DetectedStack {
        match scan_project(workspace_dir).await {
            Ok(project) => self.classify(&project),
            Err(e) => {
                warn!(
                    "Could not analyze {}, using fallback classification: {}",
                    workspace_dir.display(),
                    e
                );
                DetectedStack::fallback()
            }
        }
    }

    /// Classify a workspace snapshot
    pub fn classify(&self, project: &ProjectFiles) -> DetectedStack {
        let deps: BTreeSet<&str> = project
            .manifest
            .iter()
            .flat_map(|m| m.dependencies.keys().chain(m.dev_dependencies.keys()))
            .map(String::as_str)
            .collect();
        let input = RuleInput { project, deps };

        let matched = RULES
            .iter()
            .find_map(|rule| (rule.check)(&input).map(|signature| (rule.name, signature)));

        let has_dockerfile = DOCKERFILE_NAMES.iter().any(|name| project.has_file(name));
        let signature = match matched {
            Some((name, signature)) => {
                debug!("Stack rule '{}' matched: {}", name, signature.framework);
                signature
            }
            // a bare Dockerfile still describes how to run the project
            None if has_dockerfile => Signature::new(ProjectType::Container, "Docker"),
            None => Signature::new(ProjectType::Static, "unknown"),
        };

        DetectedStack {
            project_type: signature.project_type,
            framework: signature.framework,
            build_cmd: signature.build_cmd,
            dist_dir: signature.dist_dir,
            port_hint: signature.port_hint,
            package_manager: detect_package_manager(&project.root_files),
            node_version: project
                .manifest
                .as_ref()
                .and_then(|m| m.engines.get("node").cloned()),
            has_dockerfile,
            dependencies: project
                .manifest
                .as_ref()
                .map(|m| m.dependencies.clone())
                .unwrap_or_default(),
        }
    }
}

/// Names of the rules in evaluation order
pub fn rule_names() -> Vec<&'static str> {
    RULES.iter().map(|rule| rule.name).collect()
}

fn detect_package_manager(root_files: &BTreeSet<String>) -> PackageManager {
    LOCKFILES
        .iter()
        .find(|(lockfile, _)| root_files.contains(*lockfile))
        .map(|(_, manager)| *manager)
        .unwrap_or_default()
}

fn is_collected(name: &str) -> bool {
    !name.starts_with('.') || DOCKERFILE_NAMES.contains(&name)
}

/// Snapshot a workspace: bounded-depth file names plus root manifests
pub async fn scan_project(workspace_dir: &Path) -> Result<ProjectFiles, DeployError> {
    let mut project = ProjectFiles::default();
    let mut pending: Vec<(PathBuf, usize)> = vec![(workspace_dir.to_path_buf(), 0)];

    while let Some((dir, depth)) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // The root must be readable; unreadable subdirectories are skipped
            Err(e) if depth == 0 => return Err(e.into()),
            Err(_) => continue,
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if depth == 0 {
                project.root_files.insert(name.clone());
            }
            if !is_collected(&name) {
                continue;
            }

            let file_type = entry.file_type().await?;
            if file_type.is_file() {
                project.files.insert(name);
            } else if file_type.is_dir() && depth < SCAN_DEPTH {
                pending.push((entry.path(), depth + 1));
            }
        }
    }

    if project.root_files.contains("package.json") {
        project.manifest = fs::read_to_string(workspace_dir.join("package.json"))
            .await
            .ok()
            .and_then(|contents| PackageManifest::parse(&contents));
    }

    let mut requirements = String::new();
    for name in ["requirements.txt", "pyproject.toml"] {
        if project.root_files.contains(name) {
            if let Ok(contents) = fs::read_to_string(workspace_dir.join(name)).await {
                requirements.push_str(&contents.to_lowercase());
                requirements.push('\n');
            }
        }
    }
    if !requirements.is_empty() {
        project.python_requirements = Some(requirements);
    }

    Ok(project)
}
