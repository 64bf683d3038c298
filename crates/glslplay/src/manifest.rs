//! Optional `playground.toml` describing a shader directory: a display
//! name, the ordered source lists for both stages, and the driver preamble
//! line count for diagnostic correction. A directory without a manifest
//! falls back to the classic file set (`vertex.glsl`, `prelude.glsl` +
//! `playground.glsl`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pipeline::ProgramRecipe;
use serde::Deserialize;

pub const MANIFEST_FILE: &str = "playground.toml";
const DEFAULT_NAME: &str = "GLSL Playground";

#[derive(Debug, Deserialize, Clone)]
pub struct PlaygroundManifest {
    pub name: Option<String>,
    #[serde(default = "default_vertex")]
    pub vertex: Vec<PathBuf>,
    #[serde(default = "default_fragment")]
    pub fragment: Vec<PathBuf>,
    /// Lines the driver injects ahead of the assembled source; subtracted
    /// from compiler-reported line numbers. Driver-specific, so it lives in
    /// configuration.
    #[serde(default)]
    pub preamble_lines: u32,
}

impl Default for PlaygroundManifest {
    fn default() -> Self {
        Self {
            name: None,
            vertex: default_vertex(),
            fragment: default_fragment(),
            preamble_lines: 0,
        }
    }
}

fn default_vertex() -> Vec<PathBuf> {
    vec![PathBuf::from("vertex.glsl")]
}

fn default_fragment() -> Vec<PathBuf> {
    vec![PathBuf::from("prelude.glsl"), PathBuf::from("playground.glsl")]
}

impl PlaygroundManifest {
    /// Loads `playground.toml` from `root`, or the defaults when the file
    /// does not exist.
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let manifest: Self = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        let issues = manifest.validate();
        if !issues.is_empty() {
            bail!("invalid {}: {}", path.display(), issues.join("; "));
        }
        Ok(manifest)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.vertex.is_empty() {
            issues.push("manifest must list at least one vertex source".to_string());
        }
        if self.fragment.is_empty() {
            issues.push("manifest must list at least one fragment source".to_string());
        }
        issues
    }

    /// Source lists with every path resolved against the shader directory.
    pub fn recipe(&self, root: &Path) -> ProgramRecipe {
        ProgramRecipe {
            vertex: self.vertex.iter().map(|p| root.join(p)).collect(),
            fragment: self.fragment.iter().map(|p| root.join(p)).collect(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }
}
