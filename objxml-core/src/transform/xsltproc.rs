//! XSLT through libxslt's `xsltproc` command-line tool.
//!
//! The stylesheet bundle is written to a temporary directory, one file per
//! module, with every `href` rewritten to point at the local copy. This keeps
//! base-path anchoring and custom resolvers in effect: xsltproc never has to
//! find a referenced stylesheet on its own.

use super::stylesheet::{Stylesheet, StylesheetModule};
use super::{ParamValue, Params, XsltEngine};
use crate::error::TransformError;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;
use tracing::debug;
use which::which;

/// Environment variable overriding the xsltproc binary.
pub const XSLTPROC_BIN_ENV: &str = "OBJXML_XSLTPROC_BIN";

/// Runs `xsltproc`, located through `OBJXML_XSLTPROC_BIN` or `PATH` unless a
/// binary is given explicitly.
#[derive(Debug, Clone, Default)]
pub struct XsltprocEngine {
    binary: Option<PathBuf>,
}

impl XsltprocEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binary(path: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(path.into()),
        }
    }

    fn binary(&self) -> Result<PathBuf, TransformError> {
        match &self.binary {
            Some(path) => Ok(path.clone()),
            None => resolve_xsltproc_binary(),
        }
    }
}

impl XsltEngine for XsltprocEngine {
    fn name(&self) -> &str {
        "xsltproc"
    }

    fn apply(
        &self,
        stylesheet: &Stylesheet,
        source: &str,
        params: &Params,
    ) -> Result<Vec<u8>, TransformError> {
        let binary = self.binary()?;
        let temp_dir =
            tempdir().map_err(|e| TransformError::Engine(format!("Temp dir error: {e}")))?;

        let entry_path = materialize(stylesheet, temp_dir.path())?;
        let source_path = temp_dir.path().join("source.xml");
        write_file(&source_path, source.as_bytes())?;

        let mut command = Command::new(&binary);
        command.arg("--nonet");
        for (name, value) in params.iter() {
            match value {
                ParamValue::String(text) => command.arg("--stringparam").arg(name).arg(text),
                ParamValue::XPath(expression) => command.arg("--param").arg(name).arg(expression),
            };
        }
        command.arg(&entry_path).arg(&source_path);

        debug!(binary = %binary.display(), params = params.len(), "running xsltproc");
        let output = command.output().map_err(|e| {
            TransformError::EngineNotFound(format!(
                "failed to launch xsltproc ({}): {e}",
                binary.display()
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransformError::Engine(format!(
                "xsltproc exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

/// Write every module of `stylesheet` into `dir`; returns the entry's path.
fn materialize(stylesheet: &Stylesheet, dir: &Path) -> Result<PathBuf, TransformError> {
    let local_names: HashMap<&str, String> = stylesheet
        .modules()
        .enumerate()
        .map(|(index, module)| (module.href.as_str(), format!("module-{index}.xsl")))
        .collect();

    for module in stylesheet.modules() {
        let text = rewrite_references(module, &local_names);
        write_file(&dir.join(&local_names[module.href.as_str()]), text.as_bytes())?;
    }

    Ok(dir.join(&local_names[stylesheet.entry().href.as_str()]))
}

/// Point the `href` of each include and import in `module` at the local copy
/// of the referenced module. Nothing else in the source is touched.
fn rewrite_references(module: &StylesheetModule, local_names: &HashMap<&str, String>) -> String {
    let mut references: Vec<_> = module.references.iter().collect();
    references.sort_by_key(|reference| std::cmp::Reverse(reference.span.start));

    let mut text = module.source.clone();
    for reference in references {
        if let Some(local) = local_names.get(reference.resolved.as_str()) {
            text.replace_range(reference.span.clone(), local);
        }
    }
    text
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), TransformError> {
    fs::write(path, bytes).map_err(|source| TransformError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn resolve_xsltproc_binary() -> Result<PathBuf, TransformError> {
    if let Some(path) = env::var_os(XSLTPROC_BIN_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    which("xsltproc").map_err(|_| {
        TransformError::EngineNotFound(format!(
            "Unable to locate xsltproc. Install libxslt or set {XSLTPROC_BIN_ENV}."
        ))
    })
}
