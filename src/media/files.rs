use crate::utils::sanitize_filename;
use anyhow::{Context, Result};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use tracing::debug;

const STAGING_PREFIX: &str = ".staging-";
const MAX_NAME_ATTEMPTS: usize = 10_000;

/// Per-request scratch directory next to the downloads directory.
///
/// The engine writes here and finished files are moved out by
/// [`place_file`]. Whatever is left behind is removed on drop. Staging lives
/// outside the served tree so partial downloads are never reachable over HTTP,
/// but under the same parent so files can be hard linked into place.
pub struct Staging {
    dir: TempDir,
}

impl Staging {
    pub fn create(downloads_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(downloads_dir).with_context(|| {
            format!(
                "Failed to create downloads directory {}",
                downloads_dir.display()
            )
        })?;

        let root = staging_root(downloads_dir)?;
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create staging root {}", root.display()))?;

        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&root)
            .context("Failed to create staging directory")?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Engine output template that keeps the title as the file stem.
    pub fn output_template(&self) -> String {
        // `%` in the directory itself must not be read as a template field
        let dir = self.dir.path().to_string_lossy().replace('%', "%%");
        Path::new(&dir)
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }
}

/// `<parent>/.<name>-staging` for a downloads directory `<parent>/<name>`.
fn staging_root(downloads_dir: &Path) -> Result<PathBuf> {
    let downloads_dir = downloads_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", downloads_dir.display()))?;

    match (downloads_dir.parent(), downloads_dir.file_name()) {
        (Some(parent), Some(name)) => {
            Ok(parent.join(format!(".{}-staging", name.to_string_lossy())))
        }
        _ => Err(anyhow::anyhow!(
            "Downloads directory {} has no parent to stage in",
            downloads_dir.display()
        )),
    }
}

fn clean_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| {
            ext.to_string_lossy()
                .chars()
                .filter(char::is_ascii_alphanumeric)
                .collect()
        })
        .unwrap_or_default()
}

fn candidate_name(stem: &str, extension: &str, attempt: usize) -> String {
    let stem = if attempt == 0 {
        stem.to_string()
    } else {
        format!("{}-{}", stem, attempt)
    };

    if extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, extension)
    }
}

/// Moves `source` into `downloads_dir` under a sanitized, unused name.
///
/// The stem is sanitized with `placeholder` as the fallback. When the name is
/// taken, `-1`, `-2`, ... is appended. Linking fails on an existing target, so
/// a file written by a concurrent request is never overwritten.
pub async fn place_file(
    source: &Path,
    downloads_dir: &Path,
    placeholder: &str,
) -> Result<PathBuf> {
    let title = source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = sanitize_filename(&title, placeholder);
    let extension = clean_extension(source);

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let target = downloads_dir.join(candidate_name(&stem, &extension, attempt));

        match tokio::fs::hard_link(source, &target).await {
            Ok(()) => {
                tokio::fs::remove_file(source)
                    .await
                    .with_context(|| format!("Failed to remove {}", source.display()))?;
                debug!("Placed {} at {}", source.display(), target.display());
                return Ok(target);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to move {} to {}", source.display(), target.display())
                });
            }
        }
    }

    Err(anyhow::anyhow!(
        "No free file name for {} in {}",
        stem,
        downloads_dir.display()
    ))
}
