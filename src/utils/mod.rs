use std::path::{Path, PathBuf};

/// Reduces a title to a filesystem-safe name.
///
/// Only alphanumeric characters, spaces, hyphens and underscores survive.
/// Trailing whitespace is trimmed and an empty result falls back to
/// `placeholder`, so the returned name is never empty and never contains a
/// path separator.
pub fn sanitize_filename(title: &str, placeholder: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();

    let trimmed = kept.trim_end();
    if trimmed.is_empty() {
        placeholder.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Replaces the last extension of `path` with `extension`, or appends it when
/// the file name has none.
pub fn replace_extension(path: &Path, extension: &str) -> PathBuf {
    let mut replaced = path.to_path_buf();
    replaced.set_extension(extension);
    replaced
}
