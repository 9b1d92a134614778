//! Rewrite `<img src>` paths from YAML-relative to output-relative.
//!
//! The rewrite is purely lexical: nothing is read from disk, so the same
//! inputs always produce the same markup.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

static IMG_SRC_DOUBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(<img\b[^>]*\bsrc=")([^"]+)(")"#).unwrap());
static IMG_SRC_SINGLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(<img\b[^>]*\bsrc=')([^']+)(')"#).unwrap());

/// Source (YAML) and output directories of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathContext {
    source_dir: PathBuf,
    output_dir: PathBuf,
}

impl PathContext {
    pub fn new(source_dir: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Self {
        Self {
            source_dir: normalize_lexically(source_dir.as_ref()),
            output_dir: normalize_lexically(output_dir.as_ref()),
        }
    }

    /// Context where source and output are the same directory; paths are kept.
    pub fn identity() -> Self {
        Self::new(".", ".")
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Map one `src` value. URLs, data URIs, fragments and absolute paths
    /// are returned unchanged, as is anything that cannot be related to the
    /// output directory.
    pub fn normalize_source(&self, src: &str) -> String {
        let trimmed = src.trim();
        if trimmed.is_empty()
            || trimmed.contains("://")
            || trimmed.starts_with("data:")
            || trimmed.starts_with('/')
            || trimmed.starts_with('#')
            || Path::new(trimmed).is_absolute()
        {
            return src.to_string();
        }

        let candidate = normalize_lexically(&self.source_dir.join(trimmed));
        match pathdiff::diff_paths(&candidate, &self.output_dir) {
            Some(rel) if !rel.as_os_str().is_empty() => to_posix(&rel),
            _ => src.to_string(),
        }
    }

    /// Rewrite every `<img src="...">` / `<img src='...'>` in `markup`.
    pub fn rewrite_markup(&self, markup: &str) -> String {
        let replace = |caps: &Captures| {
            format!(
                "{}{}{}",
                &caps[1],
                self.normalize_source(&caps[2]),
                &caps[3]
            )
        };
        let pass = IMG_SRC_DOUBLE.replace_all(markup, replace);
        IMG_SRC_SINGLE.replace_all(&pass, replace).into_owned()
    }
}

fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve `.` and `..` components without touching the filesystem.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
