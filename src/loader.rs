//! Template sources and directory loading.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CompilerError, TEMPLATE_NOT_FOUND, TEMPLATE_READ};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSource {
    /// Loader-relative name, e.g. `pages/index`.
    pub name: String,
    /// Path reported in errors and payloads.
    pub file: String,
    pub content: String,
}

impl TemplateSource {
    pub fn new(name: &str, file: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            file: file.to_string(),
            content: content.to_string(),
        }
    }
}

pub trait TemplateLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<TemplateSource, CompilerError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTORY LOADER
// ═══════════════════════════════════════════════════════════════════════════════

/// Serves every `*.html` file under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
    files: BTreeMap<String, PathBuf>,
}

impl DirectoryLoader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let files = find_html_files(&root);
        tracing::debug!(root = %root.display(), templates = files.len(), "indexed templates");
        Self { root, files }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Template names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Loads every indexed template.
    pub fn load_all(&self) -> Result<Vec<TemplateSource>, CompilerError> {
        self.names().map(|name| self.load(name)).collect()
    }
}

impl TemplateLoader for DirectoryLoader {
    fn load(&self, name: &str) -> Result<TemplateSource, CompilerError> {
        let path = self.files.get(name).ok_or_else(|| {
            CompilerError::new(TEMPLATE_NOT_FOUND, "Template not found")
                .detail("name", name)
                .detail("root", self.root.display())
        })?;
        let content = fs::read_to_string(path).map_err(|e| {
            CompilerError::new(TEMPLATE_READ, format!("Failed to read template: {}", e))
                .detail("path", path.display())
        })?;
        Ok(TemplateSource {
            name: name.to_string(),
            file: path.display().to_string(),
            content,
        })
    }
}

/// Root-relative path without extension, `/`-separated.
fn template_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn find_html_files(root: &Path) -> BTreeMap<String, PathBuf> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).follow_links(true).into_iter().flatten() {
        let path = entry.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "html") {
            continue;
        }
        if let Some(name) = template_name(root, path) {
            files.insert(name, path.to_path_buf());
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("stx-loader-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&root);
        fs::create_dir_all(root.join("pages/blog")).unwrap();
        fs::write(root.join("index.html"), "<p>home</p>").unwrap();
        fs::write(root.join("pages/blog/post.html"), "<p>${title}</p>").unwrap();
        fs::write(root.join("pages/notes.txt"), "skip").unwrap();
        root
    }

    #[test]
    fn test_indexes_html_files_by_relative_name() {
        let root = fixture("index");
        let loader = DirectoryLoader::new(&root);
        assert_eq!(loader.names().collect::<Vec<_>>(), vec!["index", "pages/blog/post"]);

        let post = loader.load("pages/blog/post").unwrap();
        assert_eq!(post.content, "<p>${title}</p>");
        assert!(post.file.ends_with("post.html"));
        assert_eq!(loader.load_all().unwrap().len(), 2);
        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_template() {
        let root = fixture("missing");
        let err = DirectoryLoader::new(&root).load("nope").unwrap_err();
        assert_eq!(err.code, TEMPLATE_NOT_FOUND);
        assert_eq!(err.get("name"), Some("nope"));
        fs::remove_dir_all(&root).unwrap();
    }
}
