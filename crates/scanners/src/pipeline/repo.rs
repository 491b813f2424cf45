use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// One enumerated source file. Paths are repository-relative with forward
/// slashes so findings and eval specs compare exactly across platforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

/// Repository enumeration seam. An enumeration failure here is the one
/// phase-fatal error of the static phase.
pub trait Repository: Send + Sync {
    fn list_files(&self) -> Result<Vec<SourceFile>>;
}

/// Fixed file set, for tests and embedded fixtures.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRepository {
    files: Vec<SourceFile>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push(SourceFile {
            path: path.into(),
            content: content.into(),
        });
        self
    }
}

impl Repository for InMemoryRepository {
    fn list_files(&self) -> Result<Vec<SourceFile>> {
        let mut files = self.files.clone();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

/// Walks a checkout on disk, honoring gitignore rules, skipping binary
/// content.
pub struct DirRepository {
    root: PathBuf,
}

impl DirRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

impl Repository for DirRepository {
    fn list_files(&self) -> Result<Vec<SourceFile>> {
        if !self.root.is_dir() {
            anyhow::bail!("not a directory: {}", self.root.display());
        }

        let mut files = Vec::new();

        for entry in ignore::WalkBuilder::new(&self.root).hidden(true).build() {
            let entry = entry.with_context(|| format!("walking {}", self.root.display()))?;
            if !entry.file_type().map_or(false, |t| t.is_file()) {
                continue;
            }

            // Binary files carry no scannable text; skip quietly.
            match std::fs::read_to_string(entry.path()) {
                Ok(content) => files.push(SourceFile {
                    path: self.relative_path(entry.path()),
                    content,
                }),
                Err(_) => continue,
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_listing_is_path_sorted() {
        let repo = InMemoryRepository::new()
            .with_file("src/z.ts", "z")
            .with_file("src/a.ts", "a");

        let files = repo.list_files().unwrap();
        assert_eq!(files[0].path, "src/a.ts");
        assert_eq!(files[1].path, "src/z.ts");
    }

    #[test]
    fn dir_repository_walks_and_relativizes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/app.ts"), "const x = 1;").unwrap();
        std::fs::write(dir.path().join("README.md"), "readme").unwrap();

        let repo = DirRepository::new(dir.path());
        let files = repo.list_files().unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/app.ts"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let repo = DirRepository::new("/definitely/not/here");
        assert!(repo.list_files().is_err());
    }
}
