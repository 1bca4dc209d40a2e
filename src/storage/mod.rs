use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::{fs::File, io::AsyncWriteExt};
use uuid::Uuid;

const MAX_STEM_LEN: usize = 48;

/// Local directory downloaded attachments are written to.
#[derive(Debug, Clone)]
pub struct DownloadDir {
    root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SavedFile {
    pub filename: String,
    pub path: PathBuf,
    pub size: usize,
}

impl DownloadDir {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create download dir at {}", root.display()))?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under a collision-free name derived from `original_name`.
    pub async fn save(&self, bytes: &[u8], original_name: Option<&str>) -> Result<SavedFile> {
        let original = original_name.map(Path::new);
        let ext = original
            .and_then(|p| p.extension().and_then(|e| e.to_str()))
            .and_then(clean_extension);
        let stem = original
            .and_then(|p| p.file_stem().and_then(|s| s.to_str()))
            .and_then(clean_stem);

        let id = Uuid::new_v4().simple().to_string();
        let unique = match stem {
            Some(stem) => format!("{stem}-{}", &id[..8]),
            None => id,
        };
        let filename = match ext {
            Some(ext) => format!("{unique}.{ext}"),
            None => unique,
        };

        let path = self.root.join(&filename);

        let mut file = File::create(&path)
            .await
            .with_context(|| format!("Failed to create file {}", path.display()))?;

        file.write_all(bytes)
            .await
            .with_context(|| format!("Failed to write file {}", path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("Failed to flush file {}", path.display()))?;

        Ok(SavedFile {
            filename,
            path,
            size: bytes.len(),
        })
    }
}

fn clean_extension(ext: &str) -> Option<String> {
    let filtered: String = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();

    if filtered.is_empty() {
        None
    } else {
        Some(filtered.to_lowercase())
    }
}

fn clean_stem(stem: &str) -> Option<String> {
    let filtered: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();
    let trimmed = filtered.trim_matches('_');

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
