use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::model::message::Attachment;
use crate::notify::Toaster;
use crate::storage::{DownloadDir, SavedFile};

/// One-line descriptions of a message's attachments for plain-text rendering.
pub fn attachment_summaries(attachments: &[Attachment]) -> Vec<String> {
    attachments.iter().map(summary).collect()
}

fn summary(att: &Attachment) -> String {
    let kind = if att.is_image() {
        "image"
    } else {
        att.mime_type
            .as_deref()
            .and_then(|m| m.split('/').next())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or("file")
    };
    format!("[{kind}] {}", att.display_name())
}

/// Fetches attachment bytes and stores them in the download directory.
#[derive(Debug, Clone)]
pub struct AttachmentDownloader {
    client: reqwest::Client,
    dir: DownloadDir,
}

impl AttachmentDownloader {
    pub fn new(dir: DownloadDir) -> Self {
        Self {
            client: reqwest::Client::new(),
            dir,
        }
    }

    pub async fn download(&self, att: &Attachment) -> Result<SavedFile> {
        let response = self
            .client
            .get(&att.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch attachment {}", att.id))?;

        let status = response.status();
        if !status.is_success() {
            bail!("attachment {} download failed: http {}", att.id, status.as_u16());
        }

        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read attachment {}", att.id))?;
        let saved = self.dir.save(&bytes, Some(att.display_name())).await?;

        info!(
            attachment_id = att.id.as_str(),
            path = %saved.path.display(),
            size = saved.size,
            "attachment downloaded"
        );
        Ok(saved)
    }

    /// Fire-and-forget download. The outcome is reported only through a toast;
    /// conversation state is never touched.
    pub fn spawn_download(&self, att: Attachment, toaster: Toaster) -> JoinHandle<()> {
        let downloader = self.clone();
        tokio::spawn(async move {
            match downloader.download(&att).await {
                Ok(saved) => toaster.info(format!("Saved {}", saved.path.display())),
                Err(err) => {
                    warn!(attachment_id = att.id.as_str(), error = %err, "attachment download failed");
                    toaster.error(format!("Could not download {}", att.display_name()));
                }
            }
        })
    }
}
