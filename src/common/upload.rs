use crate::infrastructure::storage::local::UploadStorage;
use anyhow::{anyhow, Result};
use axum::{body::Bytes, extract::multipart::Field};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, warn};

pub const AUDIO_SUFFIX: &str = ".mp3";

/// How far the timestamp may be moved forward to find a free name.
const MAX_NAME_ATTEMPTS: i64 = 60;

/// Case-insensitive check on the client-supplied file name.
pub fn has_audio_suffix(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(AUDIO_SUFFIX)
}

/// `{user_id}-{podcast_record_id}-{unix_timestamp}.mp3`
pub fn upload_file_name(user_id: impl std::fmt::Display, podcast_id: i64, unix_timestamp: i64) -> String {
    format!("{}-{}-{}{}", user_id, podcast_id, unix_timestamp, AUDIO_SUFFIX)
}

/// A file fully written to the staging area, waiting for promotion.
#[derive(Debug)]
pub struct StagedUpload {
    pub path: PathBuf,
    pub size: u64,
}

impl StagedUpload {
    /// Store as `{user_id}-{podcast_id}-{ts}.mp3` and return the final name.
    /// A name already taken by an earlier upload moves `ts` forward a second at a time.
    pub async fn promote_audio(
        self,
        storage: &UploadStorage,
        user_id: impl std::fmt::Display,
        podcast_id: i64,
        unix_timestamp: i64,
    ) -> Result<String> {
        for offset in 0..MAX_NAME_ATTEMPTS {
            let name = upload_file_name(&user_id, podcast_id, unix_timestamp + offset);

            match storage.promote(&self.path, &name).await {
                Ok(_) => {
                    info!("Stored upload {} ({} bytes)", name, self.size);
                    return Ok(name);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    discard_path(&self.path).await;
                    return Err(anyhow!("Failed to store upload {}: {}", name, e));
                }
            }
        }

        discard_path(&self.path).await;
        Err(anyhow!(
            "No free upload name for podcast {} near timestamp {}",
            podcast_id,
            unix_timestamp
        ))
    }

    pub async fn discard(self) {
        discard_path(&self.path).await;
    }
}

async fn discard_path(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove staged upload {}: {}", path.display(), e);
        }
    }
}

pub struct FileUploader {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl FileUploader {
    pub async fn new(path: PathBuf) -> Result<Self> {
        let file = File::create(&path)
            .await
            .map_err(|e| anyhow!("Failed to create {}: {}", path.display(), e))?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: Bytes) -> Result<()> {
        self.writer
            .write_all(&chunk)
            .await
            .map_err(|e| anyhow!("Failed to write {}: {}", self.path.display(), e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StagedUpload> {
        self.writer
            .flush()
            .await
            .map_err(|e| anyhow!("Failed to flush {}: {}", self.path.display(), e))?;

        Ok(StagedUpload {
            path: self.path,
            size: self.written,
        })
    }

    pub async fn abort(self) {
        drop(self.writer);
        discard_path(&self.path).await;
    }
}

/// Stream one multipart file field into a new staging file.
pub async fn stream_to_staging(
    storage: &UploadStorage,
    mut field: Field<'_>,
) -> Result<StagedUpload> {
    let mut uploader = FileUploader::new(storage.staging_path()).await?;

    while let Some(chunk) = field.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Stream error: {}", e);
                uploader.abort().await;
                return Err(anyhow::Error::new(e));
            }
        };

        if let Err(e) = uploader.write_chunk(chunk).await {
            error!("Upload error: {}", e);
            uploader.abort().await;
            return Err(e);
        }
    }

    uploader.finish().await
}
