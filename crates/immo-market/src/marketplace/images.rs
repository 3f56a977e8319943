use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

/// URL prefix under which stored images are served.
pub const UPLOAD_PREFIX: &str = "/uploads";

/// One uploaded file taken from the publish form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Resolves the image MIME type from the declared content type, falling back to
    /// the file extension.
    fn mime(&self) -> Result<mime::Mime, ImageStoreError> {
        let declared = self
            .content_type
            .as_deref()
            .and_then(|raw| raw.parse::<mime::Mime>().ok())
            .filter(|mime| mime.type_() != mime::APPLICATION);
        let mime = match declared {
            Some(mime) => mime,
            None => self
                .file_name
                .as_deref()
                .map(|name| mime_guess::from_path(name).first_or_octet_stream())
                .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        };

        if mime.type_() != mime::IMAGE {
            return Err(ImageStoreError::UnsupportedType(mime.essence_str().to_string()));
        }
        Ok(mime)
    }

    /// Rejects empty files and anything that is not an image.
    pub fn validate(&self) -> Result<(), ImageStoreError> {
        if self.bytes.is_empty() {
            return Err(ImageStoreError::Empty);
        }
        self.mime().map(|_| ())
    }

    /// Validates the upload and picks a fresh, collision-free file name.
    pub fn stored_name(&self) -> Result<String, ImageStoreError> {
        self.validate()?;
        let mime = self.mime()?;
        let subtype = mime.subtype().as_str();
        let extension = subtype.split('+').next().unwrap_or(subtype);
        Ok(format!("{}.{}", Uuid::new_v4(), extension))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    #[error("uploaded image is empty")]
    Empty,
    #[error("unsupported image type '{0}'")]
    UnsupportedType(String),
    #[error("image storage unavailable: {0}")]
    Io(#[from] std::io::Error),
    #[error("image storage unavailable: {0}")]
    Unavailable(String),
}

impl ImageStoreError {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ImageStoreError::Empty | ImageStoreError::UnsupportedType(_)
        )
    }
}

/// Outbound storage for listing photos; returns the public URL of the stored file.
#[async_trait]
pub trait ImageStore: Debug + Send + Sync {
    async fn store(&self, upload: ImageUpload) -> Result<String, ImageStoreError>;
}

/// Writes images under a local directory that the API serves at [`UPLOAD_PREFIX`].
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a served file name back to disk. Anything but a bare file name is refused.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let plain = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
        plain.then(|| self.root.join(name))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, upload: ImageUpload) -> Result<String, ImageStoreError> {
        let name = upload.stored_name()?;
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&name);
        tokio::fs::write(&path, &upload.bytes).await?;
        debug!(path = %path.display(), size = upload.bytes.len(), "stored listing image");
        Ok(format!("{UPLOAD_PREFIX}/{name}"))
    }
}

/// Keeps uploads in memory; used by the demo command and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryImageStore {
    files: Arc<Mutex<Vec<(String, ImageUpload)>>>,
}

impl InMemoryImageStore {
    pub fn stored(&self) -> Vec<String> {
        match self.files.lock() {
            Ok(files) => files.iter().map(|(url, _)| url.clone()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl ImageStore for InMemoryImageStore {
    async fn store(&self, upload: ImageUpload) -> Result<String, ImageStoreError> {
        let name = upload.stored_name()?;
        let url = format!("{UPLOAD_PREFIX}/{name}");
        self.files
            .lock()
            .map_err(|_| ImageStoreError::Unavailable("image store lock poisoned".to_string()))?
            .push((url.clone(), upload));
        Ok(url)
    }
}
