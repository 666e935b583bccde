use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;

/// Image formats accepted for meter photographs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
    Gif,
    Heic,
}

impl ImageKind {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Webp => "image/webp",
            ImageKind::Gif => "image/gif",
            ImageKind::Heic => "image/heic",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Webp => "webp",
            ImageKind::Gif => "gif",
            ImageKind::Heic => "heic",
        }
    }

    /// Subtype of a `data:image/<subtype>;base64,` prefix.
    pub fn from_subtype(subtype: &str) -> Option<Self> {
        match subtype.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "webp" => Some(ImageKind::Webp),
            "gif" => Some(ImageKind::Gif),
            "heic" | "heif" => Some(ImageKind::Heic),
            _ => None,
        }
    }

    /// Detect the format from the leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageKind::Webp)
        } else if bytes.len() >= 12
            && &bytes[4..8] == b"ftyp"
            && matches!(&bytes[8..12], b"heic" | b"heix" | b"mif1" | b"msf1")
        {
            Some(ImageKind::Heic)
        } else {
            None
        }
    }
}

/// Raw image bytes with their recognized format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub kind: ImageKind,
    pub bytes: Vec<u8>,
}

/// Decode a base64 image, with or without a `data:image/<subtype>;base64,` prefix.
///
/// Returns `None` when the prefix names an unsupported type, the body is not
/// valid base64, is empty, or the format cannot be recognized.
pub fn decode_base64_image(input: &str) -> Option<DecodedImage> {
    let input = input.trim();
    let (declared, body) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest.split_once(',')?;
            let subtype = header.strip_suffix(";base64")?.strip_prefix("image/")?;
            (Some(ImageKind::from_subtype(subtype)?), body)
        }
        None => (None, input),
    };
    let bytes = STANDARD.decode(body.trim()).ok()?;
    if bytes.is_empty() {
        return None;
    }
    // magic bytes win over the declared subtype
    let kind = ImageKind::sniff(&bytes).or(declared)?;
    Some(DecodedImage { kind, bytes })
}

/// An image written to the image directory.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub file_name: String,
    pub path: PathBuf,
    pub kind: ImageKind,
}

/// Writes uploaded images under a single directory with unique names.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name_for(id: Uuid, kind: ImageKind) -> String {
        format!("temp_image_{}.{}", id.simple(), kind.extension())
    }

    pub async fn save(&self, id: Uuid, image: &DecodedImage) -> Result<StoredImage, ServiceError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ServiceError::Storage(format!("create {}: {e}", self.dir.display())))?;
        let file_name = Self::file_name_for(id, image.kind);
        let path = self.dir.join(&file_name);
        fs::write(&path, &image.bytes)
            .await
            .map_err(|e| ServiceError::Storage(format!("write {}: {e}", path.display())))?;
        debug!(file = %file_name, bytes = image.bytes.len(), "image stored");
        Ok(StoredImage { file_name, path, kind: image.kind })
    }

    /// Delete a stored image that no reading refers to.
    pub async fn remove(&self, image: &StoredImage) {
        match fs::remove_file(&image.path).await {
            Ok(()) => debug!(file = %image.file_name, "image removed"),
            Err(e) => warn!(file = %image.file_name, error = %e, "cannot remove orphaned image"),
        }
    }
}
