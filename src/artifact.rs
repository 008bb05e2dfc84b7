//! Source images, per-stage artifacts and the per-request artifact namespace

use crate::error::PipelineError;
use crate::preprocessing::steps::resize::check_pixel_budget;
use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader, Limits};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Upper bound on what a decoder may allocate for one upload
const DECODE_ALLOC_LIMIT: u64 = 1024 * 1024 * 1024;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resample,
    Enhance,
    Binarize,
    Recognize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resample => "resample",
            Self::Enhance => "enhance",
            Self::Binarize => "binarize",
            Self::Recognize => "recognize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named artifact slot. Also serves as the provenance tag of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Resampled,
    Enhanced,
    Binarized,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Resampled, Slot::Enhanced, Slot::Binarized];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resampled => "resampled",
            Self::Enhanced => "enhanced",
            Self::Binarized => "binarized",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.as_str())
    }

    /// Parse a slot from its name, with or without the `.png` suffix
    pub fn parse(s: &str) -> Option<Self> {
        match s.strip_suffix(".png").unwrap_or(s) {
            "resampled" => Some(Self::Resampled),
            "enhanced" => Some(Self::Enhanced),
            "binarized" => Some(Self::Binarized),
            _ => None,
        }
    }

    /// The stage that writes this slot
    pub fn stage(&self) -> Stage {
        match self {
            Self::Resampled => Stage::Resample,
            Self::Enhanced => Stage::Enhance,
            Self::Binarized => Stage::Binarize,
        }
    }
}

/// A decoded upload. The pipeline only ever borrows it.
#[derive(Debug, Clone)]
pub struct SourceImage {
    path: PathBuf,
    format: Option<ImageFormat>,
    image: DynamicImage,
}

impl SourceImage {
    /// Decode the file at `path`, sniffing the format from its content.
    /// Images with more than `max_pixels` pixels are rejected before their
    /// pixel data is read.
    pub fn open(path: impl AsRef<Path>, max_pixels: u64) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let mut reader = ImageReader::open(path)?.with_guessed_format()?;
        let mut limits = Limits::default();
        limits.max_alloc = Some(DECODE_ALLOC_LIMIT);
        reader.limits(limits);

        let format = reader.format();
        let decoder = reader.into_decoder()?;
        let (width, height) = decoder.dimensions();
        check_pixel_budget(width, height, max_pixels)?;
        let image = DynamicImage::from_decoder(decoder)?;

        Ok(Self {
            path: path.to_path_buf(),
            format,
            image,
        })
    }

    pub fn from_image(path: impl Into<PathBuf>, image: DynamicImage) -> Self {
        Self {
            path: path.into(),
            format: None,
            image,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Option<ImageFormat> {
        self.format
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn color(&self) -> ColorType {
        self.image.color()
    }
}

/// Output of one pipeline stage
#[derive(Debug, Clone)]
pub struct ProcessingArtifact {
    pub slot: Slot,
    pub image: DynamicImage,
    /// Where the artifact was written, if the context persists artifacts
    pub path: Option<PathBuf>,
}

impl ProcessingArtifact {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_single_channel(&self) -> bool {
        self.image.color().channel_count() == 1
    }
}

/// Per-request artifact namespace: `<root>/<request-id>/<slot>.png`
#[derive(Debug, Clone)]
pub struct ArtifactContext {
    request_id: Uuid,
    dir: PathBuf,
    persist: bool,
}

impl ArtifactContext {
    /// Create a context for a fresh request id under `root`
    pub fn create(root: impl AsRef<Path>, persist: bool) -> Result<Self, PipelineError> {
        Self::with_id(root, Uuid::new_v4(), persist)
    }

    pub fn with_id(
        root: impl AsRef<Path>,
        request_id: Uuid,
        persist: bool,
    ) -> Result<Self, PipelineError> {
        let dir = root.as_ref().join(request_id.to_string());
        if persist {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(Self {
            request_id,
            dir,
            persist,
        })
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.file_name())
    }

    /// Store `image` under `slot`, replacing any earlier artifact in that slot
    pub fn store(
        &self,
        slot: Slot,
        image: DynamicImage,
    ) -> Result<ProcessingArtifact, PipelineError> {
        let path = if self.persist {
            let path = self.slot_path(slot);
            image.save_with_format(&path, ImageFormat::Png)?;
            tracing::debug!("Stored {} artifact at {:?}", slot.as_str(), path);
            Some(path)
        } else {
            None
        };

        Ok(ProcessingArtifact { slot, image, path })
    }

    /// Remove everything stored for this request
    pub fn discard(&self) {
        if !self.persist {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove artifacts in {:?}: {}", self.dir, e);
            }
        }
    }
}

/// Delete request directories under `root` last modified more than `ttl`
/// ago. Entries that are not request directories are left alone. Returns
/// the number of directories removed.
pub fn sweep_expired(root: &Path, ttl: Duration) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let is_request_dir = entry
            .file_name()
            .to_str()
            .is_some_and(|name| Uuid::parse_str(name).is_ok());
        if !is_request_dir || !entry.file_type()?.is_dir() {
            continue;
        }

        let expired = entry
            .metadata()?
            .modified()?
            .elapsed()
            .is_ok_and(|age| age >= ttl);
        if expired {
            std::fs::remove_dir_all(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_slot_parse_accepts_file_names() {
        assert_eq!(Slot::parse("enhanced"), Some(Slot::Enhanced));
        assert_eq!(Slot::parse("binarized.png"), Some(Slot::Binarized));
        assert_eq!(Slot::parse("../etc/passwd"), None);
    }

    #[test]
    fn test_contexts_do_not_share_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = ArtifactContext::create(root.path(), true).unwrap();
        let b = ArtifactContext::create(root.path(), true).unwrap();

        assert_ne!(a.slot_path(Slot::Resampled), b.slot_path(Slot::Resampled));
        assert!(a.dir().is_dir());
        assert!(b.dir().is_dir());
    }

    #[test]
    fn test_store_overwrites_slot() {
        let root = tempfile::tempdir().unwrap();
        let ctx = ArtifactContext::create(root.path(), true).unwrap();

        let first = GrayImage::from_pixel(4, 4, Luma([0]));
        let second = GrayImage::from_pixel(8, 2, Luma([255]));
        ctx.store(Slot::Enhanced, DynamicImage::ImageLuma8(first)).unwrap();
        let stored = ctx
            .store(Slot::Enhanced, DynamicImage::ImageLuma8(second))
            .unwrap();

        let on_disk = image::open(stored.path.unwrap()).unwrap();
        assert_eq!((on_disk.width(), on_disk.height()), (8, 2));
    }

    #[test]
    fn test_in_memory_context_writes_nothing() {
        let root = tempfile::tempdir().unwrap();
        let ctx = ArtifactContext::create(root.path(), false).unwrap();
        let artifact = ctx
            .store(Slot::Binarized, DynamicImage::ImageLuma8(GrayImage::new(3, 3)))
            .unwrap();

        assert!(artifact.path.is_none());
        assert!(!ctx.dir().exists());
    }

    #[test]
    fn test_discard_removes_request_directory() {
        let root = tempfile::tempdir().unwrap();
        let ctx = ArtifactContext::create(root.path(), true).unwrap();
        ctx.store(Slot::Resampled, DynamicImage::ImageLuma8(GrayImage::new(2, 2)))
            .unwrap();

        ctx.discard();

        assert!(!ctx.dir().exists());
        // A second discard is a no-op
        ctx.discard();
    }

    #[test]
    fn test_sweep_removes_only_expired_request_dirs() {
        let root = tempfile::tempdir().unwrap();
        let old = ArtifactContext::create(root.path(), true).unwrap();
        let unrelated = root.path().join("keep-me");
        std::fs::create_dir(&unrelated).unwrap();

        assert_eq!(sweep_expired(root.path(), Duration::from_secs(3600)).unwrap(), 0);
        assert!(old.dir().exists());

        assert_eq!(sweep_expired(root.path(), Duration::ZERO).unwrap(), 1);
        assert!(!old.dir().exists());
        assert!(unrelated.exists());
    }
}
