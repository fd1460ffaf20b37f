use std::path::{Path, PathBuf};

use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
pub const DEFAULT_AVATAR_SIZE: u32 = 150;
const JPEG_QUALITY: u8 = 85;

pub fn default_allowed_extensions() -> Vec<String> {
    DEFAULT_ALLOWED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// On-disk avatar storage and the upload pipeline.
///
/// Raw uploads are staged at `{upload_root}/{unique}` before any decoding;
/// processed thumbnails land at `{upload_root}/avatars/{unique}`. The
/// staging path is distinct from the final path so a crash mid-processing
/// never leaves a half-written file at the canonical location, and the
/// staging file is removed on every exit path.
pub struct AvatarStore {
    upload_root: PathBuf,
    avatar_dir: PathBuf,
    size: u32,
    allowed: Vec<String>,
}

impl AvatarStore {
    pub fn new(upload_root: PathBuf, size: u32, allowed: Vec<String>) -> Result<Self> {
        let avatar_dir = upload_root.join("avatars");
        std::fs::create_dir_all(&upload_root)?;
        std::fs::create_dir_all(&avatar_dir)?;
        info!("Avatar storage directory: {}", avatar_dir.display());
        Ok(Self {
            upload_root,
            avatar_dir,
            size,
            allowed,
        })
    }

    pub fn avatar_path(&self, filename: &str) -> PathBuf {
        self.avatar_dir.join(filename)
    }

    /// Extension gate. The client filename is only consulted for its
    /// extension; the stored name is always freshly generated, so no
    /// client-supplied path component ever reaches the filesystem.
    pub fn allowed_extension(&self, filename: &str) -> Result<String, ApiError> {
        if filename.is_empty() {
            return Err(ApiError::Validation("no file selected".into()));
        }
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .ok_or_else(|| ApiError::Validation("file type not allowed".into()))?;
        if !self.allowed.iter().any(|a| a == &ext) {
            return Err(ApiError::Validation("file type not allowed".into()));
        }
        Ok(ext)
    }

    /// Run the full pipeline for one upload and return the stored
    /// filename. On any processing failure the staging file is removed
    /// and nothing is written under `avatars/`.
    pub fn store(&self, original_filename: &str, bytes: &[u8]) -> Result<String, ApiError> {
        let ext = self.allowed_extension(original_filename)?;
        let unique = format!("{}.{}", Uuid::new_v4().simple(), ext);

        let staged = self.upload_root.join(&unique);
        std::fs::write(&staged, bytes)
            .map_err(|e| ApiError::Processing(format!("failed to stage upload: {}", e)))?;

        let rendered = self.render_thumbnail(&staged);

        if let Err(e) = std::fs::remove_file(&staged) {
            warn!("Staging file {} not removed: {}", staged.display(), e);
        }

        let jpeg = rendered?;
        let final_path = self.avatar_path(&unique);
        std::fs::write(&final_path, &jpeg)
            .map_err(|e| ApiError::Processing(format!("failed to write avatar: {}", e)))?;

        info!("Stored avatar {} ({} bytes)", unique, jpeg.len());
        Ok(unique)
    }

    /// Decode, flatten onto white, shrink-only resize, center on a square
    /// white canvas, and encode as baseline JPEG.
    fn render_thumbnail(&self, staged: &Path) -> Result<Vec<u8>, ApiError> {
        // Decoder selection sniffs the file content, not the extension:
        // a valid JPEG named `x.png` still decodes, and the stored file
        // (JPEG bytes under the original extension) stays readable.
        let img = image::ImageReader::open(staged)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| ApiError::Processing(format!("image open failed: {}", e)))?
            .decode()
            .map_err(|e| ApiError::Processing(format!("image decode failed: {}", e)))?;

        let rgb = flatten_to_rgb(&img);
        let (w, h) = rgb.dimensions();
        let (nw, nh) = fit_within(w, h, self.size, self.size);
        let resized = if (nw, nh) == (w, h) {
            rgb
        } else {
            imageops::resize(&rgb, nw, nh, FilterType::Lanczos3)
        };

        let mut canvas = RgbImage::from_pixel(self.size, self.size, Rgb([255, 255, 255]));
        let x = i64::from((self.size - nw) / 2);
        let y = i64::from((self.size - nh) / 2);
        imageops::replace(&mut canvas, &resized, x, y);

        let mut out = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        encoder
            .encode_image(&canvas)
            .map_err(|e| ApiError::Processing(format!("jpeg encode failed: {}", e)))?;
        Ok(out)
    }

    /// Delete a stored avatar from disk. A file that is already gone is
    /// not an error.
    pub fn remove(&self, filename: &str) -> Result<()> {
        let path = self.avatar_path(filename);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted avatar {}", filename);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Avatar {} already gone", filename);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Composite any image with an alpha channel onto an opaque white
/// background of the source dimensions; convert everything else to RGB.
/// The JPEG encoder never sees transparency.
fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Shrink-only aspect-preserving fit: dimensions such that the image fits
/// inside `tw`×`th`. Images already inside the box keep their size.
fn fit_within(w: u32, h: u32, tw: u32, th: u32) -> (u32, u32) {
    if w <= tw && h <= th {
        return (w, h);
    }
    let scale = f64::min(f64::from(tw) / f64::from(w), f64::from(th) / f64::from(h));
    let nw = ((f64::from(w) * scale).round() as u32).clamp(1, tw);
    let nh = ((f64::from(h) * scale).round() as u32).clamp(1, th);
    (nw, nh)
}
