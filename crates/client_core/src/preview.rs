//! Preview resources for the selected image.
//!
//! A [`PreviewHost`] hands out opaque [`PreviewHandle`]s. The controller owns
//! at most one handle at a time and gives it back exactly once, either when a
//! new image supersedes it or when the controller is dropped.

use std::collections::HashMap;

use tracing::debug;

use crate::{asset::ImageAsset, error::PreviewError};

pub const DEFAULT_PREVIEW_MAX_DIMENSION: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewHandle(pub u64);

pub trait PreviewHost: Send {
    fn create(&mut self, asset: &ImageAsset) -> Result<PreviewHandle, PreviewError>;
    fn release(&mut self, handle: PreviewHandle);

    fn dimensions(&self, _handle: PreviewHandle) -> Option<(u32, u32)> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decodes each selected image into a bounded RGBA thumbnail.
pub struct ThumbnailPreviewHost {
    max_dimension: u32,
    next_handle: u64,
    live: HashMap<PreviewHandle, PreviewImage>,
}

impl ThumbnailPreviewHost {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            next_handle: 1,
            live: HashMap::new(),
        }
    }

    pub fn get(&self, handle: PreviewHandle) -> Option<&PreviewImage> {
        self.live.get(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl Default for ThumbnailPreviewHost {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_MAX_DIMENSION)
    }
}

impl PreviewHost for ThumbnailPreviewHost {
    fn create(&mut self, asset: &ImageAsset) -> Result<PreviewHandle, PreviewError> {
        if asset.is_empty() {
            return Err(PreviewError::Empty);
        }
        let image = decode_preview_image(asset.bytes(), self.max_dimension)?;
        let handle = PreviewHandle(self.next_handle);
        self.next_handle += 1;
        debug!(
            handle = handle.0,
            width = image.width,
            height = image.height,
            "preview: created"
        );
        self.live.insert(handle, image);
        Ok(handle)
    }

    fn release(&mut self, handle: PreviewHandle) {
        if self.live.remove(&handle).is_some() {
            debug!(handle = handle.0, "preview: released");
        }
    }

    fn dimensions(&self, handle: PreviewHandle) -> Option<(u32, u32)> {
        self.live.get(&handle).map(|image| (image.width, image.height))
    }
}

fn decode_preview_image(bytes: &[u8], max_dimension: u32) -> Result<PreviewImage, PreviewError> {
    let dynamic =
        image::load_from_memory(bytes).map_err(|err| PreviewError::Decode(err.to_string()))?;
    let resized = if dynamic.width() > max_dimension || dynamic.height() > max_dimension {
        dynamic.thumbnail(max_dimension, max_dimension).to_rgba8()
    } else {
        dynamic.to_rgba8()
    };
    Ok(PreviewImage {
        width: resized.width(),
        height: resized.height(),
        rgba: resized.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png_asset(width: u32, height: u32) -> ImageAsset {
        let image = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 200, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        ImageAsset::new("cover.png", Some("image/png".into()), out.into_inner())
    }

    #[test]
    fn thumbnail_is_bounded_by_max_dimension() {
        let mut host = ThumbnailPreviewHost::new(64);
        let handle = host.create(&png_asset(256, 128)).expect("preview");

        let preview = host.get(handle).expect("live preview");
        assert_eq!((preview.width, preview.height), (64, 32));
        assert_eq!(preview.rgba.len(), 64 * 32 * 4);
        assert_eq!(host.dimensions(handle), Some((64, 32)));
    }

    #[test]
    fn small_images_keep_their_size() {
        let mut host = ThumbnailPreviewHost::new(64);
        let handle = host.create(&png_asset(20, 10)).expect("preview");
        assert_eq!(host.dimensions(handle), Some((20, 10)));
    }

    #[test]
    fn release_drops_the_preview_and_handles_are_unique() {
        let mut host = ThumbnailPreviewHost::default();
        let first = host.create(&png_asset(8, 8)).expect("preview");
        let second = host.create(&png_asset(8, 8)).expect("preview");
        assert_ne!(first, second);
        assert_eq!(host.live_count(), 2);

        host.release(first);
        assert_eq!(host.live_count(), 1);
        assert!(host.get(first).is_none());

        host.release(first);
        assert_eq!(host.live_count(), 1);
    }

    #[test]
    fn undecodable_bytes_are_rejected() {
        let mut host = ThumbnailPreviewHost::default();
        let asset = ImageAsset::new("notes.png", Some("image/png".into()), b"not an image".to_vec());
        assert!(matches!(host.create(&asset), Err(PreviewError::Decode(_))));

        let empty = ImageAsset::new("empty.png", None, Vec::<u8>::new());
        assert!(matches!(host.create(&empty), Err(PreviewError::Empty)));
        assert_eq!(host.live_count(), 0);
    }
}
