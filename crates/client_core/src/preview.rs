use image::ImageResult;

use crate::intake::SelectedFile;

pub const DEFAULT_PREVIEW_MAX_DIMENSION: u32 = 1024;

/// Decoded RGBA thumbnail of the selected image.
#[derive(Clone, PartialEq, Eq)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for PreviewImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rgba_len", &self.rgba.len())
            .finish()
    }
}

impl PreviewImage {
    pub fn size(&self) -> [usize; 2] {
        [self.width, self.height]
    }
}

pub fn decode_preview_image(bytes: &[u8], max_dimension: u32) -> ImageResult<PreviewImage> {
    let dynamic = image::load_from_memory(bytes)?;
    let max_dimension = max_dimension.max(1);
    let resized = if dynamic.width() > max_dimension || dynamic.height() > max_dimension {
        dynamic.thumbnail(max_dimension, max_dimension)
    } else {
        dynamic
    }
    .to_rgba8();
    let width = resized.width() as usize;
    let height = resized.height() as usize;
    Ok(PreviewImage {
        width,
        height,
        rgba: resized.into_raw(),
    })
}

/// Preview for a selection; `None` when the bytes do not decode.
pub fn preview_for(file: &SelectedFile, max_dimension: u32) -> Option<PreviewImage> {
    match decode_preview_image(&file.bytes, max_dimension) {
        Ok(preview) => Some(preview),
        Err(err) => {
            tracing::warn!(name = %file.name, "preview decode failed: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use shared::domain::{ImageMime, SelectionId};
    use std::{io::Cursor, sync::Arc};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .write_to(&mut out, format)
            .expect("encode");
        out.into_inner()
    }

    #[test]
    fn small_png_keeps_its_size() {
        let preview = decode_preview_image(&encoded(8, 4, ImageFormat::Png), 1024).expect("decode");
        assert_eq!(preview.size(), [8, 4]);
        assert_eq!(preview.rgba.len(), 8 * 4 * 4);
    }

    #[test]
    fn image_at_the_bound_is_never_upscaled() {
        let preview = decode_preview_image(&encoded(64, 16, ImageFormat::Png), 64).expect("decode");
        assert_eq!(preview.size(), [64, 16]);

        let tall = decode_preview_image(&encoded(10, 30, ImageFormat::Png), 1024).expect("decode");
        assert_eq!(tall.size(), [10, 30]);
    }

    #[test]
    fn large_jpeg_is_thumbnailed_within_bounds() {
        let preview =
            decode_preview_image(&encoded(400, 200, ImageFormat::Jpeg), 100).expect("decode");
        assert_eq!(preview.width, 100);
        assert_eq!(preview.height, 50);
    }

    #[test]
    fn undecodable_bytes_yield_no_preview() {
        let file = SelectedFile {
            id: SelectionId(1),
            name: "broken.png".to_string(),
            mime: ImageMime::Png,
            bytes: Arc::from(b"definitely not a png".to_vec()),
        };
        assert!(preview_for(&file, 64).is_none());
    }
}
