//! Thumbnail generation for image recos.

use std::io::Cursor;
use std::sync::Arc;

use image::ImageFormat;

/// Image bytes in, thumbnail bytes out. Runs on the blocking pool.
pub type ThumbnailFn = Arc<dyn Fn(&[u8]) -> anyhow::Result<Vec<u8>> + Send + Sync>;

/// Default thumbnailer: decode any supported format, shrink so the longest
/// edge is at most `max_edge` pixels (aspect ratio kept), encode as JPEG.
pub fn jpeg_thumbnailer(max_edge: u32) -> ThumbnailFn {
    Arc::new(move |data| make_jpeg_thumbnail(data, max_edge))
}

pub fn make_jpeg_thumbnail(data: &[u8], max_edge: u32) -> anyhow::Result<Vec<u8>> {
    let img = image::load_from_memory(data)?;
    let small = if img.width() > max_edge || img.height() > max_edge {
        img.thumbnail(max_edge, max_edge)
    } else {
        img
    };
    // JPEG has no alpha channel
    let rgb = image::DynamicImage::ImageRgb8(small.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Jpeg)?;
    Ok(out.into_inner())
}
