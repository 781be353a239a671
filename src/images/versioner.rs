use std::io::Cursor;

use bytes::Bytes;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, ImageError};
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::storage::StorageClient;

pub const LARGE_WIDTH: u32 = 1024;
pub const THUMB_WIDTH: u32 = 100;
pub const JPEG_QUALITY: u8 = 90;
const JPEG_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendition {
    Large,
    Thumb,
}

impl Rendition {
    pub fn suffix(self) -> &'static str {
        match self {
            Rendition::Large => "large",
            Rendition::Thumb => "thumb",
        }
    }

    pub fn width(self) -> u32 {
        match self {
            Rendition::Large => LARGE_WIDTH,
            Rendition::Thumb => THUMB_WIDTH,
        }
    }
}

pub fn object_key(user_id: Uuid, image_id: &str, rendition: Rendition) -> String {
    format!("plates/{}/{}_{}.jpg", user_id, image_id, rendition.suffix())
}

/// Version id shared by both renditions: upload time in Unix milliseconds.
pub fn new_image_id(now: OffsetDateTime) -> String {
    (now.unix_timestamp_nanos() / 1_000_000).to_string()
}

/// Scales to `target_width` keeping the aspect ratio and re-encodes as JPEG.
pub fn render(source: &DynamicImage, target_width: u32) -> Result<Vec<u8>, ImageError> {
    let (w, h) = (source.width().max(1), source.height());
    let new_height = ((h as f64) * (target_width as f64) / (w as f64)).round().max(1.0) as u32;
    let resized = source.resize_exact(target_width, new_height, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&resized.to_rgb8())?;
    Ok(out.into_inner())
}

/// Decodes once and produces the large and thumbnail renditions.
pub fn render_pair(source: &[u8]) -> Result<(Vec<u8>, Vec<u8>), ImageError> {
    let img = image::load_from_memory(source)?;
    Ok((render(&img, LARGE_WIDTH)?, render(&img, THUMB_WIDTH)?))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredImage {
    pub image_id: String,
    pub image_url: String,
    pub thumbnail_url: String,
}

/// Renders both renditions, uploads them concurrently and returns their URLs.
/// All or nothing: if an upload or a presign fails, whatever was uploaded is deleted again.
#[instrument(skip(storage, source), fields(size = source.len()))]
pub async fn store_versions(
    storage: &dyn StorageClient,
    url_ttl_secs: u64,
    user_id: Uuid,
    image_id: &str,
    source: Bytes,
) -> Result<StoredImage, AppError> {
    let (large, thumb) = tokio::task::spawn_blocking(move || render_pair(&source))
        .await
        .map_err(|e| AppError::ImageProcessing(format!("render task: {e}")))?
        .map_err(|e| AppError::ImageProcessing(format!("encode: {e}")))?;

    let large_key = object_key(user_id, image_id, Rendition::Large);
    let thumb_key = object_key(user_id, image_id, Rendition::Thumb);

    let (large_res, thumb_res) = tokio::join!(
        storage.put_object(&large_key, Bytes::from(large), JPEG_MIME),
        storage.put_object(&thumb_key, Bytes::from(thumb), JPEG_MIME),
    );

    match (large_res, thumb_res) {
        (Ok(()), Ok(())) => {}
        (large_res, thumb_res) => {
            let mut cause = Vec::new();
            for (key, res) in [(&large_key, large_res), (&thumb_key, thumb_res)] {
                match res {
                    Ok(()) => {
                        if let Err(e) = storage.delete_object(key).await {
                            warn!(error = %e, key = %key, "could not remove orphaned rendition");
                        }
                    }
                    Err(e) => cause.push(format!("{key}: {e}")),
                }
            }
            return Err(AppError::ImageProcessing(cause.join("; ")));
        }
    }

    let presigned = tokio::try_join!(
        storage.presign_get(&large_key, url_ttl_secs),
        storage.presign_get(&thumb_key, url_ttl_secs),
    );
    let (image_url, thumbnail_url) = match presigned {
        Ok(urls) => urls,
        Err(e) => {
            for key in [&large_key, &thumb_key] {
                if let Err(e) = storage.delete_object(key).await {
                    warn!(error = %e, key = %key, "could not remove orphaned rendition");
                }
            }
            return Err(AppError::ImageProcessing(format!("download url: {e}")));
        }
    };

    debug!(%user_id, image_id, "image renditions stored");
    Ok(StoredImage {
        image_id: image_id.to_string(),
        image_url,
        thumbnail_url,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use image::{ImageFormat, Rgb, RgbImage};
    use time::macros::datetime;

    pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 120, 40])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn renditions_keep_aspect_ratio() {
        let (large, thumb) = render_pair(&sample_png(400, 300)).unwrap();
        let large = image::load_from_memory(&large).unwrap();
        let thumb = image::load_from_memory(&thumb).unwrap();
        assert_eq!((large.width(), large.height()), (1024, 768));
        assert_eq!((thumb.width(), thumb.height()), (100, 75));
        assert_eq!(image::guess_format(&render(&large, 100).unwrap()).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn undecodable_input_is_an_error() {
        assert!(render_pair(b"definitely not an image").is_err());
    }

    #[test]
    fn keys_share_the_version_id() {
        let user = Uuid::nil();
        let id = new_image_id(datetime!(2024-05-01 10:00 UTC));
        assert_eq!(id, "1714557600000");
        assert_eq!(
            object_key(user, &id, Rendition::Large),
            format!("plates/{user}/1714557600000_large.jpg")
        );
        assert_eq!(
            object_key(user, &id, Rendition::Thumb),
            format!("plates/{user}/1714557600000_thumb.jpg")
        );
    }

    #[tokio::test]
    async fn both_renditions_are_uploaded() {
        let storage = MemoryStorage::default();
        let user = Uuid::new_v4();
        let stored = store_versions(&storage, 60, user, "42", Bytes::from(sample_png(64, 32)))
            .await
            .unwrap();
        assert_eq!(storage.keys().len(), 2);
        assert!(stored.image_url.contains("42_large.jpg"));
        assert!(stored.thumbnail_url.contains("42_thumb.jpg"));
        let (_, ct) = storage.get(&object_key(user, "42", Rendition::Thumb)).unwrap();
        assert_eq!(ct, "image/jpeg");
    }

    #[tokio::test]
    async fn partial_upload_failure_leaves_no_orphan() {
        let storage = MemoryStorage::failing_on("_thumb");
        let err = store_versions(&storage, 60, Uuid::new_v4(), "7", Bytes::from(sample_png(64, 64)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ImageProcessing(_)));
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn presign_failure_removes_both_renditions() {
        let storage = MemoryStorage::failing_presign_on("_large");
        let err = store_versions(&storage, 60, Uuid::new_v4(), "9", Bytes::from(sample_png(64, 64)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ImageProcessing(_)));
        assert!(storage.keys().is_empty());
    }
}
