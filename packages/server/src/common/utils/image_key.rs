/// Stable identifier for an image, derived from its source URL.
///
/// MD5 hex digest of the URL bytes. The same URL always maps to the same
/// object keys, which is what makes image archival idempotent.
pub fn image_id_for_url(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))
}

/// Object key of the original image.
pub fn original_key(image_id: &str) -> String {
    format!("images/original/{}.jpg", image_id)
}

/// Object key of the background-removed variant.
pub fn no_background_key(image_id: &str) -> String {
    format!("images/no-bg/{}.png", image_id)
}

pub const ORIGINAL_CONTENT_TYPE: &str = "image/jpeg";
pub const NO_BACKGROUND_CONTENT_TYPE: &str = "image/png";
