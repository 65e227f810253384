use image::RgbImage;

/// Decode an arbitrary byte buffer claimed to be an encoded image into an
/// RGB8 frame. Stateless and side-effect free; safe to call concurrently.
///
/// Malformed, truncated, or non-image input is classified as a failure and
/// returned, never panicked on. Producers send JPEG, but any format the
/// `image` crate recognizes from its magic bytes decodes the same way
/// (matching the permissive decode on the wire the original viewer had).
pub fn decode_frame(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let decoded = image::load_from_memory(bytes)?;
    Ok(decoded.to_rgb8())
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty image buffer")]
    Empty,
    #[error("failed to decode image: {0}")]
    Malformed(#[from] image::ImageError),
}
