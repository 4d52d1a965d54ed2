use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::ImageDecodeError;

/// Renders an uploaded image as a `data:` URL for display next to its result.
pub fn to_data_url(bytes: &[u8]) -> Result<String, ImageDecodeError> {
    if bytes.is_empty() {
        return Err(ImageDecodeError::Empty);
    }
    let format = image::guess_format(bytes).map_err(|_| ImageDecodeError::UnsupportedFormat)?;
    Ok(format!(
        "data:{};base64,{}",
        format.to_mime_type(),
        STANDARD.encode(bytes)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::png_bytes;

    #[test]
    fn png_preview_has_mime_prefix() {
        let bytes = png_bytes(4, 4);

        let url = to_data_url(&bytes).unwrap();

        let payload = url.strip_prefix("data:image/png;base64,").unwrap();
        assert_eq!(STANDARD.decode(payload).unwrap(), bytes);
    }

    #[test]
    fn rejects_non_images() {
        assert!(matches!(to_data_url(&[]), Err(ImageDecodeError::Empty)));
        assert!(matches!(
            to_data_url(b"plain text"),
            Err(ImageDecodeError::UnsupportedFormat)
        ));
    }
}
