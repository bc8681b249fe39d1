//! Month texture decoding.

use streaming::cache::TextureError;

/// RGBA8 pixels ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub fn decode_texture(bytes: &[u8]) -> Result<DecodedImage, TextureError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| TextureError::Decode(e.to_string()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureError::Decode("empty image".to_string()));
    }
    Ok(DecodedImage {
        width,
        height,
        rgba: image.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::decode_texture;
    use image::{ImageFormat, Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use streaming::cache::TextureError;

    #[test]
    fn decodes_png_to_rgba() {
        let mut img = RgbaImage::new(4, 2);
        img.put_pixel(3, 1, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .expect("encode");

        let decoded = decode_texture(&bytes).expect("decode");
        assert_eq!((decoded.width, decoded.height), (4, 2));
        assert_eq!(decoded.rgba.len(), 4 * 2 * 4);
        // Row 1, column 3.
        let at = (4 + 3) * 4;
        assert_eq!(&decoded.rgba[at..at + 4], &[10, 20, 30, 255]);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_texture(b"<html>404</html>").expect_err("not an image");
        assert!(matches!(err, TextureError::Decode(_)));
    }
}
