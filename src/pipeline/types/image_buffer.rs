use crate::error::ValidationError;
use bytes::Bytes;
use image::{DynamicImage, RgbImage};
use std::sync::Arc;

/// Smallest accepted width and height, in pixels.
pub const MIN_DIMENSION: u32 = 64;

/// Raw upload as received from the caller. Nothing is decoded until [`ImageBuffer::validate`].
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    bytes: Bytes,
}

impl ImageBuffer {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decodes the payload and enforces the minimum size. Consumes the raw bytes so the
    /// upload is not retained past validation.
    pub fn validate(self, min_dimension: u32) -> Result<DecodedImage, ValidationError> {
        if self.bytes.is_empty() {
            return Err(ValidationError::Empty);
        }

        let image = image::load_from_memory(&self.bytes)
            .map_err(|e| ValidationError::Undecodable(e.to_string()))?;

        let (width, height) = (image.width(), image.height());
        if width < min_dimension || height < min_dimension {
            return Err(ValidationError::TooSmall {
                width,
                height,
                min: min_dimension,
            });
        }

        Ok(DecodedImage::new(image))
    }
}

/// A validated image, shared cheaply between pipeline steps.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: Arc<DynamicImage>,
    width: u32,
    height: u32,
}

impl DecodedImage {
    pub fn new(image: DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        Self {
            image: Arc::new(image),
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    pub fn shared(&self) -> Arc<DynamicImage> {
        Arc::clone(&self.image)
    }

    pub fn to_rgb8(&self) -> RgbImage {
        self.image.to_rgb8()
    }

    /// Geometric center, used as the segmentation seed.
    pub fn center(&self) -> SeedPoint {
        SeedPoint {
            x: self.width / 2,
            y: self.height / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPoint {
    pub x: u32,
    pub y: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::png_bytes;

    #[test]
    fn validate_accepts_minimum_sized_png() {
        let decoded = ImageBuffer::new(png_bytes(64, 64, [10, 20, 30]))
            .validate(MIN_DIMENSION)
            .unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 64);
    }

    #[test]
    fn validate_rejects_undersized_images() {
        let error = ImageBuffer::new(png_bytes(256, 63, [0, 0, 0]))
            .validate(MIN_DIMENSION)
            .unwrap_err();
        assert_eq!(
            error,
            ValidationError::TooSmall {
                width: 256,
                height: 63,
                min: 64
            }
        );
    }

    #[test]
    fn validate_rejects_garbage_and_empty_payloads() {
        let garbage = ImageBuffer::new(b"definitely not an image".to_vec());
        assert!(matches!(
            garbage.validate(MIN_DIMENSION),
            Err(ValidationError::Undecodable(_))
        ));

        let empty = ImageBuffer::new(Vec::<u8>::new());
        assert!(empty.is_empty());
        assert_eq!(empty.validate(MIN_DIMENSION).unwrap_err(), ValidationError::Empty);
    }

    #[test]
    fn center_is_the_seed_point() {
        let decoded = ImageBuffer::new(png_bytes(256, 128, [1, 2, 3]))
            .validate(MIN_DIMENSION)
            .unwrap();
        assert_eq!(decoded.center(), SeedPoint { x: 128, y: 64 });
    }

    #[test]
    fn cloning_decoded_image_shares_pixels() {
        let decoded = ImageBuffer::new(png_bytes(64, 64, [1, 2, 3]))
            .validate(MIN_DIMENSION)
            .unwrap();
        let copy = decoded.clone();
        assert!(Arc::ptr_eq(&decoded.shared(), &copy.shared()));
    }
}
