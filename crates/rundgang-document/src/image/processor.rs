// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, size bounding, and brightness scaling of captured
// photos before they are placed on a report page. Operates on in-memory images
// using the `image` crate.

use std::sync::Arc;

use image::{DynamicImage, ImageBuffer, ImageFormat, Pixel};
use rundgang_core::error::{Result, RundgangError};
use rundgang_core::types::ImageBitmap;
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining.
///
/// ```ignore
/// let page_image = ImageProcessor::from_bytes(&jpeg)?
///     .bound_long_edge(1600)
///     .adjust_brightness(1.1)
///     .into_processed();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| RundgangError::Decode(format!("failed to decode image: {err}")))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Load an image from a file path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(&data)
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Freeze the result into a shareable page bitmap.
    pub fn into_processed(self) -> ProcessedBitmap {
        ProcessedBitmap(Arc::new(self.image))
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Downscale so that neither side exceeds `max_px`, preserving aspect
    /// ratio. Images already within bounds are returned untouched.
    #[instrument(skip(self), fields(max_px))]
    pub fn bound_long_edge(self, max_px: u32) -> Self {
        if self.image.width() <= max_px && self.image.height() <= max_px {
            return self;
        }
        debug!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            max_px,
            "Downscaling image"
        );
        let resized = self
            .image
            .resize(max_px, max_px, image::imageops::FilterType::Lanczos3);
        Self { image: resized }
    }

    /// Scale every colour channel by `factor` (alpha untouched).
    ///
    /// Integer channels become `round(c * factor)` clamped to the channel's
    /// range; float channels are clamped to 0.0..=1.0. Bit depth and channel
    /// layout are kept. A factor of exactly 1.0 reproduces the input pixels.
    #[instrument(skip(self), fields(factor))]
    pub fn adjust_brightness(self, factor: f32) -> Self {
        if factor == 1.0 {
            return self;
        }
        let factor = factor.max(0.0);
        let s8 = |c: u8| (c as f32 * factor).round().clamp(0.0, u8::MAX as f32) as u8;
        let s16 = |c: u16| (c as f32 * factor).round().clamp(0.0, u16::MAX as f32) as u16;
        let sf = |c: f32| (c * factor).clamp(0.0, 1.0);

        let image = match self.image {
            DynamicImage::ImageLuma8(b) => DynamicImage::ImageLuma8(scale_colour(b, 1, &s8)),
            DynamicImage::ImageLumaA8(b) => DynamicImage::ImageLumaA8(scale_colour(b, 1, &s8)),
            DynamicImage::ImageRgb8(b) => DynamicImage::ImageRgb8(scale_colour(b, 3, &s8)),
            DynamicImage::ImageRgba8(b) => DynamicImage::ImageRgba8(scale_colour(b, 3, &s8)),
            DynamicImage::ImageLuma16(b) => DynamicImage::ImageLuma16(scale_colour(b, 1, &s16)),
            DynamicImage::ImageLumaA16(b) => DynamicImage::ImageLumaA16(scale_colour(b, 1, &s16)),
            DynamicImage::ImageRgb16(b) => DynamicImage::ImageRgb16(scale_colour(b, 3, &s16)),
            DynamicImage::ImageRgba16(b) => DynamicImage::ImageRgba16(scale_colour(b, 3, &s16)),
            DynamicImage::ImageRgb32F(b) => DynamicImage::ImageRgb32F(scale_colour(b, 3, &sf)),
            DynamicImage::ImageRgba32F(b) => DynamicImage::ImageRgba32F(scale_colour(b, 3, &sf)),
            // Layouts added to `image` later are normalised to 8-bit RGBA.
            other => DynamicImage::ImageRgba8(scale_colour(other.to_rgba8(), 3, &s8)),
        };
        Self { image }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| RundgangError::Decode(format!("PNG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| RundgangError::Decode(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }
}

/// Decoded, normalised photo ready for page placement.
///
/// Independent of the observation's raw payload; clones share the pixels.
#[derive(Clone)]
pub struct ProcessedBitmap(Arc<DynamicImage>);

impl ProcessedBitmap {
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.0
    }

    /// Stable identity of the pixel buffer, used to embed shared images once.
    pub(crate) fn buffer_id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl std::fmt::Debug for ProcessedBitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProcessedBitmap({}x{})", self.width(), self.height())
    }
}

/// Apply `scale` to the first `colour` channels of every pixel.
fn scale_colour<P: Pixel>(
    mut buffer: ImageBuffer<P, Vec<P::Subpixel>>,
    colour: usize,
    scale: impl Fn(P::Subpixel) -> P::Subpixel,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    for pixel in buffer.pixels_mut() {
        for channel in pixel.channels_mut().iter_mut().take(colour) {
            *channel = scale(*channel);
        }
    }
    buffer
}

/// Decode `bitmap` and scale its brightness by `factor`.
///
/// Fails with `RundgangError::Decode` when the payload is not a readable
/// image; no placeholder is ever substituted.
pub fn adjust_brightness(bitmap: &ImageBitmap, factor: f32) -> Result<ProcessedBitmap> {
    Ok(ImageProcessor::from_bytes(bitmap.as_bytes())?
        .adjust_brightness(factor)
        .into_processed())
}
