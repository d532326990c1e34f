use std::path::Path;

use ::image::{DynamicImage, ImageFormat, RgbImage};
use log::{debug, warn};

use crate::config;
use crate::media::{Adapter, AdapterError};

/// Dimensions needed to rebuild an RGB image from its carrier bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    pub width: u32,
    pub height: u32,
}

impl ImageShape {
    pub fn units(&self) -> usize {
        config::units_per_frame(self.width, self.height)
    }
}

/// Flattens pixels row by row, column by column, channel by channel (R, G, B).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageAdapter;

impl Adapter for ImageAdapter {
    type Medium = RgbImage;
    type Shape = ImageShape;

    fn flatten(&self, medium: &RgbImage) -> (Vec<u8>, ImageShape) {
        let (width, height) = medium.dimensions();
        // RgbImage stores its samples in exactly the carrier order.
        (medium.as_raw().clone(), ImageShape { width, height })
    }

    fn unflatten(&self, units: Vec<u8>, shape: &ImageShape) -> Result<RgbImage, AdapterError> {
        let got = units.len();
        RgbImage::from_raw(shape.width, shape.height, units).ok_or(AdapterError::ShapeMismatch {
            expected: shape.units(),
            got,
        })
    }
}

/// Open an image file and convert it to 8-bit RGB. Alpha is dropped.
pub fn load(path: &Path) -> Result<RgbImage, AdapterError> {
    let image = ::image::open(path)?;
    if !matches!(image, DynamicImage::ImageRgb8(_)) {
        debug!("converting {:?} image to RGB8", image.color());
    }
    Ok(image.to_rgb8())
}

/// Save an RGB image, choosing the format from the file extension.
///
/// Lossy formats are refused because re-quantisation destroys the LSBs.
pub fn save(image: &RgbImage, path: &Path) -> Result<(), AdapterError> {
    let format = ImageFormat::from_path(path)?;
    if is_lossy(format) {
        return Err(AdapterError::LossyOutput(format!("{:?}", format)));
    }
    if format != ImageFormat::Png && format != ImageFormat::Bmp {
        warn!("saving carrier as {:?}; PNG or BMP is recommended", format);
    }
    image.save_with_format(path, format)?;
    Ok(())
}

fn is_lossy(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::Avif)
}
