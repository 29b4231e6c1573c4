use image::{DynamicImage, GrayImage, Luma, RgbImage};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    error::{PhenotypeError, Result},
    traits::ImagePreprocessor,
};

/// Simple thresholding preprocessor
#[derive(Debug, Clone)]
pub struct ThresholdPreprocessor {
    pub threshold: u8,
}

impl Default for ThresholdPreprocessor {
    fn default() -> Self {
        Self { threshold: 128 }
    }
}

impl ImagePreprocessor for ThresholdPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        Ok(imageproc::contrast::threshold(image, self.threshold))
    }
}

/// Gaussian blur preprocessor for noise reduction
#[derive(Debug, Clone)]
pub struct GaussianBlurPreprocessor {
    pub sigma: f32,
}

impl Default for GaussianBlurPreprocessor {
    fn default() -> Self {
        Self { sigma: 1.0 }
    }
}

impl ImagePreprocessor for GaussianBlurPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        if self.sigma <= 0.0 {
            return Err(PhenotypeError::Configuration(format!(
                "blur sigma must be positive, got {}",
                self.sigma
            )));
        }
        Ok(imageproc::filter::gaussian_blur_f32(image, self.sigma))
    }
}

/// How the local threshold of [`AdaptiveThresholdPreprocessor`] is computed
#[derive(
    Debug, Clone, Copy, Default,
    Serialize, Deserialize, JsonSchema,
    Display, EnumString, IntoStaticStr,
    PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AdaptiveMethod {
    /// Plain mean of the block
    Mean,
    /// Gaussian-weighted mean of the block
    #[default]
    Gaussian,
}

/// Adaptive threshold preprocessor.
///
/// A pixel is foreground when it is brighter than the local mean minus
/// `offset`; with `invert` set the comparison flips, so pixels darker than
/// their surroundings become foreground.
#[derive(Debug, Clone)]
pub struct AdaptiveThresholdPreprocessor {
    pub method: AdaptiveMethod,
    /// Side of the square neighbourhood, odd and at least 3
    pub block_size: u32,
    pub offset: f32,
    pub invert: bool,
}

impl Default for AdaptiveThresholdPreprocessor {
    fn default() -> Self {
        Self {
            method: AdaptiveMethod::Mean,
            block_size: 11,
            offset: 2.0,
            invert: false,
        }
    }
}

impl AdaptiveThresholdPreprocessor {
    fn local_mean(&self, image: &GrayImage) -> GrayImage {
        let radius = self.block_size / 2;
        match self.method {
            AdaptiveMethod::Mean => imageproc::filter::box_filter(image, radius, radius),
            AdaptiveMethod::Gaussian => {
                // sigma of a Gaussian kernel sized to the block
                let sigma = 0.3 * ((self.block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
                imageproc::filter::gaussian_blur_f32(image, sigma)
            }
        }
    }
}

impl ImagePreprocessor for AdaptiveThresholdPreprocessor {
    fn preprocess(&self, image: &GrayImage) -> Result<GrayImage> {
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(PhenotypeError::Configuration(format!(
                "adaptive threshold block size must be odd and >= 3, got {}",
                self.block_size
            )));
        }

        let mean = self.local_mean(image);
        let mut output = GrayImage::new(image.width(), image.height());
        for (x, y, pixel) in output.enumerate_pixels_mut() {
            let value = image.get_pixel(x, y)[0] as f32;
            let local = mean.get_pixel(x, y)[0] as f32 - self.offset;
            let foreground = (value > local) != self.invert;
            *pixel = Luma([if foreground { 255 } else { 0 }]);
        }
        Ok(output)
    }
}

/// Luma conversion of an RGB image
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    image::imageops::grayscale(image)
}

/// Expand a grayscale image to three channels for colour overlays
pub fn grayscale_to_rgb(image: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(image.clone()).to_rgb8()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dark_square_on_gray() -> GrayImage {
        let mut img = GrayImage::from_pixel(60, 60, Luma([150u8]));
        for y in 20..40 {
            for x in 20..40 {
                img.put_pixel(x, y, Luma([30u8]));
            }
        }
        img
    }

    #[test]
    fn test_threshold_is_binary() {
        let result = ThresholdPreprocessor { threshold: 100 }
            .preprocess(&dark_square_on_gray())
            .unwrap();
        assert_eq!(result.get_pixel(0, 0)[0], 255);
        assert_eq!(result.get_pixel(30, 30)[0], 0);
    }

    #[test]
    fn test_inverted_adaptive_threshold_marks_dark_region() {
        let pre = AdaptiveThresholdPreprocessor {
            method: AdaptiveMethod::Mean,
            block_size: 15,
            offset: 2.0,
            invert: true,
        };
        let result = pre.preprocess(&dark_square_on_gray()).unwrap();

        // dark pixels next to bright ones fall below the local mean
        assert_eq!(result.get_pixel(21, 21)[0], 255);
        // flat background equals its own mean and stays background
        assert_eq!(result.get_pixel(2, 2)[0], 0);
        assert!(result.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_gaussian_adaptive_threshold_runs() {
        let pre = AdaptiveThresholdPreprocessor {
            method: AdaptiveMethod::Gaussian,
            block_size: 15,
            offset: 2.0,
            invert: true,
        };
        let result = pre.preprocess(&dark_square_on_gray()).unwrap();
        assert_eq!(result.get_pixel(21, 21)[0], 255);
        assert_eq!(result.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn test_adaptive_threshold_rejects_even_block() {
        let pre = AdaptiveThresholdPreprocessor { block_size: 10, ..Default::default() };
        assert!(matches!(
            pre.preprocess(&dark_square_on_gray()),
            Err(PhenotypeError::Configuration(_))
        ));
    }

    #[test]
    fn test_grayscale_round_trip_keeps_intensity() {
        let gray = dark_square_on_gray();
        let rgb = grayscale_to_rgb(&gray);
        assert_eq!(rgb.get_pixel(30, 30).0, [30, 30, 30]);
        assert_eq!(to_grayscale(&rgb).get_pixel(30, 30)[0], 30);
    }
}
