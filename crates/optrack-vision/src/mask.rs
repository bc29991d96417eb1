//! Binary placement mask derived from a color range.
//!
//! The valid placement region is the colored cloth around the surgical site.
//! The mask marks every pixel whose HSV value falls inside a tuned range,
//! OpenCV conventions (H in 0..180, S and V in 0..256) so ranges tuned with
//! the usual trackbar experiment carry over directly.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Inclusive HSV range, OpenCV scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    /// Lower bound [h, s, v]
    pub lower: [u8; 3],
    /// Upper bound [h, s, v]
    pub upper: [u8; 3],
}

impl HsvRange {
    /// Create a range from lower and upper bounds.
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Range covering the blue drape cloth under neutral lighting.
    pub fn blue_cloth() -> Self {
        Self {
            lower: [100, 80, 50],
            upper: [130, 255, 255],
        }
    }

    /// Whether an HSV triple falls inside the range.
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

impl Default for HsvRange {
    fn default() -> Self {
        Self::blue_cloth()
    }
}

/// Convert an RGB pixel to OpenCV-scaled HSV.
fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    // OpenCV stores hue halved to fit u8.
    [
        (hue / 2.0).round().min(179.0) as u8,
        (saturation * 255.0).round() as u8,
        (max * 255.0).round() as u8,
    ]
}

/// Binary mask over one frame marking the valid placement region.
#[derive(Debug, Clone)]
pub struct PlacementMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl PlacementMask {
    /// Build the mask for a frame from a color range.
    pub fn build(image: &RgbImage, range: &HsvRange) -> Self {
        let (width, height) = image.dimensions();
        let bits = image
            .pixels()
            .map(|p| range.contains(rgb_to_hsv(p.0)))
            .collect();
        Self { width, height, bits }
    }

    /// Whether the pixel at (x, y) lies inside the placement region.
    ///
    /// Coordinates outside the frame are outside the region.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[(y * self.width + x) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    // OpenCV-blue for a pure-blue RGB pixel: H=120, S=255, V=255.
    const PURE_BLUE: [u8; 3] = [0, 0, 255];
    const PURE_RED: [u8; 3] = [255, 0, 0];

    #[test]
    fn test_rgb_to_hsv_primaries() {
        assert_eq!(rgb_to_hsv(PURE_RED), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(PURE_BLUE), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([255, 255, 255]), [0, 0, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn test_blue_cloth_range_matches_blue_only() {
        let range = HsvRange::blue_cloth();
        assert!(range.contains(rgb_to_hsv(PURE_BLUE)));
        assert!(!range.contains(rgb_to_hsv(PURE_RED)));
        assert!(!range.contains(rgb_to_hsv([255, 255, 255])));
    }

    #[test]
    fn test_mask_contains() {
        // Left half blue, right half red.
        let mut image = RgbImage::from_pixel(10, 10, Rgb(PURE_RED));
        for y in 0..10 {
            for x in 0..5 {
                image.put_pixel(x, y, Rgb(PURE_BLUE));
            }
        }
        let mask = PlacementMask::build(&image, &HsvRange::blue_cloth());
        assert!(mask.contains(2, 5));
        assert!(!mask.contains(8, 5));
        // Out of bounds is outside the region.
        assert!(!mask.contains(10, 0));
        assert!(!mask.contains(0, 10));

        let inside = (0..10)
            .flat_map(|y| (0..10).map(move |x| (x, y)))
            .filter(|&(x, y)| mask.contains(x, y))
            .count();
        assert_eq!(inside, 50);
    }
}
