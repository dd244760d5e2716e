use std::path::Path;

use image::{DynamicImage, Rgba, RgbaImage};

use crate::error::{QartError, QartResult};

/// Side length of the module grid. QR version 6 renders 41x41 modules.
pub const QRCODE_SIZE: u32 = 41;

/// Blank border, in modules, that the QArt service draws around the grid.
pub const QART_MARGIN: u32 = 4;

// Reserved sentinel colors in the source design. Pixels matching these must
// survive in every found candidate as true black/white.
const NECESSARY_BLACK: Rgba<u8> = Rgba([0, 0, 255, 255]);
const NECESSARY_WHITE: Rgba<u8> = Rgba([255, 255, 0, 255]);

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

// Source design
//------------------------------------------------------------------------------

/// A pixel-art design to embed in a QR code, loaded from a 41x41 RGBA PNG.
///
/// Necessary black and white modules must be marked with blue (#00f) and
/// yellow (#ff0) respectively; every other pixel is a soft preference passed
/// through to the renderer as-is.
#[derive(Debug, Clone)]
pub struct SourceDesign {
    name: String,
    pixels: RgbaImage,
}

impl SourceDesign {
    /// Loads a design from a PNG file. The design name is the file stem and
    /// is later used to build result filenames.
    pub fn open(path: &Path) -> QartResult<Self> {
        let is_png = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if !is_png {
            return Err(QartError::InvalidDesign(format!(
                "expected a .png file, got {}",
                path.display()
            )));
        }
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                QartError::InvalidDesign(format!("unusable file name {}", path.display()))
            })?
            .to_owned();
        let img = image::open(path)?;
        let DynamicImage::ImageRgba8(pixels) = img else {
            return Err(QartError::InvalidDesign("design must be RGBA".to_owned()));
        };
        Self::from_image(name, pixels)
    }

    pub fn from_image(name: String, pixels: RgbaImage) -> QartResult<Self> {
        let (w, h) = pixels.dimensions();
        if (w, h) != (QRCODE_SIZE, QRCODE_SIZE) {
            return Err(QartError::InvalidDesign(format!(
                "design must be {QRCODE_SIZE}x{QRCODE_SIZE}, got {w}x{h}"
            )));
        }
        Ok(Self { name, pixels })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Splits the design into its desired and necessary parts.
    ///
    /// Sentinel pixels are normalized to true black/white in both outputs.
    /// All other pixels are copied only into the desired overlay; the
    /// necessary overlay stays fully transparent there.
    pub fn split(&self) -> (DesiredOverlay, NecessaryOverlay) {
        let mut desired = RgbaImage::new(QRCODE_SIZE, QRCODE_SIZE);
        let mut necessary = RgbaImage::new(QRCODE_SIZE, QRCODE_SIZE);

        for (x, y, px) in self.pixels.enumerate_pixels() {
            match *px {
                p if p == NECESSARY_BLACK => {
                    desired.put_pixel(x, y, BLACK);
                    necessary.put_pixel(x, y, BLACK);
                }
                p if p == NECESSARY_WHITE => {
                    desired.put_pixel(x, y, WHITE);
                    necessary.put_pixel(x, y, WHITE);
                }
                p => desired.put_pixel(x, y, p),
            }
        }

        (DesiredOverlay(desired), NecessaryOverlay(necessary))
    }
}

// Overlays
//------------------------------------------------------------------------------

/// Full pixel art with sentinels normalized; sent to the renderer as the
/// reference image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredOverlay(pub(crate) RgbaImage);

impl DesiredOverlay {
    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }

    /// PNG-encodes the overlay for the reference upload.
    pub fn to_png(&self) -> QartResult<Vec<u8>> {
        let mut buf = std::io::Cursor::new(Vec::new());
        self.0.write_to(&mut buf, image::ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// Only the sentinel pixels, opaque black/white; everything else transparent.
/// Pasted over every candidate so the hard constraints always win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NecessaryOverlay(pub(crate) RgbaImage);

impl NecessaryOverlay {
    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }
}

#[cfg(test)]
mod design_tests {
    use image::{Rgba, RgbaImage};
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn design_from(pixels: RgbaImage) -> SourceDesign {
        SourceDesign::from_image("test".to_owned(), pixels).unwrap()
    }

    fn blank() -> RgbaImage {
        RgbaImage::from_pixel(QRCODE_SIZE, QRCODE_SIZE, WHITE)
    }

    #[test]
    fn test_rejects_wrong_size() {
        let img = RgbaImage::new(40, 41);
        let res = SourceDesign::from_image("test".to_owned(), img);
        assert!(matches!(res, Err(QartError::InvalidDesign(_))));
    }

    #[test_case(NECESSARY_BLACK, BLACK; "necessary_black_maps_to_black")]
    #[test_case(NECESSARY_WHITE, WHITE; "necessary_white_maps_to_white")]
    fn test_sentinel_split(sentinel: Rgba<u8>, normalized: Rgba<u8>) {
        let mut img = blank();
        img.put_pixel(7, 3, sentinel);
        let (desired, necessary) = design_from(img).split();
        assert_eq!(*desired.pixels().get_pixel(7, 3), normalized);
        assert_eq!(*necessary.pixels().get_pixel(7, 3), normalized);
    }

    #[test]
    fn test_non_sentinel_pixels_pass_through() {
        let mut img = blank();
        let odd = Rgba([12, 34, 56, 78]);
        img.put_pixel(0, 40, odd);
        let (desired, necessary) = design_from(img).split();
        assert_eq!(*desired.pixels().get_pixel(0, 40), odd);
        assert_eq!(necessary.pixels().get_pixel(0, 40).0[3], 0);
    }

    #[test]
    fn test_necessary_block_scenario() {
        // All-white design with a 3x3 necessary-black block at (10,10)-(12,12).
        let mut img = blank();
        for y in 10..=12 {
            for x in 10..=12 {
                img.put_pixel(x, y, NECESSARY_BLACK);
            }
        }
        let (desired, necessary) = design_from(img).split();

        let opaque: Vec<_> = necessary
            .pixels()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] != 0)
            .collect();
        assert_eq!(opaque.len(), 9);
        assert!(opaque.iter().all(|(x, y, p)| {
            (10..=12).contains(x) && (10..=12).contains(y) && **p == BLACK
        }));

        for (x, y, px) in desired.pixels().enumerate_pixels() {
            let in_block = (10..=12).contains(&x) && (10..=12).contains(&y);
            let expected = if in_block { BLACK } else { WHITE };
            assert_eq!(*px, expected, "desired mismatch at ({x},{y})");
        }
    }

    proptest! {
        #[test]
        fn proptest_pixel_classification(r in any::<u8>(), g in any::<u8>(), b in any::<u8>(), a in any::<u8>()) {
            let px = Rgba([r, g, b, a]);
            let mut img = blank();
            img.put_pixel(20, 20, px);
            let (desired, necessary) = design_from(img).split();

            let d = *desired.pixels().get_pixel(20, 20);
            let n = *necessary.pixels().get_pixel(20, 20);
            if px == NECESSARY_BLACK {
                prop_assert_eq!(d, BLACK);
                prop_assert_eq!(n, BLACK);
            } else if px == NECESSARY_WHITE {
                prop_assert_eq!(d, WHITE);
                prop_assert_eq!(n, WHITE);
            } else {
                prop_assert_eq!(d, px);
                prop_assert_eq!(n.0[3], 0);
            }
        }
    }
}
