use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

use crate::compose::Candidate;

/// Upscale factor applied before detection. Barcode detectors are sensitive
/// to resolution; 1px-per-module rasters are routinely missed.
pub const VALIDATE_SCALE: u32 = 2;

// Detection capability
//------------------------------------------------------------------------------

/// Barcode format reported by a decode capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    Qr,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectedCode {
    pub symbology: Symbology,
}

/// Barcode-decode capability shared by the validator and the scorer.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &RgbaImage) -> Vec<DetectedCode>;
}

/// QR detection backed by the `rqrr` crate.
///
/// Only grids that actually decode count as detected codes; rqrr reads QR
/// symbols exclusively, so every detection is tagged as such.
pub struct RqrrDetector;

impl Detector for RqrrDetector {
    fn detect(&self, image: &RgbaImage) -> Vec<DetectedCode> {
        let luma = DynamicImage::ImageRgba8(image.clone()).to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare(luma);
        prepared
            .detect_grids()
            .iter()
            .filter(|grid| grid.decode().is_ok())
            .map(|_| DetectedCode { symbology: Symbology::Qr })
            .collect()
    }
}

// Validation
//------------------------------------------------------------------------------

/// Exactly one detected code, and it is a QR symbol. Zero codes, several
/// codes, or a lone non-QR code all reject the candidate.
pub fn is_single_qr(codes: &[DetectedCode]) -> bool {
    matches!(codes, [code] if code.symbology == Symbology::Qr)
}

/// The accept/reject gate between "rendered" and "found". Rejection is not an
/// error; the worker simply resamples.
pub fn validate(candidate: &Candidate, detector: &dyn Detector) -> bool {
    let pixels = candidate.pixels();
    let (w, h) = pixels.dimensions();
    let upscaled = imageops::resize(
        pixels,
        w * VALIDATE_SCALE,
        h * VALIDATE_SCALE,
        FilterType::Nearest,
    );
    is_single_qr(&detector.detect(&upscaled))
}

#[cfg(test)]
mod validate_tests {
    use test_case::test_case;

    use super::*;

    #[test_case(0, Symbology::Qr, false; "zero_codes_rejected")]
    #[test_case(1, Symbology::Qr, true; "one_qr_accepted")]
    #[test_case(2, Symbology::Qr, false; "two_codes_rejected")]
    #[test_case(3, Symbology::Qr, false; "three_codes_rejected")]
    #[test_case(1, Symbology::Other, false; "one_non_qr_rejected")]
    fn test_acceptance_rule(count: usize, symbology: Symbology, accepted: bool) {
        let codes = vec![DetectedCode { symbology }; count];
        assert_eq!(is_single_qr(&codes), accepted);
    }
}
