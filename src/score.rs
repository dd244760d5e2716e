use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage, RgbaImage};
use rayon::prelude::*;

use crate::compose::Candidate;
use crate::validate::{is_single_qr, Detector};

/// Scale applied to the candidate before the JPEG gauntlet.
pub const SCORE_SCALE: u32 = 10;

/// JPEG quality levels tried by the scorer, worst first.
const QUALITY_RANGE: std::ops::RangeInclusive<u8> = 1..=95;

// Robustness scoring
//------------------------------------------------------------------------------

/// Measures how robust an accepted candidate is against lossy re-encoding.
///
/// The candidate is scaled 10x and centered in a transparent canvas twice
/// that size, simulating real-world print/display margins. Each JPEG quality
/// level from 1 to 95 is then tried independently: flatten, encode, decode,
/// re-detect with the validator's acceptance rule. The score is the number of
/// passing levels plus one; the baseline accounts for the uncompressed
/// candidate, which already passed validation and is not re-verified here.
///
/// Quality levels are independent trials. A decode failure at one level is a
/// failed level, never an abort, and implies nothing about neighbors.
///
/// This pass is CPU-bound; callers run it inside the session's dedicated
/// rayon pool so it cannot starve network-bound sampling in sibling workers.
pub fn score(candidate: &Candidate, detector: &dyn Detector) -> u32 {
    let padded = pad(candidate.pixels());
    let flat = DynamicImage::ImageRgba8(padded).to_rgb8();

    let passing = QUALITY_RANGE
        .into_par_iter()
        .filter(|&quality| survives_jpeg(&flat, quality, detector))
        .count() as u32;

    passing + 1
}

/// 10x upscale, centered in a transparent canvas twice the scaled size.
fn pad(pixels: &RgbaImage) -> RgbaImage {
    let (w, h) = pixels.dimensions();
    let scaled = imageops::resize(pixels, w * SCORE_SCALE, h * SCORE_SCALE, FilterType::Nearest);
    let mut expanded = RgbaImage::new(w * 2 * SCORE_SCALE, h * 2 * SCORE_SCALE);
    imageops::overlay(
        &mut expanded,
        &scaled,
        i64::from(w * SCORE_SCALE / 2),
        i64::from(h * SCORE_SCALE / 2),
    );
    expanded
}

fn survives_jpeg(flat: &RgbImage, quality: u8, detector: &dyn Detector) -> bool {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    if encoder.encode_image(flat).is_err() {
        return false;
    }
    let Ok(decoded) = image::load_from_memory(&buf) else {
        return false;
    };
    is_single_qr(&detector.detect(&decoded.to_rgba8()))
}
