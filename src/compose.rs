use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::design::{NecessaryOverlay, QART_MARGIN, QRCODE_SIZE};

/// Side length of a composed candidate: the module grid plus margin on all
/// sides.
pub const COMPOSITE_SIZE: u32 = QRCODE_SIZE + 2 * QART_MARGIN;

/// The QArt service rasterizes each module (and margin cell) as a 4x4 block.
pub const RENDER_SCALE: u32 = 4;

// Candidate
//------------------------------------------------------------------------------

/// A composed QR raster at the canonical size, with the necessary overlay
/// already forced on top. Discarded unless it passes validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pixels: RgbaImage,
}

impl Candidate {
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Composes a candidate from a raw render and the necessary overlay.
///
/// The raw render is scaled down to the canonical composite size and pasted
/// onto a transparent canvas; the necessary overlay then goes on top at the
/// margin offset, alpha-masked, so its opaque pixels overwrite the render
/// exactly and its transparent pixels leave the render untouched. The overlay
/// must be applied after the render: the hard pixel-art constraints win even
/// when the sampled render did not naturally produce them.
pub fn composite(raw: &RgbaImage, necessary: &NecessaryOverlay) -> Candidate {
    let scaled = imageops::resize(raw, COMPOSITE_SIZE, COMPOSITE_SIZE, FilterType::Nearest);

    let mut canvas = RgbaImage::new(COMPOSITE_SIZE, COMPOSITE_SIZE);
    imageops::replace(&mut canvas, &scaled, 0, 0);
    imageops::overlay(
        &mut canvas,
        necessary.pixels(),
        i64::from(QART_MARGIN),
        i64::from(QART_MARGIN),
    );

    Candidate { pixels: canvas }
}
