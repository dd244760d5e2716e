use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::RgbaImage;
use rand::Rng;

use crate::compose::{COMPOSITE_SIZE, RENDER_SCALE};
use crate::error::{QartError, QartResult};
use crate::params::SearchParameters;

/// The public QArt drawing service.
pub const DEFAULT_SERVICE: &str = "https://research.swtch.com/qr";

const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const DATA_URI_PREFIX: &str = "data:image/png;base64,";

// Renderer capability
//------------------------------------------------------------------------------

/// The external QR-art generator.
///
/// `upload_reference` runs once per session; failure there is fatal. `render`
/// failures are per-attempt and transient: the worker abandons the draw and
/// samples fresh parameters.
pub trait Renderer: Send + Sync {
    /// Uploads the desired-overlay PNG, returning an opaque reference-image
    /// id reusable across render calls.
    fn upload_reference(&self, png: &[u8]) -> QartResult<String>;

    /// Renders one candidate draw. The returned raster is 4x the canonical
    /// composite size (the service rasterizes each module as a 4x4 block).
    fn render(
        &self,
        reference: &str,
        target: &str,
        params: SearchParameters,
    ) -> QartResult<RgbaImage>;
}

// QArt client
//------------------------------------------------------------------------------

/// HTTP client for the QArt drawing service at research.swtch.com.
pub struct QartClient {
    agent: ureq::Agent,
    base_url: String,
}

impl QartClient {
    pub fn new(base_url: &str) -> Self {
        // Redirects stay disabled: the upload endpoint answers with a 302
        // whose Location query carries the reference-image id.
        let agent = ureq::AgentBuilder::new()
            .timeout(CALL_TIMEOUT)
            .redirects(0)
            .build();
        Self { agent, base_url: base_url.trim_end_matches('/').to_owned() }
    }
}

impl Default for QartClient {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE)
    }
}

impl Renderer for QartClient {
    fn upload_reference(&self, png: &[u8]) -> QartResult<String> {
        let boundary = format!("pixelqart{:016x}", rand::rng().random::<u64>());
        let body = multipart_png(&boundary, png);

        let url = format!("{}/draw?upload=1", self.base_url);
        let response = self
            .agent
            .post(&url)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(&body);

        // With redirects disabled the 302 may surface on either arm
        // depending on the ureq version.
        let response = match response {
            Ok(resp) => resp,
            Err(ureq::Error::Status(302, resp)) => resp,
            Err(err) => return Err(QartError::UploadFailed(err.to_string())),
        };
        if response.status() != 302 {
            return Err(QartError::UploadFailed(format!(
                "expected a 302 redirect, got {}",
                response.status()
            )));
        }
        let location = response
            .header("Location")
            .ok_or_else(|| QartError::UploadFailed("302 without Location".to_owned()))?;
        reference_id(location)
            .ok_or_else(|| QartError::UploadFailed(format!("no image id in {location}")))
    }

    fn render(
        &self,
        reference: &str,
        target: &str,
        params: SearchParameters,
    ) -> QartResult<RgbaImage> {
        let url = format!("{}/draw", self.base_url);
        let response = self
            .agent
            .get(&url)
            // Fixed protocol knobs: no offset/crop, version 6 (41x41),
            // random pixels on, data-pixels-only and dither off, no source
            // scaling.
            .query("x", "0")
            .query("y", "0")
            .query("c", "0")
            .query("v", "6")
            .query("r", "1")
            .query("d", "0")
            .query("t", "0")
            .query("z", "0")
            .query("i", reference)
            .query("u", target)
            .query("m", &params.mask.to_string())
            .query("o", &params.orientation.to_string())
            .query("s", &params.seed.to_string())
            .call()
            .map_err(|err| QartError::RenderTransport(err.to_string()))?;

        let body = response
            .into_string()
            .map_err(|err| QartError::RenderTransport(err.to_string()))?;
        decode_render(&body)
    }
}

fn multipart_png(boundary: &str, png: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(png.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image\"; filename=\"design.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(png);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Pulls the `i` query parameter out of the upload redirect's Location.
fn reference_id(location: &str) -> Option<String> {
    let (_, query) = location.split_once('?')?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("i="))
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
}

/// The draw endpoint answers with JS source whose second string literal is a
/// base64 PNG data URI of the rendered code.
fn decode_render(body: &str) -> QartResult<RgbaImage> {
    let literal = body
        .split('"')
        .nth(1)
        .ok_or_else(|| QartError::MalformedRender("no string literal in body".to_owned()))?;
    let encoded = literal.strip_prefix(DATA_URI_PREFIX).ok_or_else(|| {
        QartError::MalformedRender("payload is not a PNG data URI".to_owned())
    })?;
    let bytes = BASE64
        .decode(encoded)
        .map_err(|err| QartError::MalformedRender(format!("bad base64: {err}")))?;
    let raster = image::load_from_memory(&bytes)
        .map_err(|err| QartError::MalformedRender(format!("bad PNG: {err}")))?
        .to_rgba8();

    let expected = COMPOSITE_SIZE * RENDER_SCALE;
    let (w, h) = raster.dimensions();
    if (w, h) != (expected, expected) {
        return Err(QartError::MalformedRender(format!(
            "expected {expected}x{expected}, got {w}x{h}"
        )));
    }
    Ok(raster)
}

#[cfg(test)]
mod remote_tests {
    use image::{Rgba, RgbaImage};

    use super::*;

    #[test]
    fn test_reference_id_from_location() {
        let loc = "/qr/draw?i=abcdef0123456789&x=0";
        assert_eq!(reference_id(loc), Some("abcdef0123456789".to_owned()));
        assert_eq!(reference_id("/qr/draw"), None);
        assert_eq!(reference_id("/qr/draw?x=0&y=1"), None);
        assert_eq!(reference_id("/qr/draw?i="), None);
    }

    #[test]
    fn test_decode_render_roundtrip() {
        let side = COMPOSITE_SIZE * RENDER_SCALE;
        let img = RgbaImage::from_pixel(side, side, Rgba([0, 0, 0, 255]));
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();
        let body = format!(
            "var img = \"{DATA_URI_PREFIX}{}\";",
            BASE64.encode(png.into_inner())
        );
        let raster = decode_render(&body).unwrap();
        assert_eq!(raster.dimensions(), (side, side));
    }

    #[test]
    fn test_decode_render_rejects_wrong_dimensions() {
        let img = RgbaImage::new(10, 10);
        let mut png = std::io::Cursor::new(Vec::new());
        img.write_to(&mut png, image::ImageFormat::Png).unwrap();
        let body = format!(
            "var img = \"{DATA_URI_PREFIX}{}\";",
            BASE64.encode(png.into_inner())
        );
        assert!(matches!(
            decode_render(&body),
            Err(QartError::MalformedRender(_))
        ));
    }

    #[test]
    fn test_decode_render_rejects_missing_marker() {
        assert!(matches!(
            decode_render("no quotes here"),
            Err(QartError::MalformedRender(_))
        ));
        assert!(matches!(
            decode_render("var x = \"not a data uri\";"),
            Err(QartError::MalformedRender(_))
        ));
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_png("b0undary", &[1, 2, 3]);
        let text = String::from_utf8_lossy(&body);
        assert!(text.starts_with("--b0undary\r\n"));
        assert!(text.contains("name=\"image\""));
        assert!(text.ends_with("\r\n--b0undary--\r\n"));
    }
}
