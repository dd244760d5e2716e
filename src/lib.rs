//! # pixelqart
//!
//! Brute-force search for scannable QR codes that display a chosen piece of
//! pixel art, built on top of the QArt drawing service.
//!
//! A 41x41 source design (QR version 6) marks its hard constraints with two
//! sentinel colors: blue pixels must end up true black in the final code,
//! yellow pixels true white. The design is split into a *desired* overlay
//! (the full art, uploaded once as the renderer's reference image) and a
//! *necessary* overlay (only the sentinel pixels). Concurrent workers then
//! race: each samples random rendering parameters (mask pattern, rotation,
//! seed), asks the service for a candidate render, forces the necessary
//! overlay on top, and keeps the result only if it still decodes as exactly
//! one QR code. Accepted candidates are scored by how many JPEG quality
//! levels from 1 to 95 they survive, and persisted under a deterministic
//! name.
//!
//! ## Splitting a design
//!
//! ```rust
//! use image::{Rgba, RgbaImage};
//! use pixelqart::SourceDesign;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut art = RgbaImage::from_pixel(41, 41, Rgba([255, 255, 255, 255]));
//! art.put_pixel(10, 10, Rgba([0, 0, 255, 255])); // necessary black
//!
//! let design = SourceDesign::from_image("demo".to_owned(), art)?;
//! let (desired, necessary) = design.split();
//! assert_eq!(*necessary.pixels().get_pixel(10, 10), Rgba([0, 0, 0, 255]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Running a search
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use pixelqart::{
//!     run_search, QartClient, RqrrDetector, SessionConfig, SourceDesign, StopFlag,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let design = SourceDesign::open(Path::new("rustacean.png"))?;
//! let mut config = SessionConfig::new("https://example.com/");
//! config.stop_on_found = true;
//!
//! let found = run_search(
//!     &config,
//!     &design,
//!     Arc::new(QartClient::default()),
//!     Arc::new(RqrrDetector),
//!     Arc::new(StopFlag::new()),
//! )?;
//! println!("persisted {found} result(s)");
//! # Ok(())
//! # }
//! ```

pub mod compose;
pub mod design;
pub mod error;
pub mod params;
pub mod remote;
pub mod score;
pub mod search;
pub mod validate;

pub use compose::{composite, Candidate, COMPOSITE_SIZE, RENDER_SCALE};
pub use design::{DesiredOverlay, NecessaryOverlay, SourceDesign, QART_MARGIN, QRCODE_SIZE};
pub use error::{QartError, QartResult};
pub use params::SearchParameters;
pub use remote::{QartClient, Renderer, DEFAULT_SERVICE};
pub use score::score;
pub use search::{run_search, FoundResult, SessionConfig, StopFlag};
pub use validate::{validate, DetectedCode, Detector, RqrrDetector, Symbology};
