use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::compose::{composite, Candidate};
use crate::design::{NecessaryOverlay, SourceDesign};
use crate::error::{QartError, QartResult};
use crate::params::SearchParameters;
use crate::remote::Renderer;
use crate::score::score;
use crate::validate::{validate, Detector};

// Stop flag
//------------------------------------------------------------------------------

/// Shared cooperative cancellation signal.
///
/// Write-once-by-anyone: any worker or the top-level caller may set it, and
/// once set it is never cleared. Workers poll it at the top of each sampling
/// round; an attempt already past sampling always runs to completion.
#[derive(Debug, Default)]
pub struct StopFlag(AtomicBool);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// Session configuration
//------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Target URL or text the QR code must encode.
    pub target: String,
    /// Number of concurrent search workers.
    pub workers: usize,
    /// Stop the whole session once any worker persists a result.
    pub stop_on_found: bool,
    /// Directory results are written into.
    pub out_dir: PathBuf,
    /// Bound on sampling rounds per worker; `None` runs until stopped.
    pub max_attempts: Option<u64>,
}

impl SessionConfig {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_owned(),
            workers: 16,
            stop_on_found: false,
            out_dir: PathBuf::from("."),
            max_attempts: None,
        }
    }
}

// Found result
//------------------------------------------------------------------------------

/// A validated, scored candidate. Immutable once created.
#[derive(Debug, Clone)]
pub struct FoundResult {
    pub candidate: Candidate,
    pub params: SearchParameters,
    pub score: u32,
    pub name: String,
}

impl FoundResult {
    /// Deterministic filename carrying the session name, score and the exact
    /// parameter draw, so results are traceable and a different draw can
    /// never silently overwrite this one.
    pub fn filename(&self) -> String {
        format!("{}-{}-{}.png", self.name, self.score, self.params)
    }

    pub fn persist(&self, dir: &Path) -> QartResult<PathBuf> {
        let path = dir.join(self.filename());
        self.candidate.pixels().save(&path)?;
        Ok(path)
    }
}

// Coordinator
//------------------------------------------------------------------------------

struct WorkerContext {
    target: String,
    name: String,
    reference: String,
    necessary: NecessaryOverlay,
    out_dir: PathBuf,
    stop_on_found: bool,
    max_attempts: Option<u64>,
    renderer: Arc<dyn Renderer>,
    detector: Arc<dyn Detector>,
    scoring_pool: rayon::ThreadPool,
    stop: Arc<StopFlag>,
    found: AtomicU64,
}

/// Runs a full search session and blocks until every worker has exited.
///
/// Splits the design, uploads the desired overlay once to obtain the shared
/// reference handle, then races `config.workers` independent workers through
/// the sample/render/composite/validate/score/persist loop. Returns the
/// number of results persisted.
///
/// Setup failures (bad design, failed upload) abort before any worker
/// starts. Everything after that is either recovered per-attempt or a clean
/// cooperative shutdown through `stop`.
pub fn run_search(
    config: &SessionConfig,
    design: &SourceDesign,
    renderer: Arc<dyn Renderer>,
    detector: Arc<dyn Detector>,
    stop: Arc<StopFlag>,
) -> QartResult<u64> {
    let (desired, necessary) = design.split();
    let reference = renderer.upload_reference(&desired.to_png()?)?;
    info!(%reference, "uploaded reference image");

    // Scoring is CPU-bound (95 JPEG encode/decode/detect rounds); it runs in
    // its own pool so it cannot starve network-bound sampling in siblings.
    let scoring_pool = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("scoring-{i}"))
        .build()
        .map_err(|err| QartError::Io(err.to_string()))?;

    let ctx = Arc::new(WorkerContext {
        target: config.target.clone(),
        name: design.name().to_owned(),
        reference,
        necessary,
        out_dir: config.out_dir.clone(),
        stop_on_found: config.stop_on_found,
        max_attempts: config.max_attempts,
        renderer,
        detector,
        scoring_pool,
        stop,
        found: AtomicU64::new(0),
    });

    let handles: Vec<_> = (0..config.workers)
        .map(|i| {
            let ctx = Arc::clone(&ctx);
            thread::Builder::new()
                .name(format!("search-{i}"))
                .spawn(move || run_worker(&ctx))
                .map_err(QartError::from)
        })
        .collect::<QartResult<_>>()?;

    for handle in handles {
        if handle.join().is_err() {
            warn!("search worker panicked");
        }
    }
    Ok(ctx.found.load(Ordering::SeqCst))
}

/// One worker's sample → render → composite → validate → score → persist
/// loop. The stop flag is polled once per round, before sampling; a round
/// already in flight runs to completion, so a result validated just before
/// cancellation is still scored and persisted.
fn run_worker(ctx: &WorkerContext) {
    let mut rng = rand::rng();
    let mut attempts = 0u64;

    while !ctx.stop.is_set() {
        if ctx.max_attempts.is_some_and(|max| attempts >= max) {
            break;
        }
        attempts += 1;

        let params = SearchParameters::sample(&mut rng);
        debug!(%params, "trying");

        let raw = match ctx.renderer.render(&ctx.reference, &ctx.target, params) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(%params, %err, "attempt abandoned");
                continue;
            }
        };

        let candidate = composite(&raw, &ctx.necessary);
        if !validate(&candidate, ctx.detector.as_ref()) {
            continue;
        }
        info!(%params, "found a scannable candidate");

        let score = ctx
            .scoring_pool
            .install(|| score(&candidate, ctx.detector.as_ref()));

        let result = FoundResult {
            candidate,
            params,
            score,
            name: ctx.name.clone(),
        };
        match result.persist(&ctx.out_dir) {
            Ok(path) => {
                ctx.found.fetch_add(1, Ordering::SeqCst);
                info!(path = %path.display(), score, "saved result");
            }
            Err(err) => {
                warn!(%err, "failed to persist result");
                continue;
            }
        }

        if ctx.stop_on_found {
            ctx.stop.set();
            break;
        }
    }
}

#[cfg(test)]
mod search_tests {
    use super::*;

    #[test]
    fn test_stop_flag_is_monotonic() {
        let stop = StopFlag::new();
        assert!(!stop.is_set());
        stop.set();
        assert!(stop.is_set());
        stop.set();
        assert!(stop.is_set());
    }

    #[test]
    fn test_result_filename() {
        let candidate = crate::compose::composite(
            &image::RgbaImage::new(196, 196),
            &crate::design::SourceDesign::from_image(
                "x".to_owned(),
                image::RgbaImage::new(41, 41),
            )
            .unwrap()
            .split()
            .1,
        );
        let result = FoundResult {
            candidate,
            params: SearchParameters { mask: 7, orientation: 2, seed: 42 },
            score: 88,
            name: "rustacean".to_owned(),
        };
        assert_eq!(result.filename(), "rustacean-88-m7o2s42.png");
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::new("https://example.com");
        assert_eq!(config.workers, 16);
        assert!(!config.stop_on_found);
        assert!(config.max_attempts.is_none());
    }
}
