use std::fmt::{Display, Formatter};

use rand::Rng;

// Search parameters
//------------------------------------------------------------------------------

/// One draw of the QArt rendering knobs: mask pattern (0-7), rotation (0-3)
/// and the service's random seed.
///
/// The space is 8 * 4 * 2^32, far too large to enumerate, so draws are
/// sampled uniformly at random with no deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchParameters {
    pub mask: u8,
    pub orientation: u8,
    pub seed: u32,
}

impl SearchParameters {
    pub fn sample<R: Rng>(rng: &mut R) -> Self {
        Self {
            mask: rng.random_range(0..8),
            orientation: rng.random_range(0..4),
            seed: rng.random(),
        }
    }
}

impl Display for SearchParameters {
    /// Compact form used in result filenames, e.g. `m3o1s2887454119`.
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "m{}o{}s{}", self.mask, self.orientation, self.seed)
    }
}

#[cfg(test)]
mod params_tests {
    use super::SearchParameters;

    #[test]
    fn test_sample_ranges() {
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let params = SearchParameters::sample(&mut rng);
            assert!(params.mask < 8);
            assert!(params.orientation < 4);
        }
    }

    #[test]
    fn test_display_format() {
        let params = SearchParameters { mask: 3, orientation: 1, seed: 2887454119 };
        assert_eq!(params.to_string(), "m3o1s2887454119");
    }
}
