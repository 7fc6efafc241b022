//! Nostalgia scoring
//!
//! Nostalgia peaks for content released around the listener's early teens
//! (the reminiscence bump) and fades on either side. Content released before
//! the user was born can still resonate as inherited, cultural memory, which
//! is the only place popularity adds to the score on its own. Everywhere else
//! popularity only scales what personal nostalgia is already there.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Shape of the age-at-release curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeCurve {
    /// Age at which nostalgia peaks
    pub peak_age: f64,
    /// Gaussian width in years
    pub width: f64,
    /// Exponential decay per year for content older than the user
    pub prebirth_decay: f64,
}

impl Default for AgeCurve {
    fn default() -> Self {
        Self {
            peak_age: 13.0,
            width: 8.0,
            prebirth_decay: 0.03,
        }
    }
}

impl AgeCurve {
    /// Nostalgia in [0, 1] for content released when the user was `age_at_release`
    ///
    /// Negative ages anchor at the value for age zero and decay from there.
    pub fn score(&self, age_at_release: f64) -> f64 {
        if age_at_release >= 0.0 {
            self.gaussian(age_at_release)
        } else {
            self.gaussian(0.0) * (-self.prebirth_decay * age_at_release.abs()).exp()
        }
    }

    fn gaussian(&self, age: f64) -> f64 {
        let delta = age - self.peak_age;
        (-(delta * delta) / (2.0 * self.width * self.width)).exp()
    }
}

/// How popularity counts are squashed into [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopularityScale {
    /// Raw, unbounded counts (e.g. number of ratings)
    #[default]
    Log,
    /// Values already bounded by a known ceiling (e.g. a 0-100 index)
    Linear,
}

/// Age-based nostalgia with the default curve
pub fn age_nostalgia(age_at_release: f64) -> f64 {
    AgeCurve::default().score(age_at_release)
}

/// Log-compressed popularity so blockbusters don't dominate linearly
pub fn popularity_score(rating_count: f64, max_count: f64) -> f64 {
    if rating_count <= 0.0 || max_count <= 0.0 {
        return 0.0;
    }
    rating_count.ln_1p() / max_count.ln_1p()
}

/// Combined nostalgia score in [0, 1], rounded to three decimals
///
/// `personal * (0.7 + 0.3 * popularity) + cultural`, where `cultural` is
/// `0.4 * popularity` for pre-birth content and zero otherwise.
///
/// Callers are expected to have filtered out content that is too recent.
pub fn nostalgia_score(
    birth_year: i32,
    release_year: i32,
    rating_count: f64,
    max_count: f64,
    scale: PopularityScale,
) -> f64 {
    let age_at_release = f64::from(release_year) - f64::from(birth_year);
    let personal = age_nostalgia(age_at_release);

    let popularity = match scale {
        PopularityScale::Linear if max_count > 0.0 => (rating_count / max_count).min(1.0),
        PopularityScale::Linear => 0.0,
        PopularityScale::Log => popularity_score(rating_count, max_count),
    };

    let cultural = if age_at_release < 0.0 {
        popularity * 0.4
    } else {
        0.0
    };

    let combined = personal * (0.7 + 0.3 * popularity) + cultural;
    round3(combined.clamp(0.0, 1.0))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// A catalog item as seen by the offline ranker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub release_year: Option<i32>,
    /// Rating count or popularity index, depending on the ranker's scale
    pub popularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntry {
    pub entry: CatalogEntry,
    pub nostalgia: f64,
}

/// Orders catalog items by nostalgia for a given user
///
/// Used upstream of the bandit to rank retrieval results. Items younger than
/// `min_content_age` years, or without a release year, are dropped before
/// scoring.
#[derive(Debug, Clone)]
pub struct NostalgiaRanker {
    min_content_age: i32,
    scale: PopularityScale,
}

impl Default for NostalgiaRanker {
    fn default() -> Self {
        Self {
            min_content_age: 10,
            scale: PopularityScale::Log,
        }
    }
}

impl NostalgiaRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_content_age(mut self, years: i32) -> Self {
        self.min_content_age = years;
        self
    }

    pub fn with_scale(mut self, scale: PopularityScale) -> Self {
        self.scale = scale;
        self
    }

    /// Scores eligible items and returns them best first (ties keep input order)
    pub fn rank(
        &self,
        birth_year: i32,
        current_year: i32,
        entries: Vec<CatalogEntry>,
    ) -> Vec<ScoredEntry> {
        let total = entries.len();
        let cutoff = current_year.saturating_sub(self.min_content_age);

        let eligible: Vec<(i32, CatalogEntry)> = entries
            .into_iter()
            .filter_map(|entry| match entry.release_year {
                Some(year) if year <= cutoff => Some((year, entry)),
                _ => None,
            })
            .collect();

        let max_popularity = eligible
            .iter()
            .map(|(_, entry)| entry.popularity)
            .fold(0.0_f64, f64::max);

        let mut scored: Vec<ScoredEntry> = eligible
            .into_iter()
            .map(|(year, entry)| {
                let nostalgia =
                    nostalgia_score(birth_year, year, entry.popularity, max_popularity, self.scale);
                ScoredEntry { entry, nostalgia }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.nostalgia
                .partial_cmp(&a.nostalgia)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            total = total,
            eligible = scored.len(),
            cutoff_year = cutoff,
            "Ranked catalog by nostalgia"
        );

        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_nostalgia_peaks_at_thirteen() {
        assert!((age_nostalgia(13.0) - 1.0).abs() < 1e-12);
        assert!(age_nostalgia(12.0) < 1.0);
        assert!(age_nostalgia(14.0) < 1.0);
    }

    #[test]
    fn test_age_nostalgia_symmetric_after_birth() {
        for offset in [1.0, 4.0, 9.0, 13.0] {
            let below = age_nostalgia(13.0 - offset);
            let above = age_nostalgia(13.0 + offset);
            assert!((below - above).abs() < 1e-12, "offset {}", offset);
        }
        assert!(age_nostalgia(20.0) > age_nostalgia(30.0));
    }

    #[test]
    fn test_age_nostalgia_decreases_before_birth() {
        let at_birth = age_nostalgia(0.0);
        let mut previous = at_birth;
        for years_before in 1..60 {
            let value = age_nostalgia(-f64::from(years_before));
            assert!(value < previous);
            previous = value;
        }
        let expected = at_birth * (-0.03_f64 * 10.0).exp();
        assert!((age_nostalgia(-10.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_custom_curve() {
        let curve = AgeCurve {
            peak_age: 20.0,
            width: 5.0,
            prebirth_decay: 0.1,
        };
        assert!((curve.score(20.0) - 1.0).abs() < 1e-12);
        assert!(curve.score(13.0) < age_nostalgia(13.0));
    }

    #[test]
    fn test_popularity_score() {
        assert_eq!(popularity_score(0.0, 100.0), 0.0);
        assert_eq!(popularity_score(10.0, 0.0), 0.0);
        assert_eq!(popularity_score(-3.0, 100.0), 0.0);
        assert!((popularity_score(100.0, 100.0) - 1.0).abs() < 1e-12);

        // Log compression: a tenth of the ratings is still well over half the score
        assert!(popularity_score(1_000.0, 10_000.0) > 0.7);
    }

    #[test]
    fn test_nostalgia_score_at_peak() {
        let score = nostalgia_score(1990, 2003, 1000.0, 1000.0, PopularityScale::Log);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_popularity_amplifies_but_does_not_create() {
        let obscure = nostalgia_score(1990, 2003, 0.0, 1000.0, PopularityScale::Log);
        let popular = nostalgia_score(1990, 2003, 1000.0, 1000.0, PopularityScale::Log);
        assert_eq!(obscure, 0.7);
        assert!(popular > obscure);

        // Far from the bump: even a blockbuster stays low
        let late = nostalgia_score(1950, 2015, 1000.0, 1000.0, PopularityScale::Log);
        assert!(late < 0.01);
    }

    #[test]
    fn test_cultural_term_only_before_birth() {
        // Released during the user's lifetime: popularity only scales
        let born = nostalgia_score(1990, 1990, 500.0, 1000.0, PopularityScale::Linear);
        let expected = age_nostalgia(0.0) * (0.7 + 0.3 * 0.5);
        assert!((born - round3(expected)).abs() < 1e-9);

        // Released before: cultural boost applies
        let before = nostalgia_score(1990, 1980, 500.0, 1000.0, PopularityScale::Linear);
        let expected = age_nostalgia(-10.0) * (0.7 + 0.3 * 0.5) + 0.5 * 0.4;
        assert!((before - round3(expected)).abs() < 1e-9);
    }

    #[test]
    fn test_linear_scale_is_capped() {
        let capped = nostalgia_score(1990, 2003, 250.0, 100.0, PopularityScale::Linear);
        let exact = nostalgia_score(1990, 2003, 100.0, 100.0, PopularityScale::Linear);
        assert_eq!(capped, exact);
        assert_eq!(nostalgia_score(1990, 2003, 50.0, 0.0, PopularityScale::Linear), 0.7);
    }

    #[test]
    fn test_nostalgia_score_is_bounded() {
        let inputs = [
            (1900, 2100, 1e12, 1.0),
            (2100, 1900, 1e12, 1.0),
            (1990, 1980, -500.0, 10.0),
            (1990, 1960, 5.0, -10.0),
            (1985, 1970, 1e9, 1e9),
        ];
        for (birth, release, count, max) in inputs {
            for scale in [PopularityScale::Log, PopularityScale::Linear] {
                let score = nostalgia_score(birth, release, count, max, scale);
                assert!((0.0..=1.0).contains(&score), "{:?} -> {}", (birth, release), score);
            }
        }
    }

    #[test]
    fn test_score_rounded_to_three_decimals() {
        let score = nostalgia_score(1990, 2001, 37.0, 1234.0, PopularityScale::Log);
        assert!(((score * 1000.0).round() - score * 1000.0).abs() < 1e-9);
    }

    fn entry(id: &str, year: Option<i32>, popularity: f64) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            release_year: year,
            popularity,
        }
    }

    #[test]
    fn test_ranker_filters_recent_and_undated() {
        let ranker = NostalgiaRanker::new();
        let ranked = ranker.rank(
            1990,
            2024,
            vec![
                entry("recent", Some(2020), 900.0),
                entry("undated", None, 900.0),
                entry("boundary", Some(2014), 10.0),
                entry("bump", Some(2003), 100.0),
            ],
        );

        let ids: Vec<&str> = ranked.iter().map(|s| s.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["bump", "boundary"]);
    }

    #[test]
    fn test_ranker_orders_best_first() {
        let ranker = NostalgiaRanker::new().with_scale(PopularityScale::Linear);
        let ranked = ranker.rank(
            1985,
            2024,
            vec![
                entry("eighties", Some(1986), 80.0),
                entry("nineties", Some(1998), 80.0),
                entry("sixties", Some(1965), 100.0),
            ],
        );

        assert_eq!(ranked[0].entry.id, "nineties");
        for pair in ranked.windows(2) {
            assert!(pair[0].nostalgia >= pair[1].nostalgia);
        }
    }

    #[test]
    fn test_ranker_custom_min_age() {
        let ranker = NostalgiaRanker::new().with_min_content_age(0);
        let ranked = ranker.rank(1990, 2024, vec![entry("new", Some(2024), 1.0)]);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn test_extreme_years_do_not_overflow() {
        let score = nostalgia_score(i32::MIN, i32::MAX, 10.0, 100.0, PopularityScale::Log);
        assert_eq!(score, 0.0);

        let score = nostalgia_score(i32::MAX, i32::MIN, 100.0, 100.0, PopularityScale::Log);
        assert!((0.0..=1.0).contains(&score));

        let ranked = NostalgiaRanker::new().rank(1990, i32::MIN, vec![entry("any", Some(1980), 5.0)]);
        assert!(ranked.is_empty());
    }
}
