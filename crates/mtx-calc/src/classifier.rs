//! 移動型態分類

use mtx_core::MovementPattern;

use crate::aggregation::SeriesStats;

/// 活躍比例門檻
pub const ACTIVITY_RATIO: f64 = 0.50;

/// 依序判定，第一個符合者為準：
/// ENTRANTES → INATIVOS → RECENTES → ORDINÁRIOS → INTERMITENTES
pub fn classify_pattern(stats: &SeriesStats) -> MovementPattern {
    let counts = &stats.counts;

    if stats.latest_nonzero && counts.cont_all == 1 {
        return MovementPattern::Entrantes;
    }
    if counts.cont16 == 0 {
        return MovementPattern::Inativos;
    }
    if activity_ratio(counts.cont26, 26, stats.weeks_available).map_or(false, |r| r >= ACTIVITY_RATIO) {
        return MovementPattern::Recentes;
    }
    if activity_ratio(counts.cont52, 52, stats.weeks_available).map_or(false, |r| r >= ACTIVITY_RATIO) {
        return MovementPattern::Ordinarios;
    }
    MovementPattern::Intermitentes
}

/// count / min(window, 可用週數)；分母為 0 時回傳 `None`
pub fn activity_ratio(count: u32, window: usize, weeks_available: usize) -> Option<f64> {
    let denominator = window.min(weeks_available);
    if denominator == 0 {
        return None;
    }
    Some(f64::from(count) / denominator as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtx_core::{CountSet, MedianSet};
    use rust_decimal::Decimal;

    fn stats(counts: CountSet, weeks_available: usize, latest_nonzero: bool) -> SeriesStats {
        SeriesStats {
            total: Decimal::ZERO,
            maxima: Decimal::ZERO,
            medians: MedianSet::default(),
            counts,
            weeks_available,
            latest_nonzero,
        }
    }

    #[test]
    fn test_entrantes() {
        let counts = CountSet {
            cont04: 1,
            cont08: 1,
            cont12: 1,
            cont16: 0,
            cont26: 1,
            cont52: 1,
            cont_year: 1,
            cont_all: 1,
        };
        // ENTRANTES 優先於 INATIVOS
        assert_eq!(classify_pattern(&stats(counts, 1, true)), MovementPattern::Entrantes);
    }

    #[test]
    fn test_inativos() {
        let counts = CountSet {
            cont_all: 3,
            cont52: 3,
            cont26: 2,
            ..Default::default()
        };
        assert_eq!(classify_pattern(&stats(counts, 30, false)), MovementPattern::Inativos);

        // 只出現過一次但最近一週為 0
        let once = CountSet {
            cont_all: 1,
            ..Default::default()
        };
        assert_eq!(classify_pattern(&stats(once, 5, false)), MovementPattern::Inativos);
    }

    #[test]
    fn test_recentes_with_short_history() {
        // 8 個出現週次，其中 5 週非零：5 / min(26, 8) = 0.625
        let counts = CountSet {
            cont04: 3,
            cont08: 5,
            cont12: 5,
            cont16: 5,
            cont26: 5,
            cont52: 5,
            cont_year: 5,
            cont_all: 5,
        };
        assert_eq!(activity_ratio(5, 26, 8), Some(0.625));
        assert_eq!(classify_pattern(&stats(counts, 8, true)), MovementPattern::Recentes);
    }

    #[test]
    fn test_ordinarios_and_intermitentes() {
        let ordinary = CountSet {
            cont16: 4,
            cont26: 10,
            cont52: 30,
            cont_all: 30,
            ..Default::default()
        };
        assert_eq!(classify_pattern(&stats(ordinary, 52, true)), MovementPattern::Ordinarios);

        let sparse = CountSet {
            cont16: 2,
            cont26: 5,
            cont52: 9,
            cont_all: 9,
            ..Default::default()
        };
        assert_eq!(classify_pattern(&stats(sparse, 52, true)), MovementPattern::Intermitentes);
    }

    #[test]
    fn test_zero_denominator_skips_ratio() {
        assert_eq!(activity_ratio(0, 26, 0), None);

        let counts = CountSet {
            cont16: 1,
            cont_all: 2,
            ..Default::default()
        };
        assert_eq!(classify_pattern(&stats(counts, 0, false)), MovementPattern::Intermitentes);
    }
}
