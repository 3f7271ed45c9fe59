//! 週次彙總與統計
//!
//! - 只計入需求子類型（預設 SA、SU）
//! - 週次序列值為該週 |數量| 總和，沒有記錄的週次不存在
//! - 中位數取時間序最後 N 個非零值
//! - 計數取時間序最後 N 個出現週次中數值大於 0 者

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use mtx_core::{AnalysisConfig, CountSet, MedianSet, MovementRecord, WeekKey, WeeklySeries};

/// 中位數/計數的回溯週數
pub const WINDOWS: [usize; 6] = [4, 8, 12, 16, 26, 52];

/// (品項代碼, 單位) 分組鍵
pub type GroupKey = (String, String);

/// 中位數；空集合為 0
pub fn median(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }

    let mut sorted = values.to_vec();
    sorted.sort();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / Decimal::TWO
    } else {
        sorted[mid]
    }
}

/// 篩出需求記錄並依 (品項, 單位) 分組（鍵排序）
pub fn group_demand<'a>(
    records: &'a [MovementRecord],
    config: &AnalysisConfig,
) -> BTreeMap<GroupKey, Vec<&'a MovementRecord>> {
    let mut groups: BTreeMap<GroupKey, Vec<&MovementRecord>> = BTreeMap::new();

    for record in records.iter().filter(|r| config.is_demand_subtype(r.subtype())) {
        groups.entry(record.group_key()).or_default().push(record);
    }

    groups
}

/// 建立週次序列
pub fn build_series<'a>(records: impl IntoIterator<Item = &'a MovementRecord>) -> WeeklySeries {
    let mut series = WeeklySeries::new();
    for record in records {
        *series.entry(record.week()).or_insert(Decimal::ZERO) += record.abs_quantity();
    }
    series
}

/// 合併多個週次序列（同週相加）
pub fn merge_series<'a>(series: impl IntoIterator<Item = &'a WeeklySeries>) -> WeeklySeries {
    let mut merged = WeeklySeries::new();
    for s in series {
        for (week, value) in s {
            *merged.entry(*week).or_insert(Decimal::ZERO) += *value;
        }
    }
    merged
}

/// 週次序列統計
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    pub total: Decimal,
    pub maxima: Decimal,
    pub medians: MedianSet,
    pub counts: CountSet,
    /// 出現的週次數
    pub weeks_available: usize,
    /// 最後一個出現週次的值是否大於 0
    pub latest_nonzero: bool,
}

impl SeriesStats {
    /// 計算統計值；`reference_year` 用於「本年度」欄位
    pub fn compute(series: &WeeklySeries, reference_year: i32) -> Self {
        let values: Vec<Decimal> = series.values().copied().collect();
        let nonzero: Vec<Decimal> = values.iter().copied().filter(|v| *v > Decimal::ZERO).collect();

        let trailing_median = |n: usize| median(&nonzero[nonzero.len().saturating_sub(n)..]);
        let trailing_count = |n: usize| count_positive(&values[values.len().saturating_sub(n)..]);

        let year_values: Vec<Decimal> = series
            .iter()
            .filter(|(week, _)| week.year() == reference_year)
            .map(|(_, v)| *v)
            .collect();
        let year_nonzero: Vec<Decimal> = year_values
            .iter()
            .copied()
            .filter(|v| *v > Decimal::ZERO)
            .collect();

        let [w04, w08, w12, w16, w26, w52] = WINDOWS;

        Self {
            total: values.iter().copied().sum(),
            maxima: values.iter().copied().max().unwrap_or(Decimal::ZERO),
            medians: MedianSet {
                md04: trailing_median(w04),
                md08: trailing_median(w08),
                md12: trailing_median(w12),
                md16: trailing_median(w16),
                md26: trailing_median(w26),
                md52: trailing_median(w52),
                md_year: median(&year_nonzero),
                md_all: median(&nonzero),
            },
            counts: CountSet {
                cont04: trailing_count(w04),
                cont08: trailing_count(w08),
                cont12: trailing_count(w12),
                cont16: trailing_count(w16),
                cont26: trailing_count(w26),
                cont52: trailing_count(w52),
                cont_year: count_positive(&year_values),
                cont_all: count_positive(&values),
            },
            weeks_available: values.len(),
            latest_nonzero: values.last().map_or(false, |v| *v > Decimal::ZERO),
        }
    }
}

/// 序列跨越的週數（含首尾），用於判斷歷史是否過短
pub fn history_span_weeks(series: &WeeklySeries) -> usize {
    match (series.keys().next(), series.keys().next_back()) {
        (Some(first), Some(last)) => week_distance(*first, *last) + 1,
        _ => 0,
    }
}

/// 以 ISO 週的星期一計算週距，53 週年份也正確
fn week_distance(from: WeekKey, to: WeekKey) -> usize {
    let weeks = match (from.monday(), to.monday()) {
        (Some(start), Some(end)) => (end - start).num_weeks(),
        // 不存在的第 53 週只可能來自手動建立的鍵
        _ => i64::from(to.year() - from.year()) * 52 + i64::from(to.week()) - i64::from(from.week()),
    };
    usize::try_from(weeks).unwrap_or(0)
}

fn count_positive(values: &[Decimal]) -> u32 {
    values.iter().filter(|v| **v > Decimal::ZERO).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mtx_core::{Classification, ItemRef, TransactionSubtype};
    use rstest::rstest;

    fn d(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn week(year: i32, w: u32) -> WeekKey {
        WeekKey::new(year, w).unwrap()
    }

    fn record(date: NaiveDate, subtype: TransactionSubtype, qty: i64, unit: &str) -> MovementRecord {
        MovementRecord::new(
            1,
            unit,
            ItemRef::new("325.023.001", "DIPIRONA", Classification::Remume),
            date,
            subtype,
            Decimal::from(qty),
        )
        .unwrap()
    }

    #[rstest]
    #[case(vec![2, 4, 6, 8], d(5))]
    #[case(vec![1, 3, 5], d(3))]
    #[case(vec![], d(0))]
    #[case(vec![7], d(7))]
    #[case(vec![9, 1, 4, 3], Decimal::new(35, 1))]
    fn test_median(#[case] values: Vec<i64>, #[case] expected: Decimal) {
        let values: Vec<Decimal> = values.into_iter().map(Decimal::from).collect();
        assert_eq!(median(&values), expected);
    }

    #[test]
    fn test_group_demand_filters_subtypes() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let records = vec![
            record(date, TransactionSubtype::SA, -5, "CAF"),
            record(date, TransactionSubtype::SU, -3, "CAF"),
            record(date, TransactionSubtype::ST, -50, "CAF"),
            record(date, TransactionSubtype::SA, -1, "Farmácia Olavo"),
            record(date, TransactionSubtype::AA, 0, "CAF"),
        ];

        let groups = group_demand(&records, &AnalysisConfig::default());

        assert_eq!(groups.len(), 2);
        let caf = &groups[&("325.023.001".to_string(), "CAF".to_string())];
        assert_eq!(caf.len(), 2);

        let series = build_series(caf.iter().copied());
        assert_eq!(series.len(), 1);
        assert_eq!(series.values().next(), Some(&d(8)));
    }

    #[test]
    fn test_series_sums_absolute_quantity_per_week() {
        let records = vec![
            record(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(), TransactionSubtype::SA, -5, "CAF"),
            record(NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(), TransactionSubtype::SA, -7, "CAF"),
            record(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), TransactionSubtype::SU, -2, "CAF"),
        ];

        let series = build_series(&records);
        let stats = SeriesStats::compute(&series, 2025);

        assert_eq!(series.get(&week(2025, 10)), Some(&d(12)));
        assert_eq!(series.get(&week(2025, 11)), Some(&d(2)));
        assert_eq!(stats.total, series.values().copied().sum::<Decimal>());
        assert_eq!(stats.total, d(14));
        assert_eq!(stats.maxima, d(12));
    }

    #[test]
    fn test_trailing_windows() {
        let mut series = WeeklySeries::new();
        for w in 1..=10u32 {
            series.insert(week(2024, w), d(i64::from(w)));
        }
        series.insert(week(2025, 1), d(0));
        series.insert(week(2025, 2), d(100));

        let stats = SeriesStats::compute(&series, 2025);

        // 非零值：1..=10, 100
        assert_eq!(stats.medians.md04, Decimal::new(95, 1));
        assert_eq!(stats.medians.md08, Decimal::new(75, 1));
        assert_eq!(stats.medians.md_all, d(6));
        assert_eq!(stats.medians.md_year, d(100));
        assert_eq!(stats.medians.max(), d(100));

        // 出現週次：12 週，其中 1 週為 0
        assert_eq!(stats.counts.cont04, 3);
        assert_eq!(stats.counts.cont16, 11);
        assert_eq!(stats.counts.cont_year, 1);
        assert_eq!(stats.counts.cont_all, 11);
        assert_eq!(stats.weeks_available, 12);
        assert!(stats.latest_nonzero);
    }

    #[rstest]
    #[case(week(2025, 10), week(2025, 13), 4)]
    #[case(week(2026, 50), week(2027, 1), 5)]
    #[case(week(2024, 51), week(2025, 2), 4)]
    #[case(week(2020, 52), week(2021, 1), 3)]
    fn test_history_span_crosses_years(
        #[case] first: WeekKey,
        #[case] last: WeekKey,
        #[case] expected: usize,
    ) {
        let mut series = WeeklySeries::new();
        series.insert(first, d(1));
        series.insert(last, d(1));

        assert_eq!(history_span_weeks(&series), expected);
    }

    #[test]
    fn test_empty_series_stats() {
        let stats = SeriesStats::compute(&WeeklySeries::new(), 2025);

        assert_eq!(stats.total, Decimal::ZERO);
        assert_eq!(stats.maxima, Decimal::ZERO);
        assert_eq!(stats.medians, MedianSet::default());
        assert_eq!(stats.counts, CountSet::default());
        assert!(!stats.latest_nonzero);
    }

    #[test]
    fn test_merge_series_and_span() {
        let mut a = WeeklySeries::new();
        a.insert(week(2024, 51), d(3));
        a.insert(week(2025, 2), d(1));
        let mut b = WeeklySeries::new();
        b.insert(week(2025, 2), d(4));

        let merged = merge_series([&a, &b]);

        assert_eq!(merged.get(&week(2025, 2)), Some(&d(5)));
        assert_eq!(history_span_weeks(&merged), 4);
        assert_eq!(history_span_weeks(&WeeklySeries::new()), 0);
    }
}
