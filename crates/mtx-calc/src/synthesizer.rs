//! 合成歷史資料
//!
//! 真實歷史不足時，於最早真實日期之前的 52 週內，
//! 為每個 (品項, 單位) 產生出庫（SA/SU）記錄，供中位數與型態分析使用。
//! 亂數來源由呼叫端注入，固定種子可重現相同結果。

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use mtx_core::{MovementRecord, TransactionSubtype};

/// 合成參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisParams {
    /// 回填週數
    pub weeks: u32,
    /// 每週每品項出現機率
    pub occurrence_probability: f64,
    /// 旺季機率（先判定）
    pub peak_probability: f64,
    /// 淡季機率
    pub trough_probability: f64,
    pub volume_min: u32,
    pub volume_max: u32,
    /// 淡季數量上限
    pub trough_volume_max: u32,
    /// 子類型為 SA 的機率（其餘為 SU）
    pub dispensation_probability: f64,
}

impl SynthesisParams {
    /// 機率欄位限制在 0..=1（NaN 視為 0）
    pub fn clamped(mut self) -> Self {
        for p in [
            &mut self.occurrence_probability,
            &mut self.peak_probability,
            &mut self.trough_probability,
            &mut self.dispensation_probability,
        ] {
            let clamped = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
            if clamped != *p {
                tracing::warn!("合成機率 {} 超出範圍，改用 {}", p, clamped);
                *p = clamped;
            }
        }
        self
    }
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            weeks: 52,
            occurrence_probability: 0.70,
            peak_probability: 0.20,
            trough_probability: 0.10,
            volume_min: 1,
            volume_max: 200,
            trough_volume_max: 5,
            dispensation_probability: 0.7,
        }
    }
}

/// 合成結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticHistory {
    /// 視窗起日（含）
    pub window_start: Option<NaiveDate>,
    /// 視窗迄日（不含，即最早真實日期）
    pub window_end: Option<NaiveDate>,
    pub params: SynthesisParams,
    pub records: Vec<MovementRecord>,
}

impl SyntheticHistory {
    fn empty(params: SynthesisParams) -> Self {
        Self {
            window_start: None,
            window_end: None,
            params,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 檢查合成資料的一致性
    pub fn validate(&self) -> SyntheticValidation {
        let window_valid = match (self.window_start, self.window_end) {
            (Some(start), Some(end)) => start < end,
            (None, None) => self.records.is_empty(),
            _ => false,
        };

        let in_window = |date: NaiveDate| match (self.window_start, self.window_end) {
            (Some(start), Some(end)) => date >= start && date < end,
            _ => false,
        };

        SyntheticValidation {
            total_records: self.records.len(),
            window_valid,
            subtypes_valid: self
                .records
                .iter()
                .all(|r| matches!(r.subtype(), TransactionSubtype::SA | TransactionSubtype::SU)),
            dates_valid: self.records.iter().all(|r| in_window(r.date())),
            volumes_valid: self
                .records
                .iter()
                .all(|r| r.quantity_delta() <= -Decimal::ONE),
        }
    }
}

/// 合成資料檢查結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticValidation {
    pub total_records: usize,
    pub window_valid: bool,
    pub subtypes_valid: bool,
    pub dates_valid: bool,
    pub volumes_valid: bool,
}

impl SyntheticValidation {
    pub fn is_valid(&self) -> bool {
        self.window_valid && self.subtypes_valid && self.dates_valid && self.volumes_valid
    }
}

/// 歷史資料合成器
pub struct HistorySynthesizer<R: Rng> {
    rng: R,
    params: SynthesisParams,
}

impl HistorySynthesizer<StdRng> {
    /// 以固定種子建立
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// 以系統亂數建立
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> HistorySynthesizer<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            params: SynthesisParams::default(),
        }
    }

    /// 建構器模式：設置合成參數（機率限制在 0..=1）
    pub fn with_params(mut self, params: SynthesisParams) -> Self {
        self.params = params.clamped();
        self
    }

    /// 建構器模式：設置回填週數
    pub fn with_weeks(mut self, weeks: u32) -> Self {
        self.params.weeks = weeks;
        self
    }

    pub fn params(&self) -> &SynthesisParams {
        &self.params
    }

    /// 依真實記錄產生合成歷史
    ///
    /// 沒有真實記錄時回傳空結果。
    pub fn synthesize(&mut self, real: &[MovementRecord]) -> SyntheticHistory {
        let earliest = match real.iter().map(|r| r.date()).min() {
            Some(date) => date,
            None => {
                tracing::warn!("沒有真實移動記錄，略過合成歷史");
                return SyntheticHistory::empty(self.params.clone());
            }
        };

        let window_start = match earliest.checked_sub_days(Days::new(7 * u64::from(self.params.weeks))) {
            Some(date) => date,
            None => {
                tracing::warn!("無法計算合成視窗起日: {}", earliest);
                return SyntheticHistory::empty(self.params.clone());
            }
        };

        let templates = unique_pairs(real);
        tracing::info!(
            "開始合成歷史：{} 至 {}，品項 {} 個",
            window_start,
            earliest,
            templates.len()
        );

        let mut records = Vec::new();
        for week in 0..self.params.weeks {
            let week_start = match window_start.checked_add_days(Days::new(7 * u64::from(week))) {
                Some(date) => date,
                None => break,
            };

            for template in &templates {
                if self.rng.gen_bool(self.params.occurrence_probability) {
                    self.generate_week(template, week_start, &mut records);
                }
            }
        }

        let records = fill_stock_levels(records);

        tracing::info!("合成歷史完成：{} 筆", records.len());

        SyntheticHistory {
            window_start: Some(window_start),
            window_end: Some(earliest),
            params: self.params.clone(),
            records,
        }
    }

    fn generate_week(
        &mut self,
        template: &MovementRecord,
        week_start: NaiveDate,
        out: &mut Vec<MovementRecord>,
    ) {
        let peak = self.rng.gen_bool(self.params.peak_probability);
        let trough = self.rng.gen_bool(self.params.trough_probability);
        let count = self.rng.gen_range(1..=3);

        for _ in 0..count {
            let offset = self.rng.gen_range(0..7u64);
            let date = match week_start.checked_add_days(Days::new(offset)) {
                Some(date) => date,
                None => continue,
            };
            let volume = self.generate_volume(peak, trough);
            let subtype = if self.rng.gen_bool(self.params.dispensation_probability) {
                TransactionSubtype::SA
            } else {
                TransactionSubtype::SU
            };
            let serial: u32 = self.rng.gen_range(1..=9999);
            let history = match subtype {
                TransactionSubtype::SA => format!("DISPENSACAO TESTE PACIENTE {}", serial),
                _ => format!("TRANSFERENCIA TESTE UNIDADE {}", serial),
            };

            match MovementRecord::new(
                template.unit_id(),
                template.unit(),
                template.item_ref(),
                date,
                subtype,
                -Decimal::from(volume),
            ) {
                Ok(record) => out.push(
                    record
                        .with_history(history)
                        .with_observation(Some("Dados sintéticos gerados".to_string()))
                        .as_synthetic(),
                ),
                Err(e) => tracing::warn!("合成記錄建立失敗: {}", e),
            }
        }
    }

    fn generate_volume(&mut self, peak: bool, trough: bool) -> u32 {
        let (min, max) = if peak {
            let multiplier = 2.0 + self.rng.gen::<f64>();
            (
                (f64::from(self.params.volume_min) * multiplier).floor() as u32,
                (f64::from(self.params.volume_max) * multiplier).floor() as u32,
            )
        } else if trough {
            (self.params.volume_min, self.params.trough_volume_max)
        } else {
            (self.params.volume_min, self.params.volume_max)
        };

        self.rng.gen_range(min.max(1)..=max.max(min.max(1)))
    }
}

/// 依首次出現順序取得不重複的 (品項, 單位)
fn unique_pairs(records: &[MovementRecord]) -> Vec<MovementRecord> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .filter(|r| seen.insert(r.group_key()))
        .cloned()
        .collect()
}

/// 回推合成庫存：起始量為平均出庫量 10 倍，記錄值不低於 0
fn fill_stock_levels(records: Vec<MovementRecord>) -> Vec<MovementRecord> {
    let mut by_pair: HashMap<(String, String), Vec<usize>> = HashMap::new();
    for (idx, record) in records.iter().enumerate() {
        by_pair.entry(record.group_key()).or_default().push(idx);
    }

    let mut levels: Vec<Option<Decimal>> = vec![None; records.len()];
    for indices in by_pair.values_mut() {
        indices.sort_by_key(|&i| records[i].date());

        let total: Decimal = indices.iter().map(|&i| records[i].abs_quantity()).sum();
        let mean = total / Decimal::from(indices.len());
        let mut stock = (mean * Decimal::TEN).floor();

        for &i in indices.iter() {
            stock += records[i].quantity_delta();
            levels[i] = Some(stock.max(Decimal::ZERO));
        }
    }

    records
        .into_iter()
        .zip(levels)
        .map(|(record, level)| record.with_stock_level(level))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtx_core::{Classification, ItemRef};

    fn real_record(code: &str, unit: &str, unit_id: u32, date: NaiveDate) -> MovementRecord {
        MovementRecord::new(
            unit_id,
            unit,
            ItemRef::new(code, "DIPIRONA 500MG", Classification::Remume),
            date,
            TransactionSubtype::SA,
            Decimal::from(-10),
        )
        .unwrap()
    }

    fn sample() -> Vec<MovementRecord> {
        let d1 = NaiveDate::from_ymd_opt(2025, 5, 27).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        vec![
            real_record("325.023.001", "CAF", 1, d1),
            real_record("325.023.001", "CAF", 1, d2),
            real_record("412.015.002", "Farmácia Olavo", 2, d1),
        ]
    }

    #[test]
    fn test_empty_input_yields_empty_history() {
        let history = HistorySynthesizer::seeded(7).synthesize(&[]);

        assert!(history.is_empty());
        assert_eq!(history.window_start, None);
        assert!(history.validate().is_valid());
    }

    #[test]
    fn test_synthetic_records_are_consistent() {
        let real = sample();
        let history = HistorySynthesizer::seeded(42).synthesize(&real);

        let earliest = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        assert_eq!(history.window_end, Some(earliest));
        assert_eq!(history.window_start, earliest.checked_sub_days(Days::new(364)));
        assert!(!history.is_empty());

        let validation = history.validate();
        assert!(validation.is_valid(), "{:?}", validation);

        for record in &history.records {
            assert!(record.is_synthetic());
            assert!(record.quantity_delta() < Decimal::ZERO);
            assert_eq!(record.observation(), Some("Dados sintéticos gerados"));
            assert!(record.stock_level().map_or(false, |s| s >= Decimal::ZERO));
            match record.subtype() {
                TransactionSubtype::SA => assert!(record.history().starts_with("DISPENSACAO TESTE PACIENTE ")),
                TransactionSubtype::SU => assert!(record.history().starts_with("TRANSFERENCIA TESTE UNIDADE ")),
                other => panic!("unexpected subtype {}", other),
            }
            let expected_id = if record.unit() == "CAF" { 1 } else { 2 };
            assert_eq!(record.unit_id(), expected_id);
        }

        // 只為真實資料中出現的 (品項, 單位) 產生
        let pairs: std::collections::HashSet<_> = history.records.iter().map(|r| r.group_key()).collect();
        assert!(pairs.len() <= 2);
    }

    #[test]
    fn test_same_seed_same_history() {
        let real = sample();
        let a = HistorySynthesizer::seeded(99).synthesize(&real);
        let b = HistorySynthesizer::seeded(99).synthesize(&real);

        assert_eq!(a.records, b.records);
    }

    #[test]
    fn test_volume_ranges() {
        let mut synthesizer = HistorySynthesizer::seeded(1);
        for _ in 0..500 {
            let trough = synthesizer.generate_volume(false, true);
            assert!((1..=5).contains(&trough));

            let peak = synthesizer.generate_volume(true, false);
            assert!((2..=600).contains(&peak));

            let normal = synthesizer.generate_volume(false, false);
            assert!((1..=200).contains(&normal));
        }
    }

    #[test]
    fn test_custom_week_count() {
        let real = sample();
        let history = HistorySynthesizer::seeded(3).with_weeks(4).synthesize(&real);

        let earliest = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        assert_eq!(history.window_start, earliest.checked_sub_days(Days::new(28)));
        assert!(history.records.iter().all(|r| r.date() < earliest));
        assert_eq!(history.params.weeks, 4);
    }

    #[test]
    fn test_out_of_range_probabilities_are_clamped() {
        let params = SynthesisParams {
            occurrence_probability: 1.5,
            peak_probability: -0.2,
            trough_probability: f64::NAN,
            ..SynthesisParams::default()
        };
        let mut synthesizer = HistorySynthesizer::seeded(5).with_params(params);

        assert_eq!(synthesizer.params().occurrence_probability, 1.0);
        assert_eq!(synthesizer.params().peak_probability, 0.0);
        assert_eq!(synthesizer.params().trough_probability, 0.0);

        let history = synthesizer.synthesize(&sample());
        assert!(history.validate().is_valid());
        assert!(!history.is_empty());
    }
}
