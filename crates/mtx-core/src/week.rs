//! 週次鍵（`YYYY_WW`）

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::MtxError;

/// 週次鍵
///
/// 以 ISO 週次計算，年份取 ISO 週所屬年份，確保排序即時間順序。
/// 字串格式 `{4 位年份}_{2 位週次}` 為下游報表與歷史檔案共用的鍵，不可變更。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    year: i32,
    week: u32,
}

impl WeekKey {
    /// 創建週次鍵（週次必須介於 1..=53）
    pub fn new(year: i32, week: u32) -> Option<Self> {
        if (1..=53).contains(&week) && (0..=9999).contains(&year) {
            Some(Self { year, week })
        } else {
            None
        }
    }

    /// 由日期推算週次鍵
    pub fn from_date(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// 該 ISO 週的星期一；該年沒有第 53 週時為 `None`
    pub fn monday(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}_{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = MtxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, week) = s
            .split_once('_')
            .ok_or_else(|| MtxError::InvalidDate(format!("週次鍵格式錯誤: {}", s)))?;

        if year.len() != 4 || week.len() != 2 {
            return Err(MtxError::InvalidDate(format!("週次鍵格式錯誤: {}", s)));
        }

        let year: i32 = year
            .parse()
            .map_err(|_| MtxError::InvalidDate(format!("週次鍵年份錯誤: {}", s)))?;
        let week: u32 = week
            .parse()
            .map_err(|_| MtxError::InvalidDate(format!("週次鍵週次錯誤: {}", s)))?;

        WeekKey::new(year, week)
            .ok_or_else(|| MtxError::InvalidDate(format!("週次超出範圍: {}", s)))
    }
}

impl Serialize for WeekKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
