//! 庫存移動記錄模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::week::WeekKey;
use crate::{MtxError, Result};

/// 品項分類（依序判定，第一個命中者為準）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "1 REMUME")]
    Remume,
    #[serde(rename = "2 ASSISTENCIAL")]
    Assistencial,
    #[serde(rename = "3 PROCESSO JUDICIAL")]
    Judicial,
    #[serde(rename = "4 FARMACOLÓGICO")]
    Farmacologico,
    #[serde(rename = "5 MATERIAL")]
    Material,
    #[serde(rename = "6 FRALDAS e/ou LEITES")]
    FraldasLeites,
    #[serde(rename = "Não Classificado")]
    Unclassified,
}

impl Classification {
    /// 報表使用的標籤
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Remume => "1 REMUME",
            Classification::Assistencial => "2 ASSISTENCIAL",
            Classification::Judicial => "3 PROCESSO JUDICIAL",
            Classification::Farmacologico => "4 FARMACOLÓGICO",
            Classification::Material => "5 MATERIAL",
            Classification::FraldasLeites => "6 FRALDAS e/ou LEITES",
            Classification::Unclassified => "Não Classificado",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 交易群組
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionGroup {
    /// 期初結存
    #[serde(rename = "A")]
    Opening,
    /// 入庫
    #[serde(rename = "E")]
    Inflow,
    /// 出庫
    #[serde(rename = "S")]
    Outflow,
}

impl TransactionGroup {
    pub fn code(&self) -> char {
        match self {
            TransactionGroup::Opening => 'A',
            TransactionGroup::Inflow => 'E',
            TransactionGroup::Outflow => 'S',
        }
    }

    /// 未命中任何關鍵字時的預設子類型
    pub fn default_subtype(&self) -> TransactionSubtype {
        match self {
            TransactionGroup::Opening => TransactionSubtype::AA,
            TransactionGroup::Inflow => TransactionSubtype::EA,
            TransactionGroup::Outflow => TransactionSubtype::SA,
        }
    }
}

/// 交易子類型（兩碼）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionSubtype {
    /// 期初結存
    AA,
    /// 一般入庫
    EA,
    /// 捐贈入庫
    ED,
    /// 跨市政府調撥入庫
    EP,
    /// 藥局間調撥入庫
    ET,
    /// 由 UBS / 急診單位入庫
    EU,
    /// 盤點調整 / 破損入庫
    EX,
    /// 病患調劑（一般出庫）
    SA,
    /// 捐贈出庫
    SD,
    /// 藥局間調撥出庫
    ST,
    /// 撥付 UBS / 急診單位
    SU,
    /// 過期報廢
    SV,
    /// 盤點調整 / 破損出庫
    SX,
}

impl TransactionSubtype {
    /// 子類型所屬群組
    pub fn group(&self) -> TransactionGroup {
        use TransactionSubtype::*;
        match self {
            AA => TransactionGroup::Opening,
            EA | ED | EP | ET | EU | EX => TransactionGroup::Inflow,
            SA | SD | ST | SU | SV | SX => TransactionGroup::Outflow,
        }
    }

    pub fn code(&self) -> &'static str {
        use TransactionSubtype::*;
        match self {
            AA => "AA",
            EA => "EA",
            ED => "ED",
            EP => "EP",
            ET => "ET",
            EU => "EU",
            EX => "EX",
            SA => "SA",
            SD => "SD",
            ST => "ST",
            SU => "SU",
            SV => "SV",
            SX => "SX",
        }
    }
}

impl fmt::Display for TransactionSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// 檢查品項代碼是否為 `ddd.ddd.ddd`
pub fn is_item_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes.iter().enumerate().all(|(i, b)| match i {
            3 | 7 => *b == b'.',
            _ => b.is_ascii_digit(),
        })
}

/// 品項識別資訊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub code: String,
    pub name: String,
    pub classification: Classification,
}

impl ItemRef {
    pub fn new(code: impl Into<String>, name: impl Into<String>, classification: Classification) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            classification,
        }
    }
}

/// 庫存移動記錄（建立後不可變）
/// 欄位私有，只能經由 [`MovementRecord::new`] 建立；反序列化同樣經過驗證。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMovementRecord")]
pub struct MovementRecord {
    /// 單位ID（單次執行內穩定）
    unit_id: u32,

    /// 單位名稱
    unit: String,

    /// 品項代碼
    item_code: String,

    /// 品項名稱
    item_name: String,

    /// 分類
    classification: Classification,

    /// 移動日期
    date: NaiveDate,

    /// 週次鍵
    week: WeekKey,

    /// 交易群組
    group: TransactionGroup,

    /// 交易子類型
    subtype: TransactionSubtype,

    /// 帶正負號的數量（出庫為負、入庫為正、期初為 0）
    quantity_delta: Decimal,

    /// 異動後庫存
    stock_level: Option<Decimal>,

    /// 歷史說明
    history: String,

    /// 單據號碼
    document: Option<String>,

    /// 請領單號
    requisition: Option<String>,

    /// 備註
    observation: Option<String>,

    /// 是否為合成資料
    synthetic: bool,
}

impl MovementRecord {
    /// 創建新的移動記錄
    ///
    /// 群組由子類型決定；品項代碼格式與數量正負號不符時回傳驗證錯誤。
    pub fn new(
        unit_id: u32,
        unit: impl Into<String>,
        item: ItemRef,
        date: NaiveDate,
        subtype: TransactionSubtype,
        quantity_delta: Decimal,
    ) -> Result<Self> {
        if !is_item_code(&item.code) {
            return Err(MtxError::Validation(format!(
                "品項代碼格式錯誤: {:?}",
                item.code
            )));
        }

        let group = subtype.group();
        let sign_ok = match group {
            TransactionGroup::Opening => quantity_delta.is_zero(),
            TransactionGroup::Inflow => quantity_delta >= Decimal::ZERO,
            TransactionGroup::Outflow => quantity_delta <= Decimal::ZERO,
        };
        if !sign_ok {
            return Err(MtxError::Validation(format!(
                "品項 {} 的數量 {} 與群組 {} 不一致",
                item.code,
                quantity_delta,
                group.code()
            )));
        }

        Ok(Self {
            unit_id,
            unit: unit.into(),
            item_code: item.code,
            item_name: item.name,
            classification: item.classification,
            date,
            week: WeekKey::from_date(date),
            group,
            subtype,
            quantity_delta,
            stock_level: None,
            history: String::new(),
            document: None,
            requisition: None,
            observation: None,
            synthetic: false,
        })
    }

    /// 建構器模式：設置異動後庫存
    pub fn with_stock_level(mut self, stock_level: Option<Decimal>) -> Self {
        self.stock_level = stock_level;
        self
    }

    /// 建構器模式：設置歷史說明
    pub fn with_history(mut self, history: impl Into<String>) -> Self {
        self.history = history.into();
        self
    }

    /// 建構器模式：設置單據號碼
    pub fn with_document(mut self, document: Option<String>) -> Self {
        self.document = document;
        self
    }

    /// 建構器模式：設置請領單號
    pub fn with_requisition(mut self, requisition: Option<String>) -> Self {
        self.requisition = requisition;
        self
    }

    /// 建構器模式：設置備註
    pub fn with_observation(mut self, observation: Option<String>) -> Self {
        self.observation = observation;
        self
    }

    /// 建構器模式：標記為合成資料
    pub fn as_synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn unit_id(&self) -> u32 {
        self.unit_id
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn item_code(&self) -> &str {
        &self.item_code
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn week(&self) -> WeekKey {
        self.week
    }

    pub fn group(&self) -> TransactionGroup {
        self.group
    }

    pub fn subtype(&self) -> TransactionSubtype {
        self.subtype
    }

    /// 帶正負號的數量
    pub fn quantity_delta(&self) -> Decimal {
        self.quantity_delta
    }

    pub fn stock_level(&self) -> Option<Decimal> {
        self.stock_level
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn requisition(&self) -> Option<&str> {
        self.requisition.as_deref()
    }

    pub fn observation(&self) -> Option<&str> {
        self.observation.as_deref()
    }

    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// 同一品項的參照
    pub fn item_ref(&self) -> ItemRef {
        ItemRef::new(self.item_code.clone(), self.item_name.clone(), self.classification)
    }

    /// (品項代碼, 單位) 分組鍵
    pub fn group_key(&self) -> (String, String) {
        (self.item_code.clone(), self.unit.clone())
    }

    /// 數量絕對值
    pub fn abs_quantity(&self) -> Decimal {
        self.quantity_delta.abs()
    }
}

/// 反序列化中介：群組與週次由日期、子類型重新推導
#[derive(Deserialize)]
struct RawMovementRecord {
    unit_id: u32,
    unit: String,
    item_code: String,
    item_name: String,
    classification: Classification,
    date: NaiveDate,
    subtype: TransactionSubtype,
    quantity_delta: Decimal,
    #[serde(default)]
    stock_level: Option<Decimal>,
    #[serde(default)]
    history: String,
    #[serde(default)]
    document: Option<String>,
    #[serde(default)]
    requisition: Option<String>,
    #[serde(default)]
    observation: Option<String>,
    #[serde(default)]
    synthetic: bool,
}

impl TryFrom<RawMovementRecord> for MovementRecord {
    type Error = MtxError;

    fn try_from(raw: RawMovementRecord) -> Result<Self> {
        let item = ItemRef::new(raw.item_code, raw.item_name, raw.classification);
        let record = MovementRecord::new(
            raw.unit_id,
            raw.unit,
            item,
            raw.date,
            raw.subtype,
            raw.quantity_delta,
        )?
        .with_stock_level(raw.stock_level)
        .with_history(raw.history)
        .with_document(raw.document)
        .with_requisition(raw.requisition)
        .with_observation(raw.observation);

        Ok(if raw.synthetic {
            record.as_synthetic()
        } else {
            record
        })
    }
}
