//! 原始明細正規化為 `MovementRecord`
//!
//! 負責單位編號、品項分類、交易群組/子類型判定與數量正負號。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use mtx_core::{
    Classification, ItemRef, MovementRecord, TransactionGroup, TransactionSubtype,
};

use crate::report::{ParsedReport, RawMovement};

const REMUME_KEYWORDS: &[&str] = &[
    "PARACETAMOL",
    "DIPIRONA",
    "AAS",
    "IBUPROFENO",
    "AMOXICILINA",
    "CAPTOPRIL",
    "ENALAPRIL",
    "METFORMINA",
    "GLIBENCLAMIDA",
    "HIDROCLOROTIAZIDA",
    "SINVASTATINA",
    "OMEPRAZOL",
];
const ASSISTENCIAL_KEYWORDS: &[&str] = &[
    "INSULINA",
    "ANTIPSICÓTICO",
    "ANTIEPILÉPTICO",
    "ANTIDEPRESSIVO",
];
const JUDICIAL_KEYWORDS: &[&str] = &["JUDICIAL", "MANDADO"];
const FARMACOLOGICO_KEYWORDS: &[&str] = &["INJETÁVEL", "AMPOLA", "SORO", "VACINA"];
const MATERIAL_KEYWORDS: &[&str] = &[
    "LUVA", "AGULHA", "SERINGA", "GAZE", "ALGODÃO", "ATADURA", "CATETER", "SONDA", "EQUIPO",
    "LANCETA",
];
const FRALDA_LEITE_KEYWORDS: &[&str] = &["FRALDA", "LEITE"];

/// 分類規則（依序判定）
const CLASSIFICATION_RULES: &[(Classification, &[&str])] = &[
    (Classification::Remume, REMUME_KEYWORDS),
    (Classification::Assistencial, ASSISTENCIAL_KEYWORDS),
    (Classification::Judicial, JUDICIAL_KEYWORDS),
    (Classification::Farmacologico, FARMACOLOGICO_KEYWORDS),
    (Classification::Material, MATERIAL_KEYWORDS),
    (Classification::FraldasLeites, FRALDA_LEITE_KEYWORDS),
];

/// 依品項名稱分類，第一個命中的類別為準
pub fn classify_item(name: &str) -> Classification {
    let desc = name.to_uppercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| desc.contains(k)))
        .map(|(classification, _)| *classification)
        .unwrap_or(Classification::Unclassified)
}

/// 判定交易群組
pub fn determine_group(movement: &RawMovement) -> TransactionGroup {
    if movement.is_opening_balance() {
        return TransactionGroup::Opening;
    }
    if movement.inflow.map_or(false, |q| q > Decimal::ZERO) {
        return TransactionGroup::Inflow;
    }
    TransactionGroup::Outflow
}

/// 依歷史說明關鍵字判定子類型
pub fn determine_subtype(group: TransactionGroup, history: &str) -> TransactionSubtype {
    let hist = history.to_uppercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| hist.contains(k));

    match group {
        TransactionGroup::Opening => TransactionSubtype::AA,
        TransactionGroup::Inflow => {
            if has(&["DOAÇÃO"]) {
                TransactionSubtype::ED
            } else if has(&["PREFEITURA MUNICIPAL", "TRANSFERENCIA ENTRE MUNICIPIOS"]) {
                TransactionSubtype::EP
            } else if has(&["FARMACIA"]) {
                TransactionSubtype::ET
            } else if has(&["UBS", "PRONTO ATENDIMENTO"]) {
                TransactionSubtype::EU
            } else if has(&["ACERTO", "QUEBRA"]) {
                TransactionSubtype::EX
            } else {
                group.default_subtype()
            }
        }
        TransactionGroup::Outflow => {
            if has(&["VENCIDO", "PERDA POR VALIDADE"]) {
                TransactionSubtype::SV
            } else if has(&["DOAÇÃO"]) {
                TransactionSubtype::SD
            } else if has(&["FARMACIA"]) {
                TransactionSubtype::ST
            } else if has(&["UBS", "PRONTO ATENDIMENTO"]) {
                TransactionSubtype::SU
            } else if has(&["ACERTO", "QUEBRA"]) {
                TransactionSubtype::SX
            } else {
                group.default_subtype()
            }
        }
    }
}

/// 帶正負號的數量；缺少數量時為 0
pub fn signed_delta(movement: &RawMovement, group: TransactionGroup) -> Decimal {
    match group {
        TransactionGroup::Opening => Decimal::ZERO,
        TransactionGroup::Inflow => movement.inflow.map(|q| q.abs()).unwrap_or(Decimal::ZERO),
        TransactionGroup::Outflow => movement.outflow.map(|q| -q.abs()).unwrap_or(Decimal::ZERO),
    }
}

/// 單位名稱 → 單位ID（依首次出現順序由 1 起編）
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    ids: HashMap<String, u32>,
    next_id: u32,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next_id: 1,
        }
    }

    /// 取得單位ID，第一次出現時配發新編號
    pub fn id_for(&mut self, unit: &str) -> u32 {
        if let Some(id) = self.ids.get(unit) {
            return *id;
        }
        let id = self.next_id;
        self.ids.insert(unit.to_string(), id);
        self.next_id += 1;
        id
    }

    pub fn get(&self, unit: &str) -> Option<u32> {
        self.ids.get(unit).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 依ID排序的 (ID, 單位) 清單
    pub fn entries(&self) -> Vec<(u32, String)> {
        let mut entries: Vec<(u32, String)> =
            self.ids.iter().map(|(unit, id)| (*id, unit.clone())).collect();
        entries.sort();
        entries
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 正規化結果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedBatch {
    pub records: Vec<MovementRecord>,
    /// 未通過驗證而捨棄的筆數
    pub rejected: usize,
}

impl NormalizedBatch {
    /// 合併另一批結果
    pub fn extend(&mut self, other: NormalizedBatch) {
        self.records.extend(other.records);
        self.rejected += other.rejected;
    }
}

/// 明細正規化器（持有單次執行的單位ID表）
#[derive(Debug, Default)]
pub struct Normalizer {
    registry: UnitRegistry,
}

impl Normalizer {
    pub fn new() -> Self {
        Self {
            registry: UnitRegistry::new(),
        }
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// 將單一報表的明細轉為移動記錄
    pub fn normalize(&mut self, report: &ParsedReport, unit: &str) -> NormalizedBatch {
        let unit_id = self.registry.id_for(unit);
        let mut batch = NormalizedBatch::default();

        for page in &report.pages {
            let classification = classify_item(&page.product.name);

            for movement in &page.movements {
                let group = determine_group(movement);
                let subtype = determine_subtype(group, &movement.history);
                let delta = signed_delta(movement, group);
                let item = ItemRef::new(
                    page.product.code.clone(),
                    page.product.name.clone(),
                    classification,
                );

                match MovementRecord::new(unit_id, unit, item, movement.date, subtype, delta) {
                    Ok(record) => batch.records.push(
                        record
                            .with_stock_level(movement.stock)
                            .with_history(movement.history.clone())
                            .with_document(movement.document.clone())
                            .with_requisition(movement.requisition.clone())
                            .with_observation(movement.observation.clone()),
                    ),
                    Err(e) => {
                        tracing::warn!("捨棄明細（第 {} 頁）: {}", page.number, e);
                        batch.rejected += 1;
                    }
                }
            }
        }

        tracing::debug!(
            "單位 {} (ID {}) 正規化完成: {} 筆, 捨棄 {} 筆",
            unit,
            unit_id,
            batch.records.len(),
            batch.rejected
        );

        batch
    }
}
