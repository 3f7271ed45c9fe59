//! 移動報表（Movimentação de Estoque）文字解析
//!
//! 輸入為已抽出的純文字（每行一筆，`Página N` 標示分頁），
//! 每頁對應一個品項與其移動明細列。格式鬆散，所有判讀均為啟發式：
//! 無法判讀的行直接略過並計數，不視為錯誤。

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mtx_core::numeric::{parse_br_date, parse_quantity_token};
use mtx_core::{MtxError, Result};

/// 報表表頭
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportHeader {
    /// 市政府名稱
    pub municipality: Option<String>,
    /// 報表期間
    pub period: Option<String>,
}

/// 分頁上的品項資訊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub code: String,
    pub name: String,
    /// 計量單位（CP、AMP …），找不到時為空字串
    pub measure_unit: String,
}

/// 一筆原始移動明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMovement {
    pub date: NaiveDate,
    pub history: String,
    pub document: Option<String>,
    pub requisition: Option<String>,
    /// 報表版面中入庫與出庫欄無法區分，入庫一律留空
    pub inflow: Option<Decimal>,
    pub outflow: Option<Decimal>,
    pub stock: Option<Decimal>,
    pub observation: Option<String>,
}

impl RawMovement {
    /// 是否為期初結存列
    pub fn is_opening_balance(&self) -> bool {
        is_opening_balance(&self.history)
    }
}

/// 報表的一頁
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPage {
    pub number: u32,
    pub product: ProductInfo,
    pub movements: Vec<RawMovement>,
}

/// 整份報表解析結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedReport {
    pub header: ReportHeader,
    pub pages: Vec<ReportPage>,
    /// 無法判讀而略過的行數
    pub skipped_lines: usize,
}

impl ParsedReport {
    /// 全部移動明細數
    pub fn movement_count(&self) -> usize {
        self.pages.iter().map(|p| p.movements.len()).sum()
    }
}

/// 報表解析策略
pub trait ReportParser: Send + Sync {
    /// 解析已去除空白行的行序列
    fn parse(&self, lines: &[&str]) -> ParsedReport;

    /// 解析整段文字（逐行 trim，空白行捨棄）
    fn parse_text(&self, text: &str) -> ParsedReport {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        self.parse(&lines)
    }
}

/// 期初結存判斷
pub fn is_opening_balance(history: &str) -> bool {
    history.to_uppercase().contains("SALDO ANTERIOR")
}

const NAME_MIN_CHARS: usize = 5;
const NEIGHBOR_NAME_MIN_CHARS: usize = 10;
const NAME_SCAN_RADIUS: usize = 2;
const UNIT_LOOKAHEAD: usize = 2;
const OBSERVATION_LOOKAHEAD: usize = 2;
const PERIOD_LOOKAHEAD: usize = 4;

/// 預設的啟發式解析器（正規表示式於建構時編譯一次）
#[derive(Debug, Clone)]
pub struct HeuristicReportParser {
    page_re: Regex,
    code_re: Regex,
    measure_unit_re: Regex,
    date_prefix_re: Regex,
    document_re: Regex,
    history_stop_re: Regex,
    transfer_re: Regex,
    municipality_re: Regex,
}

impl HeuristicReportParser {
    /// 創建新的解析器
    pub fn new() -> Result<Self> {
        Ok(Self {
            page_re: compile(r"(?i)Página\s*(\d+)")?,
            code_re: compile(r"\d{3}\.\d{3}\.\d{3}")?,
            measure_unit_re: compile(
                r"(?i)\b(CP|AMP|ML|TB|ENV|FR|COMP|CAPS|BISNAGA|TUBO|FRASCO)\b",
            )?,
            date_prefix_re: compile(r"^(\d{2}/\d{2}/\d{4})")?,
            document_re: compile(r"\d{7}/\d{4}")?,
            history_stop_re: compile(r"^(?:\d{7}/\d{4}|\d{3,})$")?,
            transfer_re: compile(r"Transferência nº \d+")?,
            municipality_re: compile(r"(?i)PREFEITURA MUNICIPAL DE (.+)")?,
        })
    }

    fn parse_header_line(&self, lines: &[&str], i: usize, header: &mut ReportHeader) {
        let line = lines[i];

        if header.municipality.is_none() && line.to_uppercase().contains("PREFEITURA MUNICIPAL") {
            header.municipality = match self.municipality_re.captures(line) {
                Some(caps) => Some(caps[1].trim().to_string()),
                None => lines
                    .iter()
                    .skip(i + 1)
                    .take(2)
                    .find(|l| !l.contains("Relatório") && l.chars().count() > 3)
                    .map(|l| l.trim().to_string()),
            };
        }

        if header.period.is_none() && line.contains("Relatório de Movimentação de Estoque") {
            let inline = line
                .split_once("Estoque")
                .map(|(_, rest)| rest.trim())
                .filter(|rest| rest.contains("até"));

            header.period = match inline {
                Some(rest) => Some(rest.to_string()),
                None => lines
                    .iter()
                    .skip(i + 1)
                    .take(PERIOD_LOOKAHEAD)
                    .find(|l| l.contains("até") || (l.contains("de ") && l.contains('/')))
                    .map(|l| l.trim().to_string()),
            };
        }
    }

    fn parse_product(&self, lines: &[&str], i: usize, code: &str) -> ProductInfo {
        let line = lines[i];
        let mut name = self.code_re.replace(line, "").trim().to_string();

        if name.chars().count() < NAME_MIN_CHARS || !name.contains(' ') {
            let from = i.saturating_sub(NAME_SCAN_RADIUS);
            let to = (i + NAME_SCAN_RADIUS + 1).min(lines.len());
            for (j, neighbor) in lines.iter().enumerate().take(to).skip(from) {
                if j == i
                    || !neighbor.contains(" - ")
                    || neighbor.chars().count() <= NEIGHBOR_NAME_MIN_CHARS
                {
                    continue;
                }
                let candidate = self.code_re.replace(neighbor, "").trim().to_string();
                if candidate.chars().count() > name.chars().count() {
                    name = candidate;
                }
            }
        }

        let measure_unit = lines
            .iter()
            .skip(i)
            .take(UNIT_LOOKAHEAD + 1)
            .find_map(|l| self.measure_unit_re.captures(l))
            .map(|caps| caps[1].to_uppercase())
            .unwrap_or_default();

        ProductInfo {
            code: code.to_string(),
            name: strip_dashes(&name),
            measure_unit,
        }
    }

    /// 解析日期開頭的明細列；日期不合法時回傳 `None`
    fn parse_movement(&self, lines: &[&str], i: usize, date_str: &str) -> Option<RawMovement> {
        let line = lines[i];
        let date = parse_br_date(date_str)?;
        let rest = line[date_str.len()..].trim();

        // 同行尾端的調撥註記不參與數值判讀
        let (body, inline_observation) = match self.transfer_re.find(rest) {
            Some(m) => (&rest[..m.start()], Some(m.as_str().to_string())),
            None => (rest, None),
        };

        let tokens: Vec<&str> = body.split_whitespace().collect();
        let mut history_tokens: Vec<&str> = tokens
            .iter()
            .take_while(|t| !self.history_stop_re.is_match(t))
            .copied()
            .collect();
        while history_tokens.last().map_or(false, |t| looks_numeric(t)) {
            history_tokens.pop();
        }
        let history = if history_tokens.is_empty() {
            "N/A".to_string()
        } else {
            history_tokens.join(" ")
        };

        let document = self.document_re.find(line).map(|m| m.as_str().to_string());

        // 日期與單據號碼都含 '/'，排除後剩下的才是數量與庫存
        let numbers: Vec<Decimal> = tokens
            .iter()
            .filter(|t| looks_numeric(t) && !t.contains('/'))
            .filter_map(|t| parse_quantity_token(t))
            .collect();

        let (outflow, stock) = if is_opening_balance(&history) {
            (Some(Decimal::ZERO), numbers.last().copied())
        } else {
            match numbers.as_slice() {
                [] => (None, None),
                [only] => (None, Some(*only)),
                [.., out, stock] => (Some(*out), Some(*stock)),
            }
        };

        let observation = inline_observation.or_else(|| {
            lines
                .iter()
                .skip(i + 1)
                .take(OBSERVATION_LOOKAHEAD)
                .take_while(|l| !self.date_prefix_re.is_match(l))
                .filter(|l| l.contains("Transferência") && l.contains("nº"))
                .find_map(|l| self.transfer_re.find(l))
                .map(|m| m.as_str().to_string())
        });

        Some(RawMovement {
            date,
            history,
            document,
            requisition: None,
            inflow: None,
            outflow,
            stock,
            observation,
        })
    }
}

impl ReportParser for HeuristicReportParser {
    fn parse(&self, lines: &[&str]) -> ParsedReport {
        let mut report = ParsedReport::default();
        let mut current: Option<PageBuilder> = None;

        for i in 0..lines.len() {
            let line = lines[i];

            self.parse_header_line(lines, i, &mut report.header);

            if let Some(caps) = self.page_re.captures(line) {
                if let Some(page) = current.take().and_then(PageBuilder::finish) {
                    report.pages.push(page);
                }
                match caps[1].parse::<u32>() {
                    Ok(number) => current = Some(PageBuilder::new(number)),
                    Err(_) => report.skipped_lines += 1,
                }
                continue;
            }

            if let Some(caps) = self.date_prefix_re.captures(line) {
                let date_str = caps.get(1).map_or("", |m| m.as_str());
                match (current.as_mut(), self.parse_movement(lines, i, date_str)) {
                    (Some(page), Some(movement)) => page.movements.push(movement),
                    _ => {
                        tracing::trace!("略過明細列: {}", line);
                        report.skipped_lines += 1;
                    }
                }
                continue;
            }

            if let Some(m) = self.code_re.find(line) {
                let product = self.parse_product(lines, i, m.as_str());
                if let Some(page) = current.as_mut() {
                    page.product = Some(product);
                }
            }
        }

        if let Some(page) = current.and_then(PageBuilder::finish) {
            report.pages.push(page);
        }

        report
    }
}

struct PageBuilder {
    number: u32,
    product: Option<ProductInfo>,
    movements: Vec<RawMovement>,
}

impl PageBuilder {
    fn new(number: u32) -> Self {
        Self {
            number,
            product: None,
            movements: Vec::new(),
        }
    }

    /// 沒有品項的頁面捨棄
    fn finish(self) -> Option<ReportPage> {
        let product = self.product?;
        Some(ReportPage {
            number: self.number,
            product,
            movements: self.movements,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| MtxError::Config(format!("無效的正規表示式 {}: {}", pattern, e)))
}

fn looks_numeric(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',' || c == '/')
}

fn strip_dashes(name: &str) -> String {
    name.trim()
        .trim_start_matches('-')
        .trim_end_matches('-')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PAGE_REPORT: &str = "
PREFEITURA MUNICIPAL DE PALMARES PAULISTA
Relatório de Movimentação de Estoque de 26/05/2025 até 01/06/2025

Página 1

AAS - ÁCIDO ACETIL SALICÍLICO 100MG
325.023.001                                           CP

Data        Histórico                    Documento    Requisição    Movimento        Estoque    Observação
                                                                   Entrada  Saída

25/05/2025  SALDO ANTERIOR                                                   0      12.290
27/05/2025  FARMACIA OLAVO DOMINGUES     0000874/2025                      500      11.790    Transferência nº 2063
29/05/2025  UBS III OLAVO DOMINGUES      0000891/2025                       20      11.770
Transferência nº 2073

Página 2

DIPIRONA SÓDICA - 500MG/ML
412.015.002                                          AMP

Data        Histórico                    Documento    Requisição    Movimento        Estoque    Observação

26/05/2025  SALDO ANTERIOR                                                   0       5.000
28/05/2025  POSTO DE SAÚDE CENTRAL       0000910/2025                      150       4.850
";

    fn parser() -> HeuristicReportParser {
        HeuristicReportParser::new().unwrap()
    }

    #[test]
    fn test_parse_two_page_report() {
        let report = parser().parse_text(TWO_PAGE_REPORT);

        assert_eq!(report.header.municipality.as_deref(), Some("PALMARES PAULISTA"));
        assert_eq!(report.header.period.as_deref(), Some("de 26/05/2025 até 01/06/2025"));
        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.movement_count(), 5);
        assert_eq!(report.skipped_lines, 0);

        let first = &report.pages[0];
        assert_eq!(first.number, 1);
        assert_eq!(first.product.code, "325.023.001");
        assert_eq!(first.product.name, "AAS - ÁCIDO ACETIL SALICÍLICO 100MG");
        assert_eq!(first.product.measure_unit, "CP");

        let opening = &first.movements[0];
        assert!(opening.is_opening_balance());
        assert_eq!(opening.outflow, Some(Decimal::ZERO));
        assert_eq!(opening.stock, Some(Decimal::from(12290)));
        assert_eq!(opening.document, None);
        assert_eq!(opening.history, "SALDO ANTERIOR");
        assert_eq!(opening.observation, None);

        let transfer = &first.movements[1];
        assert_eq!(transfer.history, "FARMACIA OLAVO DOMINGUES");
        assert_eq!(transfer.document.as_deref(), Some("0000874/2025"));
        assert_eq!(transfer.outflow, Some(Decimal::from(500)));
        assert_eq!(transfer.stock, Some(Decimal::from(11790)));
        assert_eq!(transfer.inflow, None);
        assert_eq!(transfer.observation.as_deref(), Some("Transferência nº 2063"));

        let next_line_note = &first.movements[2];
        assert_eq!(next_line_note.outflow, Some(Decimal::from(20)));
        assert_eq!(next_line_note.stock, Some(Decimal::from(11770)));
        assert_eq!(next_line_note.observation.as_deref(), Some("Transferência nº 2073"));

        let second = &report.pages[1];
        assert_eq!(second.product.code, "412.015.002");
        assert_eq!(second.product.name, "DIPIRONA SÓDICA - 500MG/ML");
        assert_eq!(second.product.measure_unit, "AMP");
        assert_eq!(second.movements[0].stock, Some(Decimal::from(5000)));
        assert_eq!(second.movements[1].outflow, Some(Decimal::from(150)));
        assert_eq!(second.movements[1].stock, Some(Decimal::from(4850)));
        assert_eq!(
            second.movements[1].date,
            NaiveDate::from_ymd_opt(2025, 5, 28).unwrap()
        );
    }

    #[test]
    fn test_single_number_is_stock_only() {
        let report = parser().parse_text("Página 1\n325.023.001 DIPIRONA 500MG\n03/06/2025 AJUSTE 1.500");
        let movement = &report.pages[0].movements[0];

        assert_eq!(movement.history, "AJUSTE");
        assert_eq!(movement.outflow, None);
        assert_eq!(movement.stock, Some(Decimal::from(1500)));
    }

    #[test]
    fn test_short_trailing_numbers_leave_history() {
        let text = "Página 1\n325.023.001 DIPIRONA 500MG\n\
                    03/06/2025 DISPENSACAO PACIENTE 5 12,5\n\
                    04/06/2025 UBS 3 CENTRO 0000874/2025 10 90";
        let report = parser().parse_text(text);
        let movements = &report.pages[0].movements;

        assert_eq!(movements[0].history, "DISPENSACAO PACIENTE");
        assert_eq!(movements[0].outflow, Some(Decimal::from(5)));
        assert_eq!(movements[0].stock, Some(Decimal::new(125, 1)));

        // 只移除尾端數值，名稱中間的數字保留
        assert_eq!(movements[1].history, "UBS 3 CENTRO");
        assert_eq!(movements[1].outflow, Some(Decimal::from(10)));
        assert_eq!(movements[1].stock, Some(Decimal::from(90)));
    }

    #[test]
    fn test_empty_history_defaults_to_na() {
        let report = parser().parse_text("Página 1\n325.023.001 DIPIRONA 500MG\n03/06/2025 0000874/2025 10 90");
        let movement = &report.pages[0].movements[0];

        assert_eq!(movement.history, "N/A");
        assert_eq!(movement.outflow, Some(Decimal::from(10)));
        assert_eq!(movement.stock, Some(Decimal::from(90)));
    }

    #[test]
    fn test_invalid_date_line_skipped() {
        let report = parser().parse_text("Página 1\n325.023.001 DIPIRONA 500MG\n31/02/2025 DISPENSACAO 5 10");

        assert_eq!(report.pages.len(), 1);
        assert!(report.pages[0].movements.is_empty());
        assert_eq!(report.skipped_lines, 1);
    }

    #[test]
    fn test_rows_without_page_are_discarded() {
        let report = parser().parse_text("325.023.001 DIPIRONA 500MG\n03/06/2025 DISPENSACAO 5 10");

        assert!(report.pages.is_empty());
        assert_eq!(report.skipped_lines, 1);
    }

    #[test]
    fn test_page_without_product_dropped() {
        let report = parser().parse_text(
            "Página 1\n03/06/2025 DISPENSACAO 5 10\nPágina 2\n325.023.001 DIPIRONA 500MG\n04/06/2025 DISPENSACAO 2 8",
        );

        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.pages[0].number, 2);
        assert_eq!(report.pages[0].movements.len(), 1);
    }

    #[test]
    fn test_short_name_uses_neighbor_line() {
        let report = parser().parse_text("Página 3\nLUVA PROCEDIMENTO - TAM M\n501.007.001 CX");
        let product = &report.pages[0].product;

        assert_eq!(product.name, "LUVA PROCEDIMENTO - TAM M");
        assert_eq!(product.measure_unit, "");
    }
}
