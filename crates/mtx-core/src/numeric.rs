//! 巴西格式數值與日期解析
//!
//! 報表中同一個符號可能是千分位也可能是小數點（`1.234` 與 `12,5`），
//! 這裡集中處理兩種來源的判讀規則：
//! - 移動報表的數量欄位：以位數啟發式判斷千分位
//! - 結存表（balancete）的表格欄位：逗號一律為小數點

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// 解析移動報表中的數量 token
///
/// 無法解析時回傳 `None`，呼叫端不得以 0 代替（0 本身是有效觀測值）。
pub fn parse_quantity_token(token: &str) -> Option<Decimal> {
    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let has_dot = cleaned.contains('.');
    let has_comma = cleaned.contains(',');

    // 1.234 / 12.345.678 → 千分位整數
    if is_dot_grouped_integer(&cleaned) {
        return parse_plain(&cleaned.replace('.', ""));
    }

    // 12,5 / 12,50 → 小數
    if let Some((int_part, frac)) = cleaned.split_once(',') {
        if !has_dot
            && is_digits(int_part)
            && is_digits(frac)
            && (1..=2).contains(&frac.len())
        {
            return parse_plain(&format!("{}.{}", int_part, frac));
        }
    }

    if has_dot && has_comma {
        return parse_plain(&cleaned.replace('.', "").replace(',', "."));
    }

    if has_comma {
        let parts: Vec<&str> = cleaned.split(',').collect();
        if parts.len() == 2 && parts[1].len() <= 2 {
            return parse_plain(&cleaned.replace(',', "."));
        }
        return parse_plain(&cleaned.replace(',', ""));
    }

    if has_dot {
        if has_short_dot_fraction(&cleaned) {
            return parse_plain(&cleaned);
        }
        return parse_plain(&cleaned.replace('.', ""));
    }

    parse_plain(&cleaned)
}

/// 解析結存表欄位（`R$ 1.234,56`、`0,1234`、`1.500`、`-12`）
pub fn parse_br_decimal(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .replace("R$", "")
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }

    let normalized = if cleaned.contains('.') && cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.contains(',') {
        cleaned.replace(',', ".")
    } else if is_dot_grouped_integer(cleaned.trim_start_matches('-')) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    parse_plain(&normalized)
}

/// 解析 `DD/MM/YYYY`
pub fn parse_br_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

fn parse_plain(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s).ok()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// `^\d{1,3}(\.\d{3})+$`
fn is_dot_grouped_integer(s: &str) -> bool {
    let mut groups = s.split('.');
    let head = match groups.next() {
        Some(h) => h,
        None => return false,
    };

    if !is_digits(head) || head.len() > 3 {
        return false;
    }

    let mut tail_count = 0;
    for group in groups {
        if group.len() != 3 || !is_digits(group) {
            return false;
        }
        tail_count += 1;
    }

    tail_count > 0
}

/// 以 `.X` 或 `.XX` 結尾
fn has_short_dot_fraction(s: &str) -> bool {
    match s.rsplit_once('.') {
        Some((_, frac)) => is_digits(frac) && frac.len() <= 2,
        None => false,
    }
}
