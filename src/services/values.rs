use chrono::NaiveDate;
use serde_json::{Number, Value};

/// Lenient numeric read used for property columns: currency symbols and
/// thousands separators are dropped and the longest decimal prefix wins.
/// Anything unreadable is 0.
pub fn parse_numeric(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => parse_numeric_text(text),
        _ => 0.0,
    }
}

fn parse_numeric_text(text: &str) -> f64 {
    let cleaned = text
        .chars()
        .filter(|character| character.is_ascii_digit() || matches!(character, '.' | '-'))
        .collect::<String>();

    let bytes = cleaned.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    cleaned[..end].parse::<f64>().unwrap_or(0.0)
}

/// Balance amounts: null or blank is "no value", commas are ignored.
pub fn parse_optional_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let cleaned = text.replace(',', "");
            let trimmed = cleaned.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Whole-number counter stored as text or number; unreadable is 0.
pub fn parse_count(value: &Value) -> i64 {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|parsed| parsed.trunc() as i64))
            .unwrap_or(0),
        Value::String(text) => text.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

pub fn format_php(amount: f64) -> String {
    if !amount.is_finite() {
        return "₱0.00".to_string();
    }
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}₱{grouped}.{fraction:02}")
}

/// `"2025-04"` or `"2025-04-01"` becomes `"April 2025"`.
pub fn month_label(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(3, '-');
    let year = parts.next().and_then(|part| {
        (part.len() == 4)
            .then(|| part.parse::<i32>().ok())
            .flatten()
    });
    let month = parts.next().and_then(|part| {
        (part.len() == 2)
            .then(|| part.parse::<u32>().ok())
            .flatten()
    });

    match (year, month) {
        (Some(year), Some(month)) => NaiveDate::from_ymd_opt(year, month, 1)
            .map(|date| date.format("%B %Y").to_string())
            .unwrap_or_else(|| "N/A".to_string()),
        _ => "N/A".to_string(),
    }
}

/// Numeric value of every digit in `text` ("Block 12-A" is 12).
pub fn digits_of(text: &str) -> u64 {
    text.chars()
        .filter_map(|character| character.to_digit(10))
        .fold(0u64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(u64::from(digit))
        })
}

/// Text rendering of a scalar cell; null is empty.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

pub fn json_number(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::Number(Number::from(0)))
}

pub fn value_str(row: &Value, key: &str) -> String {
    value_str_opt(row, key).unwrap_or_default()
}

pub fn value_str_opt(row: &Value, key: &str) -> Option<String> {
    row.as_object()
        .and_then(|obj| obj.get(key))
        .map(text_of)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The stored text as-is, `None` when it is blank. Use where the value is
/// matched against other rows or embedded in a storage key.
pub fn value_raw_opt(row: &Value, key: &str) -> Option<String> {
    row.as_object()
        .and_then(|obj| obj.get(key))
        .map(text_of)
        .filter(|value| !value.trim().is_empty())
}

pub fn non_empty_opt(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToOwned::to_owned)
}

pub fn field<'a>(row: &'a Value, key: &str) -> &'a Value {
    row.as_object()
        .and_then(|obj| obj.get(key))
        .unwrap_or(&Value::Null)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_lenient_numbers() {
        assert_eq!(parse_numeric(&json!("₱1,234.50")), 1234.5);
        assert_eq!(parse_numeric(&json!(42)), 42.0);
        assert_eq!(parse_numeric(&json!("1.2.3")), 1.2);
        assert_eq!(parse_numeric(&json!("-15 sqm")), -15.0);
        assert_eq!(parse_numeric(&json!("n/a")), 0.0);
        assert_eq!(parse_numeric(&json!(null)), 0.0);
        assert_eq!(parse_numeric(&json!("12-5")), 12.0);
    }

    #[test]
    fn optional_amounts_keep_zero() {
        assert_eq!(parse_optional_amount(&json!("1,500,000")), Some(1_500_000.0));
        assert_eq!(parse_optional_amount(&json!(0)), Some(0.0));
        assert_eq!(parse_optional_amount(&json!("0")), Some(0.0));
        assert_eq!(parse_optional_amount(&json!("")), None);
        assert_eq!(parse_optional_amount(&json!(null)), None);
        assert_eq!(parse_optional_amount(&json!("abc")), None);
    }

    #[test]
    fn counts_from_text_or_number() {
        assert_eq!(parse_count(&json!("12")), 12);
        assert_eq!(parse_count(&json!(3)), 3);
        assert_eq!(parse_count(&json!("twelve")), 0);
        assert_eq!(parse_count(&json!(null)), 0);
    }

    #[test]
    fn formats_pesos() {
        assert_eq!(format_php(1234.5), "₱1,234.50");
        assert_eq!(format_php(0.0), "₱0.00");
        assert_eq!(format_php(1_000_000.0), "₱1,000,000.00");
        assert_eq!(format_php(-99.999), "-₱100.00");
        assert_eq!(format_php(f64::NAN), "₱0.00");
    }

    #[test]
    fn labels_months() {
        assert_eq!(month_label("2025-04"), "April 2025");
        assert_eq!(month_label("2025-04-01"), "April 2025");
        assert_eq!(month_label("2025-13"), "N/A");
        assert_eq!(month_label(""), "N/A");
        assert_eq!(month_label("April"), "N/A");
    }

    #[test]
    fn extracts_digits() {
        assert_eq!(digits_of("12"), 12);
        assert_eq!(digits_of("Block 3-A"), 3);
        assert_eq!(digits_of("none"), 0);
    }

    #[test]
    fn reads_trimmed_strings() {
        let row = json!({"Name": "  Ana ", "Block": 4, "Empty": " "});
        assert_eq!(value_str(&row, "Name"), "Ana");
        assert_eq!(value_str(&row, "Block"), "4");
        assert_eq!(value_str_opt(&row, "Empty"), None);
        assert_eq!(value_str_opt(&row, "Missing"), None);
    }

    #[test]
    fn raw_strings_keep_surrounding_spaces() {
        let row = json!({"Name": "Juan ", "Lot": 7, "Empty": "  "});
        assert_eq!(value_raw_opt(&row, "Name").as_deref(), Some("Juan "));
        assert_eq!(value_raw_opt(&row, "Lot").as_deref(), Some("7"));
        assert_eq!(value_raw_opt(&row, "Empty"), None);
        assert_eq!(value_raw_opt(&row, "Missing"), None);
    }
}
