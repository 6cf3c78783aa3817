use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectPath {
    pub project: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertyPath {
    pub project: String,
    pub property_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalancePath {
    pub balance_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentPath {
    pub payment_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptPath {
    pub payment_id: String,
    pub kind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertiesQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BalancesQuery {
    pub search: Option<String>,
    pub project: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentsQuery {
    pub search: Option<String>,
    pub project: Option<String>,
    pub status: Option<String>,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    #[serde(default)]
    pub missing_ar_receipt: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangesQuery {
    pub table: Option<String>,
}

const DEFAULT_DUE_DATE: &str = "15th";

fn default_due_date() -> String {
    DEFAULT_DUE_DATE.to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordPaymentInput {
    #[validate(range(min = 0.0))]
    pub amount: f64,
    #[validate(range(min = 0.0))]
    pub penalty: Option<f64>,
    pub payment_type: Option<String>,
    #[validate(length(max = 32))]
    pub payment_month: Option<String>,
    #[serde(default = "default_due_date")]
    #[validate(length(max = 32))]
    pub due_date: String,
    #[serde(default, alias = "Months Paid")]
    #[validate(length(max = 64))]
    pub months_paid: Option<String>,
}

impl RecordPaymentInput {
    /// Trimmed due date; blank falls back to the default.
    pub fn resolved_due_date(&self) -> String {
        let trimmed = self.due_date.trim();
        if trimmed.is_empty() {
            DEFAULT_DUE_DATE.to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{validate_input, PaymentsQuery, RecordPaymentInput};
    use crate::error::AppError;

    #[test]
    fn record_payment_defaults_due_date() {
        let input: RecordPaymentInput =
            serde_json::from_value(json!({"amount": 1500.0, "payment_month": "2025-04"})).unwrap();
        assert_eq!(input.due_date, "15th");
        assert!(validate_input(&input).is_ok());
    }

    #[test]
    fn record_payment_rejects_negative_amounts() {
        let input: RecordPaymentInput =
            serde_json::from_value(json!({"amount": -1.0})).unwrap();
        assert!(matches!(
            validate_input(&input),
            Err(AppError::UnprocessableEntity(_))
        ));

        let input: RecordPaymentInput =
            serde_json::from_value(json!({"amount": 1.0, "penalty": -5.0})).unwrap();
        assert!(validate_input(&input).is_err());
    }

    #[test]
    fn blank_due_date_falls_back_to_default() {
        let input: RecordPaymentInput =
            serde_json::from_value(json!({"amount": 10.0, "due_date": "   "})).unwrap();
        assert!(validate_input(&input).is_ok());
        assert_eq!(input.resolved_due_date(), "15th");

        let input: RecordPaymentInput =
            serde_json::from_value(json!({"amount": 10.0, "due_date": " 30th "})).unwrap();
        assert_eq!(input.resolved_due_date(), "30th");
    }

    #[test]
    fn accepts_months_paid_label_under_either_name() {
        let input: RecordPaymentInput =
            serde_json::from_value(json!({"amount": 10.0, "Months Paid": "April 2025"})).unwrap();
        assert_eq!(input.months_paid.as_deref(), Some("April 2025"));

        let input: RecordPaymentInput =
            serde_json::from_value(json!({"amount": 10.0, "months_paid": "May 2025"})).unwrap();
        assert_eq!(input.months_paid.as_deref(), Some("May 2025"));
    }

    #[test]
    fn payments_query_flag_defaults_off() {
        let query: PaymentsQuery = serde_json::from_value(json!({"status": "Pending"})).unwrap();
        assert!(!query.missing_ar_receipt);
    }
}
