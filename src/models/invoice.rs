use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sqlx::types::BigDecimal;

#[derive(sqlx::FromRow, Serialize, Debug, Clone)]
pub struct Invoice {
    pub id: i32,
    pub client_id: i32,
    pub title: String,
    #[serde(serialize_with = "amount_as_number")]
    pub amount: BigDecimal,
    pub due_date: Option<DateTime<Utc>>,
    pub is_paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub client_id: i32,
    pub title: String,
    pub amount: BigDecimal,
    pub due_date: Option<DateTime<Utc>>,
}

// Amounts go over the wire as JSON numbers, not decimal strings
fn amount_as_number<S: Serializer>(amount: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    let value = amount
        .to_string()
        .parse::<f64>()
        .map_err(serde::ser::Error::custom)?;

    serializer.serialize_f64(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn amount_serializes_as_a_number() {
        let invoice = Invoice {
            id: 1,
            client_id: 2,
            title: "Design work".to_string(),
            amount: BigDecimal::from_str("1250.50").unwrap(),
            due_date: None,
            is_paid: false,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["amount"], serde_json::json!(1250.5));
        assert_eq!(json["due_date"], serde_json::Value::Null);
        assert_eq!(json["is_paid"], serde_json::json!(false));
    }
}
