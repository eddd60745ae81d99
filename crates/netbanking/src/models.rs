//! Models mirroring the netbanking web API response structures.
//!
//! Only the fields the engine reads are mapped. Every list field defaults to
//! empty so that a response without it counts as "zero entities".

use serde::{Deserialize, Deserializer};

use crate::money;

/// Monetary amount as transmitted by the API.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Amount {
    /// Integer digit string; the API sends either a JSON string or number.
    #[serde(deserialize_with = "string_or_number")]
    pub value: String,
    #[serde(default)]
    pub precision: u32,
    #[serde(default)]
    pub currency: String,
}

impl Amount {
    /// Grouped display form, e.g. `1 234.56 CZK`.
    pub fn to_display(&self) -> String {
        money::format_money(&self.value, self.precision, &self.currency)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountNumber {
    pub number: Option<String>,
    pub bank_code: Option<String>,
    pub iban: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub id: String,
    pub accountno: Option<AccountNumber>,
}

#[derive(Debug, Deserialize)]
pub struct AccountsResponse {
    #[serde(default)]
    pub accounts: Vec<Account>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub main_account: Option<Account>,
}

#[derive(Debug, Deserialize)]
pub struct CardsResponse {
    #[serde(default)]
    pub cards: Vec<Card>,
}

#[derive(Debug, Deserialize)]
pub struct BuildingsResponse {
    #[serde(default)]
    pub buildings: Vec<Account>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PensionAgreement {
    pub id: String,
    pub agreement_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PensionsResponse {
    #[serde(default)]
    pub pensions: Vec<PensionAgreement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insurance {
    pub id: String,
    pub policy_number: Option<String>,
    #[serde(rename = "productI18N")]
    pub product_i18n: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InsurancesResponse {
    #[serde(default)]
    pub insurances: Vec<Insurance>,
}

#[derive(Debug, Deserialize)]
pub struct SecuritiesAccount {
    pub id: String,
    /// Plain string here, unlike the structured number of bank accounts.
    pub accountno: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritiesResponse {
    #[serde(default)]
    pub securities_accounts: Vec<SecuritiesAccount>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceResponse {
    pub balance: Option<Amount>,
    pub disposable: Option<Amount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyResponse {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub points_count: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AccountParty {
    pub account_party_info: Option<String>,
    pub account_party_description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub amount: Option<Amount>,
    pub booking_date: Option<String>,
    pub description: Option<String>,
    pub variable_symbol: Option<String>,
    pub account_party: Option<AccountParty>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub amount: Option<Amount>,
    pub creation_date: Option<String>,
    pub description: Option<String>,
    pub merchant_name: Option<String>,
    pub merchant_address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReservationsResponse {
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
}

fn value_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    value_to_string(value)
        .ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_accepts_numeric_value() {
        let json = r#"{"value": 123456, "precision": 2, "currency": "CZK"}"#;
        let amount: Amount = serde_json::from_str(json).unwrap();
        assert_eq!(amount.value, "123456");
        assert_eq!(amount.to_display(), "1 234.56 CZK");
    }

    #[test]
    fn test_amount_accepts_string_value() {
        let json = r#"{"value": "-4200", "precision": 2, "currency": "EUR"}"#;
        let amount: Amount = serde_json::from_str(json).unwrap();
        assert_eq!(amount.to_display(), "-42.00 EUR");
    }

    #[test]
    fn test_accounts_response_parsing() {
        let json = r#"{
            "accounts": [
                {
                    "id": "CCA4F9863D686D04",
                    "accountno": {
                        "number": "2328489013",
                        "bankCode": "0800",
                        "iban": "CZ5508000000002328489013"
                    }
                }
            ]
        }"#;

        let response: AccountsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.accounts.len(), 1);
        let number = response.accounts[0].accountno.as_ref().unwrap();
        assert_eq!(number.bank_code.as_deref(), Some("0800"));
        assert_eq!(number.iban.as_deref(), Some("CZ5508000000002328489013"));
    }

    #[test]
    fn test_missing_list_is_empty() {
        let response: CardsResponse = serde_json::from_str("{}").unwrap();
        assert!(response.cards.is_empty());

        let response: SecuritiesResponse = serde_json::from_str(r#"{"pageCount": 0}"#).unwrap();
        assert!(response.securities_accounts.is_empty());
    }

    #[test]
    fn test_insurance_product_name_field() {
        let json =
            r#"{"insurances": [{"id": "I1", "policyNumber": "P-77", "productI18N": "Flexi"}]}"#;
        let response: InsurancesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.insurances[0].product_i18n.as_deref(), Some("Flexi"));
    }

    #[test]
    fn test_loyalty_points_optional() {
        let response: LoyaltyResponse = serde_json::from_str(r#"{"pointsCount": 15320}"#).unwrap();
        assert_eq!(response.points_count.as_deref(), Some("15320"));

        let response: LoyaltyResponse =
            serde_json::from_str(r#"{"state": "NOT_REGISTERED"}"#).unwrap();
        assert!(response.points_count.is_none());
    }
}
