//! Account ledger entry model.
//!
//! Wire names follow the ledger service (`account_number`, `type`, ...).
//! camelCase spellings are accepted on decode because earlier clients sent
//! them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Amount;

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Money leaves the account.
    #[default]
    Sending,
    /// Money arrives in the account.
    Receiving,
}

impl AccountType {
    /// Wire representation of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sending => "sending",
            Self::Receiving => "receiving",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unsupported account direction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("account type `{value}` must be `sending` or `receiving`")]
pub struct UnknownAccountType {
    /// The rejected input.
    pub value: String,
}

impl FromStr for AccountType {
    type Err = UnknownAccountType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "sending" => Ok(Self::Sending),
            "receiving" => Ok(Self::Receiving),
            other => Err(UnknownAccountType {
                value: other.to_owned(),
            }),
        }
    }
}

/// One ledger entry as stored by the remote service.
///
/// `account_number` identifies the entry within a collection.
///
/// # Examples
/// ```
/// use ledger_client::domain::{AccountRecord, AccountType};
/// use serde_json::json;
///
/// let record: AccountRecord = serde_json::from_value(json!({
///     "account_number": "AC1",
///     "account_name": "Alice",
///     "iban": "DE89370400440532013000",
///     "address": "1 Main St",
///     "amount": "100",
///     "type": "sending"
/// }))?;
/// assert_eq!(record.account_type, AccountType::Sending);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Account number, unique within a collection.
    #[serde(alias = "accountNumber")]
    pub account_number: String,
    /// Account holder name.
    #[serde(alias = "accountName")]
    pub account_name: String,
    /// International bank account number.
    pub iban: String,
    /// Postal address of the holder.
    pub address: String,
    /// Entry amount as a decimal string.
    pub amount: Amount,
    /// Direction of the entry.
    #[serde(rename = "type")]
    pub account_type: AccountType,
}

/// Editable fields of an account record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountField {
    /// `account_number`.
    AccountNumber,
    /// `account_name`.
    AccountName,
    /// `iban`.
    Iban,
    /// `address`.
    Address,
    /// `amount`.
    Amount,
    /// `type`.
    Type,
}

impl AccountField {
    /// Every field, in display order.
    pub const ALL: [Self; 6] = [
        Self::AccountNumber,
        Self::AccountName,
        Self::Iban,
        Self::Address,
        Self::Amount,
        Self::Type,
    ];

    /// Field name used on the wire.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::AccountNumber => "account_number",
            Self::AccountName => "account_name",
            Self::Iban => "iban",
            Self::Address => "address",
            Self::Amount => "amount",
            Self::Type => "type",
        }
    }

    /// Human-readable column label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AccountNumber => "Account Number",
            Self::AccountName => "Account Name",
            Self::Iban => "IBAN",
            Self::Address => "Address",
            Self::Amount => "Amount",
            Self::Type => "Type",
        }
    }

    /// Read this field from a record as display text.
    #[must_use]
    pub fn value_of(self, record: &AccountRecord) -> &str {
        match self {
            Self::AccountNumber => record.account_number.as_str(),
            Self::AccountName => record.account_name.as_str(),
            Self::Iban => record.iban.as_str(),
            Self::Address => record.address.as_str(),
            Self::Amount => record.amount.as_str(),
            Self::Type => record.account_type.as_str(),
        }
    }
}

impl fmt::Display for AccountField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Error returned when a field name matches no [`AccountField`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown account field `{name}`")]
pub struct UnknownAccountField {
    /// The rejected field name.
    pub name: String,
}

impl FromStr for AccountField {
    type Err = UnknownAccountField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "account_number" | "accountNumber" => Ok(Self::AccountNumber),
            "account_name" | "accountName" => Ok(Self::AccountName),
            "iban" => Ok(Self::Iban),
            "address" => Ok(Self::Address),
            "amount" => Ok(Self::Amount),
            "type" => Ok(Self::Type),
            other => Err(UnknownAccountField {
                name: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Wire-shape coverage for account records.

    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn alice() -> AccountRecord {
        AccountRecord {
            account_number: "AC1".to_owned(),
            account_name: "Alice".to_owned(),
            iban: "DE89370400440532013000".to_owned(),
            address: "1 Main St".to_owned(),
            amount: Amount::parse("100").expect("valid amount"),
            account_type: AccountType::Sending,
        }
    }

    #[test]
    fn encodes_with_ledger_field_names() {
        let value = serde_json::to_value(alice()).expect("encode");
        assert_eq!(
            value,
            json!({
                "account_number": "AC1",
                "account_name": "Alice",
                "iban": "DE89370400440532013000",
                "address": "1 Main St",
                "amount": "100",
                "type": "sending"
            })
        );
    }

    #[test]
    fn decodes_camel_case_names_and_ignores_store_metadata() {
        let record: AccountRecord = serde_json::from_value(json!({
            "_id": "6540f1",
            "_vault_md": { "creator": "a:1", "ts": 1 },
            "accountNumber": "AC1",
            "accountName": "Alice",
            "iban": "DE89370400440532013000",
            "address": "1 Main St",
            "amount": 100,
            "type": "sending"
        }))
        .expect("decode");
        assert_eq!(record, alice());
    }

    #[test]
    fn rejects_unknown_direction_on_decode() {
        let mut value = serde_json::to_value(alice()).expect("encode");
        value["type"] = json!("sideways");
        assert!(serde_json::from_value::<AccountRecord>(value).is_err());
    }

    #[rstest]
    #[case("sending", AccountType::Sending)]
    #[case(" receiving ", AccountType::Receiving)]
    fn parses_account_types(#[case] raw: &str, #[case] expected: AccountType) {
        assert_eq!(raw.parse::<AccountType>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_account_types() {
        let err = "Sending".parse::<AccountType>().expect_err("case sensitive");
        assert_eq!(err.value, "Sending");
    }

    #[rstest]
    #[case("account_number", AccountField::AccountNumber)]
    #[case("accountNumber", AccountField::AccountNumber)]
    #[case("accountName", AccountField::AccountName)]
    #[case("iban", AccountField::Iban)]
    #[case("type", AccountField::Type)]
    fn parses_field_names(#[case] raw: &str, #[case] expected: AccountField) {
        assert_eq!(raw.parse::<AccountField>(), Ok(expected));
    }

    #[test]
    fn field_values_follow_the_record() {
        let record = alice();
        let values: Vec<&str> = AccountField::ALL
            .iter()
            .map(|field| field.value_of(&record))
            .collect();
        assert_eq!(
            values,
            ["AC1", "Alice", "DE89370400440532013000", "1 Main St", "100", "sending"]
        );
    }
}
