//! The in-progress form value behind the draft controller.
//!
//! A draft keeps every field as the raw text the user typed. Conversion into
//! an [`AccountRecord`] happens once, at submit time, so editing never fails.

use thiserror::Error;

use super::{AccountField, AccountRecord, AccountType, Amount, AmountError, UnknownAccountType};

/// Amount pre-filled in a fresh draft.
pub const DEFAULT_DRAFT_AMOUNT: &str = "0";

/// Raw form values for a new ledger entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Account number as typed.
    pub account_number: String,
    /// Account holder name as typed.
    pub account_name: String,
    /// IBAN as typed.
    pub iban: String,
    /// Postal address as typed.
    pub address: String,
    /// Amount as typed; validated as a decimal on submit.
    pub amount: String,
    /// Direction as typed; must be `sending` or `receiving` on submit.
    pub account_type: String,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            account_number: String::new(),
            account_name: String::new(),
            iban: String::new(),
            address: String::new(),
            amount: DEFAULT_DRAFT_AMOUNT.to_owned(),
            account_type: AccountType::default().as_str().to_owned(),
        }
    }
}

/// Reasons a draft cannot become an [`AccountRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftValidationError {
    /// One or more fields are empty or whitespace.
    #[error("required fields are blank: {}", field_list(.fields))]
    MissingFields {
        /// Every blank field, in display order.
        fields: Vec<AccountField>,
    },
    /// The direction is not a known account type.
    #[error(transparent)]
    AccountType(#[from] UnknownAccountType),
    /// The amount is not a decimal number.
    #[error(transparent)]
    Amount(#[from] AmountError),
}

fn field_list(fields: &[AccountField]) -> String {
    fields
        .iter()
        .map(|field| field.wire_name())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Draft {
    /// Read one field.
    #[must_use]
    pub fn get(&self, field: AccountField) -> &str {
        match field {
            AccountField::AccountNumber => &self.account_number,
            AccountField::AccountName => &self.account_name,
            AccountField::Iban => &self.iban,
            AccountField::Address => &self.address,
            AccountField::Amount => &self.amount,
            AccountField::Type => &self.account_type,
        }
    }

    /// Replace one field with `value`, accepting any text.
    pub fn set(&mut self, field: AccountField, value: impl Into<String>) {
        let slot = match field {
            AccountField::AccountNumber => &mut self.account_number,
            AccountField::AccountName => &mut self.account_name,
            AccountField::Iban => &mut self.iban,
            AccountField::Address => &mut self.address,
            AccountField::Amount => &mut self.amount,
            AccountField::Type => &mut self.account_type,
        };
        *slot = value.into();
    }

    /// Fields whose value is empty once trimmed.
    #[must_use]
    pub fn blank_fields(&self) -> Vec<AccountField> {
        AccountField::ALL
            .into_iter()
            .filter(|field| self.get(*field).trim().is_empty())
            .collect()
    }

    /// Validate the draft and build the record to submit.
    ///
    /// Text fields are sent as typed; only blankness is checked.
    ///
    /// # Errors
    ///
    /// Returns [`DraftValidationError::MissingFields`] listing every blank
    /// field, otherwise the first type or amount parse failure.
    pub fn to_record(&self) -> Result<AccountRecord, DraftValidationError> {
        let fields = self.blank_fields();
        if !fields.is_empty() {
            return Err(DraftValidationError::MissingFields { fields });
        }
        let account_type: AccountType = self.account_type.parse()?;
        let amount = Amount::parse(&self.amount)?;
        Ok(AccountRecord {
            account_number: self.account_number.clone(),
            account_name: self.account_name.clone(),
            iban: self.iban.clone(),
            address: self.address.clone(),
            amount,
            account_type,
        })
    }
}
