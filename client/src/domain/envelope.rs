//! Normalisation of ledger list responses.
//!
//! The ledger has served two list shapes over time: a flat
//! `{ "accounts": [...] }` body and a document-store
//! `{ "revisions": [{ "document": {...} }] }` body. Both are resolved here,
//! once, into an ordered `Vec<AccountRecord>`.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::AccountRecord;

/// Uninterpreted list body as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnvelope(Value);

impl RawEnvelope {
    /// Wrap a decoded JSON body.
    #[must_use]
    pub const fn new(body: Value) -> Self {
        Self(body)
    }

    /// Borrow the JSON body.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Take ownership of the JSON body.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for RawEnvelope {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// A list body whose shape did not match any known envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed ledger response: {message}")]
pub struct MalformedResponse {
    message: String,
}

impl MalformedResponse {
    /// Build an error with a description of the mismatch.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Description of the mismatch.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// One element of a document-store list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Revision {
    /// The stored account record.
    pub document: AccountRecord,
    /// Store-assigned revision marker, when present.
    #[serde(default)]
    pub revision: Option<Value>,
    /// Store transaction that produced the revision, when present.
    #[serde(default, rename = "transactionId")]
    pub transaction_id: Option<Value>,
}

/// The known list shapes, resolved from a [`RawEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountEnvelope {
    /// `{ "accounts": [AccountRecord] }`.
    Flat {
        /// Records in server order.
        accounts: Vec<AccountRecord>,
    },
    /// `{ "revisions": [{ "document": AccountRecord }] }`.
    Revisions {
        /// Revision-wrapped records in server order.
        revisions: Vec<Revision>,
    },
}

impl AccountEnvelope {
    /// Resolve a raw body into one of the known shapes.
    ///
    /// A body carrying a `revisions` list is read as the document-store shape
    /// even if it also carries `accounts`. A `null` list defers to the other
    /// key and reads as empty when that key is missing.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedResponse`] when the body is not an object, carries
    /// neither list, or any element fails to decode.
    pub fn classify(raw: RawEnvelope) -> Result<Self, MalformedResponse> {
        let Value::Object(mut body) = raw.into_value() else {
            return Err(MalformedResponse::new("body is not a JSON object"));
        };

        let revisions_null = match take_list(&mut body, "revisions")? {
            ListField::Items(revisions) => return Ok(Self::Revisions { revisions }),
            ListField::Null => true,
            ListField::Absent => false,
        };
        match take_list(&mut body, "accounts")? {
            ListField::Items(accounts) => Ok(Self::Flat { accounts }),
            ListField::Null => Ok(Self::Flat {
                accounts: Vec::new(),
            }),
            ListField::Absent if revisions_null => Ok(Self::Revisions {
                revisions: Vec::new(),
            }),
            ListField::Absent => Err(MalformedResponse::new(
                "expected an `accounts` or `revisions` list",
            )),
        }
    }

    /// Project the envelope into plain records, preserving order.
    #[must_use]
    pub fn into_records(self) -> Vec<AccountRecord> {
        match self {
            Self::Flat { accounts } => accounts,
            Self::Revisions { revisions } => revisions
                .into_iter()
                .map(|revision| revision.document)
                .collect(),
        }
    }
}

enum ListField<T> {
    Absent,
    Null,
    Items(Vec<T>),
}

fn take_list<T>(body: &mut Map<String, Value>, key: &str) -> Result<ListField<T>, MalformedResponse>
where
    T: for<'de> Deserialize<'de>,
{
    let Some(value) = body.remove(key) else {
        return Ok(ListField::Absent);
    };
    let items: Option<Vec<T>> = serde_json::from_value(value)
        .map_err(|error| MalformedResponse::new(format!("invalid `{key}` list: {error}")))?;
    Ok(items.map_or(ListField::Null, ListField::Items))
}

/// Normalise a list body into records.
///
/// # Errors
///
/// Returns [`MalformedResponse`] when the body matches neither known shape.
/// No partial result is ever returned.
///
/// # Examples
/// ```
/// use ledger_client::domain::{RawEnvelope, normalize};
/// use serde_json::json;
///
/// let body = RawEnvelope::new(json!({
///     "revisions": [{ "document": {
///         "account_number": "AC2",
///         "account_name": "Bob",
///         "iban": "GB33BUKB20201555555555",
///         "address": "2 High St",
///         "amount": "5",
///         "type": "receiving"
///     }}]
/// }));
/// let records = normalize(body)?;
/// assert_eq!(records[0].account_number, "AC2");
/// # Ok::<(), ledger_client::domain::MalformedResponse>(())
/// ```
pub fn normalize(raw: RawEnvelope) -> Result<Vec<AccountRecord>, MalformedResponse> {
    AccountEnvelope::classify(raw).map(AccountEnvelope::into_records)
}
