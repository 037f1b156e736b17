use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    Open,
    Closed,
    ClosedPendingPayment,
    Other(String),
}

impl TransactionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionStatus::Open => "open",
            TransactionStatus::Closed => "closed",
            TransactionStatus::ClosedPendingPayment => "closed pending payment",
            TransactionStatus::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "open" => TransactionStatus::Open,
            "closed" => TransactionStatus::Closed,
            "closed pending payment" => TransactionStatus::ClosedPendingPayment,
            _ => TransactionStatus::Other(value),
        }
    }
}

impl From<TransactionStatus> for String {
    fn from(value: TransactionStatus) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLinks {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResource {
    pub kind: String,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

/// An in-progress filing as reported by the transactions API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_number: Option<String>,
    pub status: TransactionStatus,
    #[serde(default)]
    pub resources: BTreeMap<String, TransactionResource>,
    #[serde(default)]
    pub links: TransactionLinks,
}

impl Transaction {
    pub fn company_accounts_uri(&self, company_accounts_id: &str) -> String {
        format!(
            "/transactions/{}/company-accounts/{}",
            self.id, company_accounts_id
        )
    }

    pub fn has_resource(&self, uri: &str) -> bool {
        self.resources.contains_key(uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationType {
    #[serde(rename = "json-path")]
    JsonPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "ch:validation")]
    Validation,
    #[serde(rename = "ch:service")]
    Service,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub error: String,
    pub location: String,
    pub location_type: LocationType,
    #[serde(rename = "type")]
    pub error_type: ErrorType,
}

impl ValidationError {
    pub fn validation(error: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            location: location.into(),
            location_type: LocationType::JsonPath,
            error_type: ErrorType::Validation,
        }
    }
}

/// Ordered collection of validation errors. Insertion order is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Errors {
    errors: Vec<ValidationError>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn contains_error(&self, error: &ValidationError) -> bool {
        self.errors.contains(error)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }
}

impl From<Vec<ValidationError>> for Errors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// A company-accounts or accounts-type resource served by the accounts data API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsResource {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

impl AccountsResource {
    pub fn link(&self, name: &str) -> Option<&str> {
        self.links
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStatusResponse {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl From<Errors> for ValidationStatusResponse {
    fn from(errors: Errors) -> Self {
        let errors = errors.into_vec();
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}
