//! Paystack transaction API client.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha512;
use uuid::Uuid;

use crate::config::PaystackConfig;
use crate::domain::payment::{LineItem, PaymentConfirmation, PaymentStatus};
use crate::error::{Error, Result};

type HmacSha512 = Hmac<Sha512>;

/// Converts a major-unit amount (naira) into provider minor units (kobo).
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation("Amount must be positive"));
    }
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| Error::validation("Amount is too large"))
}

#[derive(Clone, Debug)]
pub struct InitializePayment {
    pub email: String,
    pub amount: Decimal,
    pub user_id: Uuid,
    pub line_items: Vec<LineItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentSession {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn initialize(&self, request: InitializePayment) -> Result<PaymentSession>;
    async fn verify(&self, reference: &str) -> Result<PaymentConfirmation>;
    /// Checks the `x-paystack-signature` header against the raw webhook body.
    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool;
}

/// Metadata attached at initialization and echoed back on verification.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckoutMetadata {
    #[serde(default)]
    user_id: Option<Uuid>,
    #[serde(default)]
    items: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub struct Transaction {
    pub reference: String,
    pub status: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub customer: Option<Customer>,
}

#[derive(Debug, Deserialize)]
pub struct Customer {
    pub email: Option<String>,
}

/// Webhook delivery body.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: Transaction,
}

impl Transaction {
    pub fn into_confirmation(self) -> PaymentConfirmation {
        let metadata = parse_metadata(self.metadata);
        PaymentConfirmation {
            reference: self.reference,
            status: PaymentStatus::from_provider(&self.status),
            amount: self.amount,
            email: self.customer.and_then(|c| c.email),
            user_id: metadata.user_id,
            line_items: metadata.items,
        }
    }
}

/// Paystack sends metadata back as an object, or as a JSON-encoded string.
fn parse_metadata(value: serde_json::Value) -> CheckoutMetadata {
    let value = match value {
        serde_json::Value::Null => return CheckoutMetadata::default(),
        serde_json::Value::String(s) => serde_json::from_str(&s).unwrap_or_default(),
        other => other,
    };
    serde_json::from_value(value).unwrap_or_else(|error| {
        tracing::warn!(%error, "payment metadata carries no usable line items");
        CheckoutMetadata::default()
    })
}

/// Paystack references are made of alphanumerics and `-`, `.`, `=`, `_`.
fn check_reference(reference: &str) -> Result<()> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '=' | '_');
    if reference.is_empty() || reference.chars().all(|c| c == '.') || !reference.chars().all(allowed) {
        return Err(Error::validation("Invalid payment reference"));
    }
    Ok(())
}

pub struct PaystackClient {
    http: reqwest::Client,
    secret_key: SecretString,
    base_url: String,
}

impl PaystackClient {
    pub fn new(config: &PaystackConfig) -> Self {
        Self { http: reqwest::Client::new(), secret_key: config.secret_key.clone(), base_url: config.base_url.clone() }
    }

    /// `base_url` with `segments` appended, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| Error::ExternalService(format!("Invalid Paystack base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| Error::ExternalService("Invalid Paystack base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn unwrap_envelope<T: serde::de::DeserializeOwned>(response: reqwest::Response, action: &str) -> Result<T> {
        let status = response.status();
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| Error::ExternalService(format!("Paystack {action} returned an unreadable body: {e}")))?;
        match envelope.data {
            Some(data) if status.is_success() && envelope.status => Ok(data),
            _ => Err(Error::ExternalService(format!("Paystack {action} failed: {}", envelope.message))),
        }
    }
}

#[async_trait]
impl PaymentProvider for PaystackClient {
    async fn initialize(&self, request: InitializePayment) -> Result<PaymentSession> {
        let amount = to_minor_units(request.amount)?;
        let metadata = CheckoutMetadata { user_id: Some(request.user_id), items: request.line_items };
        let body = serde_json::json!({ "email": request.email, "amount": amount, "metadata": metadata });
        let response = self
            .http
            .post(self.endpoint(&["transaction", "initialize"])?)
            .bearer_auth(self.secret_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        Self::unwrap_envelope(response, "initialize").await
    }

    async fn verify(&self, reference: &str) -> Result<PaymentConfirmation> {
        check_reference(reference)?;
        let response = self
            .http
            .get(self.endpoint(&["transaction", "verify", reference])?)
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await?;
        let transaction: Transaction = Self::unwrap_envelope(response, "verify").await?;
        Ok(transaction.into_confirmation())
    }

    fn verify_webhook_signature(&self, body: &[u8], signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else { return false };
        let Ok(mut mac) = HmacSha512::new_from_slice(self.secret_key.expose_secret().as_bytes()) else { return false };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}
