// Rust guideline compliant 2026-10-16

//! Stripe REST adapter for the `ChargeSource`, `InvoiceSource` and
//! `InvoiceMutator` ports.
//!
//! Listings follow `starting_after` cursors up to a page cap; when the cap
//! cuts a listing short the returned [`Page`] carries `has_more = true` so the
//! caller knows the data is incomplete. Provider error bodies are decoded to
//! keep the failure kind on due-date updates.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::{
    Charge, ChargeSource, ChargeStatus, DayRange, Invoice, InvoiceMutator, InvoiceSource, Page,
    SourceError, UpdateError,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Items requested per listing call (provider maximum).
const PAGE_LIMIT: u32 = 100;

/// Default bound on listing calls per port invocation.
pub const DEFAULT_MAX_PAGES: u32 = 10;

/// Error code the provider returns when an invoice can no longer be edited.
const NOT_EDITABLE_CODE: &str = "invoice_not_editable";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct List<T> {
    data: Vec<T>,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct WireCharge {
    id: String,
    amount: i64,
    currency: String,
    status: String,
    created: i64,
}

#[derive(Debug, Deserialize)]
struct WireInvoice {
    id: String,
    amount_due: i64,
    currency: String,
    #[serde(default)]
    customer: Option<String>,
    created: i64,
    #[serde(default)]
    due_date: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct WireError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: WireError,
}

/// Listed objects expose their id for cursor pagination.
trait Listed {
    fn id(&self) -> &str;
}

impl Listed for WireCharge {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Listed for WireInvoice {
    fn id(&self) -> &str {
        &self.id
    }
}

fn timestamp(field: &str, secs: i64) -> Result<DateTime<Utc>, SourceError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| SourceError::Malformed { reason: format!("{field} {secs} is not a valid timestamp") })
}

impl TryFrom<WireCharge> for Charge {
    type Error = SourceError;

    fn try_from(wire: WireCharge) -> Result<Self, Self::Error> {
        Ok(Self {
            created_at: timestamp("charge.created", wire.created)?,
            status: ChargeStatus::from_provider(&wire.status),
            id: wire.id,
            amount_minor: wire.amount,
            currency: wire.currency,
        })
    }
}

impl TryFrom<WireInvoice> for Invoice {
    type Error = SourceError;

    fn try_from(wire: WireInvoice) -> Result<Self, Self::Error> {
        Ok(Self {
            created_at: timestamp("invoice.created", wire.created)?,
            due_date: wire.due_date.map(|d| timestamp("invoice.due_date", d)).transpose()?,
            id: wire.id,
            amount_due_minor: wire.amount_due,
            currency: wire.currency,
            customer_ref: wire.customer,
        })
    }
}

/// Decode a provider error body; falls back to the raw text.
fn error_details(body: &str) -> WireError {
    serde_json::from_str::<ErrorEnvelope>(body).map_or_else(
        |_| WireError { code: None, message: Some(body.to_owned()).filter(|b| !b.is_empty()) },
        |envelope| envelope.error,
    )
}

// ---------------------------------------------------------------------------
// StripeClient
// ---------------------------------------------------------------------------

/// HTTP client for the provider REST API.
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
    max_pages: u32,
}

impl fmt::Debug for StripeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeClient")
            .field("api_base", &self.api_base)
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

impl StripeClient {
    /// Create a client for `api_base` (e.g. `https://api.stripe.com`).
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` when the TLS backend cannot be initialised.
    pub fn new(api_base: &str, secret_key: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("invoice-delay/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_owned(),
            secret_key: secret_key.to_owned(),
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    /// Override the page cap (minimum 1).
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Fetch up to `max_pages` pages of `path`, following cursors.
    async fn list_all<W>(&self, path: &str, filters: &[(&str, String)]) -> Result<Page<W>, SourceError>
    where
        W: DeserializeOwned + Listed,
    {
        let url = format!("{}{path}", self.api_base);
        let mut items: Vec<W> = vec![];
        let mut cursor: Option<String> = None;

        for page_no in 1..=self.max_pages {
            let mut query: Vec<(&str, String)> = filters.to_vec();
            query.push(("limit", PAGE_LIMIT.to_string()));
            if let Some(after) = &cursor {
                query.push(("starting_after", after.clone()));
            }

            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.secret_key)
                .query(&query)
                .send()
                .await
                .map_err(|e| SourceError::Unavailable { reason: e.to_string() })?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                return Err(SourceError::Unauthorized);
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let details = error_details(&body);
                return Err(SourceError::Rejected {
                    status: status.as_u16(),
                    reason: details.message.unwrap_or_else(|| status.to_string()),
                });
            }

            let list: List<W> = response
                .json()
                .await
                .map_err(|e| SourceError::Malformed { reason: e.to_string() })?;
            tracing::debug!(path, page_no, fetched = list.data.len(), has_more = list.has_more, "stripe.list.page");

            if !list.has_more {
                items.extend(list.data);
                return Ok(Page { items, has_more: false });
            }
            // A continuation without a last id has no cursor to follow.
            let Some(last) = list.data.last() else {
                return Err(SourceError::Malformed { reason: format!("{path}: has_more with empty data") });
            };
            cursor = Some(last.id().to_owned());
            items.extend(list.data);
        }

        tracing::warn!(path, max_pages = self.max_pages, fetched = items.len(), "stripe.list.page_cap_reached");
        Ok(Page { items, has_more: true })
    }
}

impl StripeClient {
    /// `/v1/invoices/<id>` with the id percent-encoded as one path segment.
    fn invoice_url(&self, invoice_id: &str) -> Result<reqwest::Url, UpdateError> {
        let mut url = reqwest::Url::parse(&format!("{}/v1/invoices", self.api_base))
            .map_err(|e| UpdateError::Transport { reason: format!("invalid api base: {e}") })?;
        url.path_segments_mut()
            .map_err(|()| UpdateError::Transport { reason: format!("{} cannot take a path", self.api_base) })?
            .push(invoice_id);
        Ok(url)
    }
}

impl ChargeSource for StripeClient {
    async fn list_charges(&self, range: &DayRange) -> Result<Page<Charge>, SourceError> {
        let filters = [
            ("created[gte]", range.start.to_string()),
            ("created[lte]", range.end.to_string()),
        ];
        let page = self.list_all::<WireCharge>("/v1/charges", &filters).await?;
        let items = page.items.into_iter().map(Charge::try_from).collect::<Result<Vec<_>, _>>()?;
        Ok(Page { items, has_more: page.has_more })
    }
}

impl InvoiceSource for StripeClient {
    async fn list_open_invoices(&self) -> Result<Page<Invoice>, SourceError> {
        let filters = [("status", "open".to_owned())];
        let page = self.list_all::<WireInvoice>("/v1/invoices", &filters).await?;
        let items = page.items.into_iter().map(Invoice::try_from).collect::<Result<Vec<_>, _>>()?;
        Ok(Page { items, has_more: page.has_more })
    }
}

impl InvoiceMutator for StripeClient {
    async fn update_due_date(&self, invoice_id: &str, due_at: DateTime<Utc>) -> Result<(), UpdateError> {
        let url = self.invoice_url(invoice_id)?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.secret_key)
            .form(&[("due_date", due_at.timestamp().to_string())])
            .send()
            .await
            .map_err(|e| UpdateError::Transport { reason: e.to_string() })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        let details = error_details(&body);
        let reason = details.message.clone().unwrap_or_else(|| status.to_string());
        Err(match status {
            StatusCode::NOT_FOUND => UpdateError::NotFound { reason },
            StatusCode::TOO_MANY_REQUESTS => UpdateError::RateLimited,
            _ if details.code.as_deref() == Some(NOT_EDITABLE_CODE) => UpdateError::InvalidState { reason },
            _ => UpdateError::Rejected { status: status.as_u16(), reason },
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::StripeClient;
    use chrono::{TimeZone as _, Utc};
    use domain::{
        ChargeSource as _, ChargeStatus, DayRange, InvoiceMutator as _, InvoiceSource as _,
        SourceError, UpdateError,
    };
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> StripeClient {
        StripeClient::new(&server.uri(), "sk_test_key").unwrap()
    }

    fn range() -> DayRange {
        DayRange {
            start: 1_772_481_600,
            end: 1_772_567_999,
            start_date: "2026-03-03".to_owned(),
            end_date: "2026-03-03".to_owned(),
        }
    }

    fn wire_charge(id: &str, amount: i64, status: &str) -> serde_json::Value {
        json!({ "id": id, "object": "charge", "amount": amount, "currency": "aed", "status": status, "created": 1_772_500_000 })
    }

    // ------------------------------------------------------------------
    // STR-T01: charge listing
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn charges_are_listed_for_day_range() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/charges"))
            .and(header("authorization", "Bearer sk_test_key"))
            .and(query_param("created[gte]", "1772481600"))
            .and(query_param("created[lte]", "1772567999"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [wire_charge("ch_1", 1250, "succeeded"), wire_charge("ch_2", 300, "failed")],
                "has_more": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).list_charges(&range()).await.unwrap();

        assert!(!page.has_more);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "ch_1");
        assert_eq!(page.items[0].amount_minor, 1250);
        assert_eq!(page.items[0].status, ChargeStatus::Succeeded);
        assert_eq!(page.items[1].status, ChargeStatus::Failed);
        assert_eq!(page.items[0].created_at, Utc.timestamp_opt(1_772_500_000, 0).unwrap());
    }

    #[tokio::test]
    async fn listing_follows_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/charges"))
            .and(query_param_is_missing("starting_after"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [wire_charge("ch_1", 100, "succeeded"), wire_charge("ch_2", 100, "succeeded")],
                "has_more": true
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/charges"))
            .and(query_param("starting_after", "ch_2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [wire_charge("ch_3", 100, "succeeded")],
                "has_more": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).list_charges(&range()).await.unwrap();

        let ids: Vec<&str> = page.items.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ch_1", "ch_2", "ch_3"]);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn page_cap_surfaces_has_more() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/charges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [wire_charge("ch_1", 100, "succeeded")],
                "has_more": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server).with_max_pages(1).list_charges(&range()).await.unwrap();

        assert_eq!(page.items.len(), 1);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn has_more_without_data_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/charges"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [], "has_more": true })))
            .mount(&server)
            .await;

        let result = client(&server).list_charges(&range()).await;
        assert!(matches!(result, Err(SourceError::Malformed { .. })), "{result:?}");
    }

    #[tokio::test]
    async fn unauthorized_listing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "type": "invalid_request_error", "message": "Invalid API Key provided" }
            })))
            .mount(&server)
            .await;

        let result = client(&server).list_charges(&range()).await;
        assert_eq!(result, Err(SourceError::Unauthorized));
    }

    #[tokio::test]
    async fn server_error_listing_is_rejected_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "type": "api_error", "message": "Something went wrong" }
            })))
            .mount(&server)
            .await;

        let result = client(&server).list_open_invoices().await;
        assert_eq!(
            result,
            Err(SourceError::Rejected { status: 500, reason: "Something went wrong".to_owned() })
        );
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let result = client(&server).list_charges(&range()).await;
        assert!(matches!(result, Err(SourceError::Malformed { .. })), "{result:?}");
    }

    // ------------------------------------------------------------------
    // STR-T02: invoice listing
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn open_invoices_are_listed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/invoices"))
            .and(query_param("status", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "id": "in_1", "amount_due": 5000, "currency": "aed", "customer": "cus_1",
                      "created": 1_772_400_000, "due_date": 1_772_600_000 },
                    { "id": "in_2", "amount_due": 700, "currency": "usd", "customer": null,
                      "created": 1_772_400_000, "due_date": null }
                ],
                "has_more": false
            })))
            .mount(&server)
            .await;

        let page = client(&server).list_open_invoices().await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].customer_ref.as_deref(), Some("cus_1"));
        assert_eq!(page.items[0].due_date, Some(Utc.timestamp_opt(1_772_600_000, 0).unwrap()));
        assert_eq!(page.items[1].due_date, None);
        assert_eq!(page.items[1].currency, "usd");
    }

    // ------------------------------------------------------------------
    // STR-T03: due-date update
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn update_posts_epoch_due_date() {
        let server = MockServer::start().await;
        let due = Utc.with_ymd_and_hms(2026, 3, 4, 8, 0, 0).unwrap();
        Mock::given(method("POST"))
            .and(path("/v1/invoices/in_1"))
            .and(header("authorization", "Bearer sk_test_key"))
            .and(body_string_contains(format!("due_date={}", due.timestamp())))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "in_1" })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).update_due_date("in_1", due).await.unwrap();
    }

    #[tokio::test]
    async fn update_errors_keep_their_kind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/invoices/in_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "code": "resource_missing", "message": "No such invoice: 'in_missing'" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/invoices/in_paid"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "invoice_not_editable", "message": "This invoice is paid" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/invoices/in_busy"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/invoices/in_bad"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": { "code": "parameter_invalid_integer", "message": "Invalid integer" }
            })))
            .mount(&server)
            .await;

        let stripe = client(&server);
        let due = Utc.with_ymd_and_hms(2026, 3, 4, 8, 0, 0).unwrap();

        assert_eq!(
            stripe.update_due_date("in_missing", due).await,
            Err(UpdateError::NotFound { reason: "No such invoice: 'in_missing'".to_owned() })
        );
        assert_eq!(
            stripe.update_due_date("in_paid", due).await,
            Err(UpdateError::InvalidState { reason: "This invoice is paid".to_owned() })
        );
        assert_eq!(stripe.update_due_date("in_busy", due).await, Err(UpdateError::RateLimited));
        assert_eq!(
            stripe.update_due_date("in_bad", due).await,
            Err(UpdateError::Rejected { status: 400, reason: "Invalid integer".to_owned() })
        );
    }

    #[tokio::test]
    async fn invoice_id_stays_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/invoices/in_1%2Fpay"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "in_1/pay" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/invoices/in_1/pay"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "in_1" })))
            .expect(0)
            .mount(&server)
            .await;

        let due = Utc.with_ymd_and_hms(2026, 3, 4, 8, 0, 0).unwrap();
        client(&server).update_due_date("in_1/pay", due).await.unwrap();
    }

    #[test]
    fn invoice_url_encodes_reserved_characters() {
        let stripe = StripeClient::new("https://api.stripe.com/", "sk_test_key").unwrap();
        let url = stripe.invoice_url("in_1/pay?x=1#y").unwrap();
        assert_eq!(url.as_str(), "https://api.stripe.com/v1/invoices/in_1%2Fpay%3Fx=1%23y");
        assert_eq!(url.query(), None);
    }

    #[tokio::test]
    async fn unreachable_provider_is_transport_error() {
        // Nothing listens on the discard port.
        let stripe = StripeClient::new("http://127.0.0.1:9", "sk_test_key").unwrap();
        let due = Utc.with_ymd_and_hms(2026, 3, 4, 8, 0, 0).unwrap();
        let result = stripe.update_due_date("in_1", due).await;
        assert!(matches!(result, Err(UpdateError::Transport { .. })), "{result:?}");
    }

    #[test]
    fn debug_hides_secret_key() {
        let stripe = StripeClient::new("https://api.stripe.com", "sk_live_secret").unwrap();
        assert!(!format!("{stripe:?}").contains("sk_live_secret"));
    }
}
