//! Federation registry HTTP client
//!
//! One signed GET per lookup, no retries, no caching. The raw body is
//! handed to [`crate::mapper`] whatever the status code: the registry
//! reports most problems inside an XML document, and anything else fails
//! to parse.

use std::time::Duration;

use url::form_urlencoded;

use crate::config::RegistryConfig;
use crate::mapper::{map_player, PlayerRecord};
use crate::signer::{SessionId, SignedParams, Signer};
use crate::{Error, LookupError, Result};

const USER_AGENT: &str = concat!("fftt-licence/", env!("CARGO_PKG_VERSION"));

/// Form-encode the signed fields followed by the business parameters
///
/// # Examples
///
/// ```
/// use fftt_common::signer::SignedParams;
/// use fftt_common::client::build_query;
///
/// let signed = SignedParams {
///     id: "SW001".into(),
///     serie: "ABCDEFGHIJKLMNO".into(),
///     tm: "20240102030405678".into(),
///     tmc: "abc".into(),
/// };
/// let query = build_query(&signed, &[("licence", "75 12")]);
/// assert_eq!(
///     query,
///     "id=SW001&serie=ABCDEFGHIJKLMNO&tm=20240102030405678&tmc=abc&licence=75+12"
/// );
/// ```
pub fn build_query(signed: &SignedParams, business: &[(&str, &str)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(signed.pairs())
        .extend_pairs(business.iter().copied())
        .finish()
}

/// `{base_url}/{endpoint}?{query}`, tolerating stray slashes
pub fn request_url(base_url: &str, endpoint: &str, query: &str) -> String {
    format!(
        "{}/{}?{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/'),
        query
    )
}

/// Registry client
///
/// Built once at startup; holds the session identifier for the whole
/// process lifetime.
#[derive(Debug)]
pub struct RegistryClient {
    http_client: reqwest::Client,
    signer: Signer,
    base_url: String,
    licence_endpoint: String,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig, session: SessionId) -> Result<Self> {
        let http_client = build_http_client(config.timeout)?;

        Ok(Self {
            http_client,
            signer: Signer::new(config.app_id.clone(), config.secret.clone(), session),
            base_url: config.base_url.clone(),
            licence_endpoint: config.licence_endpoint.clone(),
        })
    }

    pub fn session(&self) -> &SessionId {
        self.signer.session()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one signed call and return the raw body
    pub async fn fetch(
        &self,
        endpoint: &str,
        business: &[(&str, &str)],
    ) -> std::result::Result<String, LookupError> {
        let signed = self.signer.credentials();
        let url = request_url(&self.base_url, endpoint, &build_query(&signed, business));

        tracing::debug!(endpoint = %endpoint, tm = %signed.tm, "Querying registry");

        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                endpoint = %endpoint,
                status = status.as_u16(),
                "Registry answered with non-success status"
            );
        }

        Ok(response.text().await?)
    }

    /// Look up one player by licence number
    pub async fn lookup_licence(
        &self,
        licence: &str,
    ) -> std::result::Result<PlayerRecord, LookupError> {
        let body = self
            .fetch(&self.licence_endpoint, &[("licence", licence)])
            .await?;

        let record = map_player(&body, licence)?;

        tracing::info!(
            licence = %licence,
            nom = %record.surname,
            club = %record.club,
            "Retrieved licence from registry"
        );

        Ok(record)
    }
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::HttpClient(e.to_string()))
}
