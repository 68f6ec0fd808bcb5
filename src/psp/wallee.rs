use super::{EntityQuery, PaymentMethodConfiguration, ProviderApi, ProviderError, Refund, RefundCreate, Transaction};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha512;
use std::time::Duration;

type HmacSha512 = Hmac<Sha512>;

pub const DEFAULT_BASE_URL: &str = "https://app-wallee.com/api";
const MAC_VERSION: &str = "1";

pub struct WalleeProvider {
    user_id: i64,
    api_secret: String,
    base_url: String,
    client: reqwest::Client,
}

impl WalleeProvider {
    pub fn new(user_id: i64, api_secret: String, base_url: Option<String>) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        Ok(Self {
            user_id,
            api_secret,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            client,
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ProviderError> {
        Url::parse_with_params(&format!("{}{}", self.base_url, path), query)
            .map_err(|e| ProviderError::Protocol(format!("invalid request url: {e}")))
    }

    async fn send<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, ProviderError> {
        let timestamp = chrono::Utc::now().timestamp();
        let resource = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let mac = mac_value(&self.api_secret, self.user_id, timestamp, method.as_str(), &resource)?;

        let mut request = self
            .client
            .request(method, url)
            .header("Accept", "application/json")
            .header("x-mac-version", MAC_VERSION)
            .header("x-mac-userid", self.user_id.to_string())
            .header("x-mac-timestamp", timestamp.to_string())
            .header("x-mac-value", mac);
        if let Some(body) = body {
            request = request.json(body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::Api {
                status_code: status.as_u16(),
                message: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| ProviderError::Protocol(e.to_string()))
    }
}

/// Computes the `x-mac-value` header: HMAC-SHA512 keyed with the base64-decoded
/// secret over `version|user|timestamp|METHOD|path?query`.
pub fn mac_value(
    api_secret: &str,
    user_id: i64,
    timestamp: i64,
    method: &str,
    resource: &str,
) -> Result<String, ProviderError> {
    let key = STANDARD
        .decode(api_secret)
        .map_err(|e| ProviderError::Protocol(format!("api secret is not base64: {e}")))?;
    let mut mac = HmacSha512::new_from_slice(&key)
        .map_err(|e| ProviderError::Protocol(e.to_string()))?;

    let securing = format!("{MAC_VERSION}|{user_id}|{timestamp}|{}|{resource}", method.to_uppercase());
    mac.update(securing.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl ProviderApi for WalleeProvider {
    fn name(&self) -> &str {
        "Wallee"
    }

    async fn search_payment_method_configurations(
        &self,
        space_id: i64,
        query: &EntityQuery,
    ) -> Result<Vec<PaymentMethodConfiguration>, ProviderError> {
        let url = self.url(
            "/payment-method-configuration/search",
            &[("spaceId", space_id.to_string())],
        )?;
        let configurations: Vec<PaymentMethodConfiguration> =
            self.send(Method::POST, url, Some(query)).await?;

        tracing::debug!(
            space_id,
            count = configurations.len(),
            "Fetched payment method configurations"
        );
        Ok(configurations)
    }

    async fn submit_refund(&self, space_id: i64, refund: &RefundCreate) -> Result<Refund, ProviderError> {
        let url = self.url("/refund/refund", &[("spaceId", space_id.to_string())])?;
        self.send(Method::POST, url, Some(refund)).await
    }

    async fn read_transaction(&self, space_id: i64, transaction_id: i64) -> Result<Transaction, ProviderError> {
        let url = self.url(
            "/transaction/read",
            &[("spaceId", space_id.to_string()), ("id", transaction_id.to_string())],
        )?;
        self.send::<Transaction, ()>(Method::GET, url, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_matches_known_vector() {
        let mac = mac_value(
            "c2VjcmV0LWtleQ==",
            512,
            1700000000,
            "post",
            "/api/refund/refund?spaceId=405",
        )
        .unwrap();
        assert_eq!(mac, "UzdTBlYLjNBslnIZArS7LL81tJ3Z+DQ6BnFzRmkGnzhshxclM3R1ehnlEIskMiriWdJSJ4TBMiyr7bF/2h8TSA==");
    }

    #[test]
    fn mac_rejects_non_base64_secret() {
        let err = mac_value("not base64!", 1, 0, "GET", "/api").unwrap_err();
        assert!(matches!(err, ProviderError::Protocol(_)));
    }

    #[test]
    fn url_carries_space_query() {
        let provider = WalleeProvider::new(1, "c2VjcmV0".to_string(), Some("https://example.test/api/".to_string())).unwrap();
        let url = provider
            .url("/transaction/read", &[("spaceId", "3".to_string()), ("id", "44".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/api/transaction/read");
        assert_eq!(url.query(), Some("spaceId=3&id=44"));
    }
}
