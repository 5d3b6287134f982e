use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::FactorSource;
use crate::core::factors::parse_rows;
use crate::core::{Currency, FactorTable, FlightControl, FxError, FxResult, LoadCallback};

/// Quote symbols look like `EURUSD=X`; the pair suffix is dropped before lookup.
const QUOTE_SUFFIX_LEN: usize = 5;

/// Fetches quotes for every priced currency from a CSV quote service.
pub struct RemoteSource {
    base_url: String,
    client: reqwest::Client,
    flight: FlightControl,
}

impl RemoteSource {
    pub const DEFAULT_BASE_URL: &'static str = "http://finance.yahoo.com";

    pub fn new(base_url: &str) -> FxResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxmoney/0.1")
            .build()
            .map_err(FxError::load_failed)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            flight: FlightControl::new("remote"),
        })
    }

    /// The quote request covering every priced currency against the pivot.
    pub fn quotes_url(&self) -> String {
        let symbols = Currency::priced()
            .map(|c| format!("{c}{}=X", Currency::PIVOT))
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/d/quotes.csv?s={symbols}&f=sl1d1t1c1ohgv&e=.csv",
            self.base_url
        )
    }

    #[instrument(name = "RemoteFactorFetch", skip(self), fields(base_url = %self.base_url))]
    async fn fetch(&self) -> FxResult<FactorTable> {
        let url = self.quotes_url();
        debug!("Requesting quotes from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FxError::load_failed(format!("Request error: {e} URL: {url}")))?;

        if !response.status().is_success() {
            return Err(FxError::load_failed(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response.bytes().await.map_err(FxError::load_failed)?;
        Ok(parse_rows(&body, QUOTE_SUFFIX_LEN))
    }
}

#[async_trait]
impl FactorSource for RemoteSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn load(&self) -> FxResult<FactorTable> {
        let flight = self.flight.begin()?;
        flight.run(self.fetch()).await
    }

    fn load_async(self: Arc<Self>, on_done: LoadCallback) -> FxResult<()> {
        let flight = self.flight.begin()?;
        flight.spawn(async move { self.fetch().await }, on_done)
    }

    fn cancel(&self) {
        self.flight.cancel();
    }

    fn dispose(&self) {
        self.flight.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const QUOTES: &str = "\"EURUSD=X\",1.4,\"6/1/2011\",\"4:50pm\",+0.01\n\"UAHUSD=X\",0.2,\"6/1/2011\"\n\"JPYUSD=X\",N/A\n";

    #[test]
    fn test_quotes_url_lists_priced_currencies() {
        let source = RemoteSource::new("http://quotes.local/").unwrap();
        let url = source.quotes_url();
        assert!(url.starts_with("http://quotes.local/d/quotes.csv?s=EURUSD=X,GBPUSD=X,"));
        assert!(url.ends_with("&f=sl1d1t1c1ohgv&e=.csv"));
        assert!(!url.contains("USDUSD=X"));
        assert!(!url.contains("XXX"));
    }

    #[tokio::test]
    async fn test_load_parses_quotes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/d/quotes.csv"))
            .and(query_param("f", "sl1d1t1c1ohgv"))
            .respond_with(ResponseTemplate::new(200).set_body_string(QUOTES))
            .mount(&server)
            .await;

        let source = RemoteSource::new(&server.uri()).unwrap();
        let table = source.load().await.unwrap();

        assert_eq!(table.get(Currency::Eur), dec!(1.4));
        assert_eq!(table.get(Currency::Uah), dec!(0.2));
        assert_eq!(table.get(Currency::Jpy), Decimal::ONE);
    }

    #[tokio::test]
    async fn test_http_error_is_source_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/d/quotes.csv"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let source = RemoteSource::new(&server.uri()).unwrap();
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, FxError::Source(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_second_concurrent_load_is_rejected_then_cancel_reports_cancelled() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/d/quotes.csv"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(QUOTES)
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let source = Arc::new(RemoteSource::new(&server.uri()).unwrap());
        let (tx, rx) = tokio::sync::oneshot::channel();
        Arc::clone(&source)
            .load_async(Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }))
            .unwrap();

        assert!(matches!(
            source.load().await,
            Err(FxError::ConcurrencyViolation(_))
        ));

        source.cancel();
        assert_eq!(rx.await.unwrap(), crate::core::LoadOutcome::Cancelled);
    }
}
