use std::{
    io::{self, Write},
    time::Duration,
};

use opensearch::{
    auth::Credentials,
    cert::CertificateValidation,
    http::{
        headers::{HeaderValue, ACCEPT_ENCODING},
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    CountParts, OpenSearch,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

mod config;
mod error;
pub use config::*;
pub use error::CountError;

/// Name of a search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub struct IndexName(&'static str);

impl IndexName {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

pub const EPIRECIPES_INDEX: IndexName = IndexName("epirecipes");

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds a client for the configured node. No request is sent.
pub fn get_client(config: &ConnectionConfig) -> Result<OpenSearch, CountError> {
    let url = config.url()?;
    let conn_pool = SingleNodeConnectionPool::new(url.clone());

    let mut builder = TransportBuilder::new(conn_pool)
        .auth(Credentials::Basic(
            config.username.clone(),
            config.password.clone(),
        ))
        .disable_proxy()
        .timeout(REQUEST_TIMEOUT);

    // The transport has no separate hostname switch; skipping certificate
    // validation skips the hostname check too.
    if !config.verify_certs {
        if config.ssl_show_warn {
            warn!(url = %url, "TLS certificate verification is disabled");
        } else {
            debug!(url = %url, "TLS certificate verification is disabled");
        }
        builder = builder.cert_validation(CertificateValidation::None);
    } else if !config.ssl_assert_hostname {
        warn!(
            url = %url,
            "Hostname is still checked while certificates are verified"
        );
    }

    let encoding = if config.http_compress { "gzip" } else { "identity" };
    builder = builder.header(ACCEPT_ENCODING, HeaderValue::from_static(encoding));

    let transport = builder
        .build()
        .map_err(|e| CountError::connection(e.to_string()))?;

    info!(
        url = %url,
        username = %config.username,
        compress = config.http_compress,
        "Created OpenSearch client"
    );

    Ok(OpenSearch::new(transport))
}

#[derive(Debug, Deserialize)]
struct CountBody {
    count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountResponse {
    pub count: u64,
    /// The response body exactly as returned by the service.
    pub raw: Value,
}

/// Counts every document in `index`.
///
/// ```bash
/// curl -k -u "$OPENSEARCH_USERNAME:$OPENSEARCH_PASSWORD" -XGET "https://$OPENSEARCH_HOST:$OPENSEARCH_PORT/epirecipes/_count?pretty"
/// ```
pub async fn count_documents(
    client: &OpenSearch,
    index: &IndexName,
) -> Result<CountResponse, CountError> {
    let start_time = Instant::now();

    let response = client
        .count(CountParts::Index(&[index.as_str()]))
        .send()
        .await?;

    let status = response.status_code();
    debug!(
        index = %index,
        status = status.as_u16(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "Count request finished"
    );

    if status == StatusCode::NOT_FOUND {
        return Err(CountError::IndexNotFound(index.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CountError::connection(format!(
            "count on {} failed with status {}: {}",
            index, status, body
        )));
    }

    let text = response.text().await?;
    let raw: Value = serde_json::from_str(&text)
        .map_err(|e| CountError::InvalidResponse(format!("{}: {}", e, text)))?;
    let body: CountBody = serde_json::from_value(raw.clone())
        .map_err(|e| CountError::InvalidResponse(format!("{}: {}", e, raw)))?;

    Ok(CountResponse {
        count: body.count,
        raw,
    })
}

pub fn summary_line(index: &IndexName, count: u64) -> String {
    format!("Total documents in {}: {}", index, count)
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Dump the raw count response before the summary line.
    pub print_raw: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { print_raw: true }
    }
}

/// Connects, counts the documents in [`EPIRECIPES_INDEX`] and writes the
/// report to `out`. Nothing is written once an error occurs.
pub async fn run<W: Write>(
    config: &ConnectionConfig,
    options: &ReportOptions,
    mut out: W,
) -> Result<u64, CountError> {
    let client = get_client(config)?;
    let response = count_documents(&client, &EPIRECIPES_INDEX).await?;

    if options.print_raw {
        serde_json::to_writer_pretty(&mut out, &response.raw).map_err(io::Error::from)?;
        writeln!(out)?;
    }
    writeln!(out, "{}", summary_line(&EPIRECIPES_INDEX, response.count))?;
    out.flush()?;

    Ok(response.count)
}
