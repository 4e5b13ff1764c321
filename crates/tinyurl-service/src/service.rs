use crate::error::{Result, UrlServiceError};
use crate::strategy::IdStrategy;
use async_trait::async_trait;
use jiff::civil::{Date, DateTime};
use jiff::tz::TimeZone;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tinyurl_core::{
    merge_query, DomainRegistry, NewUrl, ReadRepository, ShortCode, UrlRepository,
};
use tinyurl_snowflake::{Clock, SystemClock};
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;
use url::Url;

/// Parameters for minting a short URL.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
pub struct GenerateRequest {
    /// The original URL to be shortened.
    #[builder(setter(into))]
    pub origin_url: String,
    /// A registered domain, including its trailing separator (`t.ly/`).
    #[builder(setter(into))]
    pub domain: String,
    /// Optional expiry; an RFC 3339 timestamp, a UTC civil datetime
    /// (`2030-01-02 03:04:05`) or a UTC date (`2030-01-02`).
    #[builder(default, setter(strip_option, into))]
    pub expire_date: Option<String>,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Mints a short URL, `<domain><code>`, for the request.
    async fn generate(&self, request: GenerateRequest) -> Result<String>;

    /// Resolves a short code to the original URL.
    async fn resolve(&self, short_code: &str) -> Result<String>;

    /// Resolves a short code and appends the incoming query parameters.
    async fn redirect_url(&self, short_code: &str, query: &[(String, String)]) -> Result<String> {
        let origin_url = self.resolve(short_code).await?;
        Ok(merge_query(&origin_url, query))
    }
}

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps a `UrlRepository`, a `DomainRegistry` and an
/// [`IdStrategy`] to handle:
/// - Domain validation
/// - Expire date parsing
/// - Id assignment and base62 encoding
/// - Expiry enforcement on resolve
pub struct UrlService<R, D, C: Clock = SystemClock> {
    repository: Arc<R>,
    domains: Arc<D>,
    strategy: IdStrategy<C>,
}

impl<R: UrlRepository, D: DomainRegistry, C: Clock + 'static> UrlService<R, D, C> {
    pub fn new(repository: Arc<R>, domains: Arc<D>, strategy: IdStrategy<C>) -> Self {
        Self {
            repository,
            domains,
            strategy,
        }
    }

    pub fn strategy(&self) -> &IdStrategy<C> {
        &self.strategy
    }

    /// Validates that the URL is an absolute `http`/`https` URL with a host.
    fn validate_url(url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(UrlServiceError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }

        // The parser forgives `https:///host`, so the authority must be
        // present in the input itself.
        let authority_present = url
            .split_once("://")
            .and_then(|(_, rest)| rest.chars().next())
            .is_some_and(|c| !matches!(c, '/' | '\\' | '?' | '#') && !c.is_whitespace());
        if !authority_present {
            return Err(UrlServiceError::InvalidUrl(format!(
                "URL must have a valid scheme and host: {url}"
            )));
        }

        let parsed = Url::parse(url)
            .map_err(|e| UrlServiceError::InvalidUrl(format!("{url}: {e}")))?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(UrlServiceError::InvalidUrl(format!(
                "URL scheme must be http or https: {scheme}"
            )));
        }

        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(UrlServiceError::InvalidUrl(format!(
                "URL must have a host: {url}"
            )));
        }

        Ok(())
    }
}

/// Parses an expire date, trying the accepted formats from the most to the
/// least specific. Dates without an offset are taken as UTC.
pub fn parse_expire_date(input: &str) -> Result<Timestamp> {
    let invalid = |reason: jiff::Error| UrlServiceError::InvalidExpireDate {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if let Ok(timestamp) = input.parse::<Timestamp>() {
        return Ok(timestamp);
    }
    if let Ok(datetime) = input.parse::<DateTime>() {
        return datetime
            .to_zoned(TimeZone::UTC)
            .map(|zoned| zoned.timestamp())
            .map_err(invalid);
    }
    input
        .parse::<Date>()
        .and_then(|date| date.to_zoned(TimeZone::UTC))
        .map(|zoned| zoned.timestamp())
        .map_err(invalid)
}

#[async_trait]
impl<R: UrlRepository, D: DomainRegistry, C: Clock + 'static> Shortener for UrlService<R, D, C> {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let GenerateRequest {
            origin_url,
            domain,
            expire_date,
        } = request;

        let Some(domain_id) = self.domains.lookup(&domain).await? else {
            warn!(domain = %domain, "rejecting unregistered domain");
            return Err(UrlServiceError::DomainNotFound(domain));
        };

        Self::validate_url(&origin_url)?;

        let expire_time = expire_date
            .as_deref()
            .filter(|date| !date.is_empty())
            .map(parse_expire_date)
            .transpose()?;

        let url = NewUrl {
            origin_url,
            create_time: Timestamp::now(),
            expire_time,
            domain,
        };
        let domain = url.domain.clone();

        let id = self.strategy.insert(self.repository.as_ref(), url).await?;
        let code = ShortCode::from_id(id);

        info!(
            id,
            code = %code,
            domain = %domain,
            domain_id,
            strategy = %self.strategy,
            "minted short url"
        );
        Ok(code.to_url(&domain))
    }

    async fn resolve(&self, short_code: &str) -> Result<String> {
        trace!(code = short_code, "resolving short code");

        let code = ShortCode::parse(short_code)?;

        let Some(record) = self.repository.get_by_id(code.id()).await? else {
            debug!(code = %code, id = code.id(), "short code not found");
            return Err(UrlServiceError::RecordNotFound(code.to_string()));
        };

        if let Some(expire_time) = record.expire_time {
            if Timestamp::now() >= expire_time {
                debug!(code = %code, %expire_time, "record has expired");
                return Err(UrlServiceError::RecordExpired {
                    code: code.to_string(),
                    expire_time,
                });
            }
        }

        debug!(code = %code, url = %record.origin_url, "resolved short code");
        Ok(record.origin_url)
    }
}
