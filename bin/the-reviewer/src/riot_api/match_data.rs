use super::{regional_route, MatchSource, RiotId};
use crate::config::RiotConfig;
use crate::error::ReviewError;
use async_trait::async_trait;
use riven::consts::RegionalRoute;
use riven::{RiotApi, RiotApiConfig, RiotApiError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use the_reviewer_analysis::MatchRecord;
use tracing::debug;

/// Match-v5 and account-v1 is all the reviewer needs from the Riot API.
pub struct RiotMatchFetcher {
    riot_api: Arc<RiotApi>,
    route: RegionalRoute,
    timeout: Duration,
}

impl std::fmt::Debug for RiotMatchFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiotMatchFetcher")
            .field("route", &self.route)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RiotMatchFetcher {
    pub fn new(riot_api: Arc<RiotApi>, route: RegionalRoute, timeout: Duration) -> Self {
        Self {
            riot_api,
            route,
            timeout,
        }
    }

    /// Rate limiting is left to riven. Retries default to 0 so that a 429 reaches
    /// the caller with its `Retry-After` hint instead of being retried here.
    pub fn from_config(config: &RiotConfig) -> Result<Self, ReviewError> {
        let route = regional_route(&config.region)?;
        let api_config = RiotApiConfig::with_key(&config.api_key).set_retries(config.retries);
        Ok(Self::new(
            Arc::new(RiotApi::new(api_config)),
            route,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    async fn timed<T>(
        &self,
        call: impl Future<Output = riven::Result<T>>,
    ) -> Result<T, ReviewError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(map_riot_error),
            Err(_) => Err(ReviewError::TransportError(format!(
                "Riot API did not answer within {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl MatchSource for RiotMatchFetcher {
    async fn fetch_match(&self, match_id: &str) -> Result<MatchRecord, ReviewError> {
        let data = self
            .timed(self.riot_api.match_v5().get_match(self.route, match_id))
            .await?
            .ok_or_else(|| ReviewError::NotFound(format!("match {match_id}")))?;
        debug!("Fetched match data: {:?}", data.metadata.match_id);

        // Go through the JSON form so every source is validated the same way
        let value =
            serde_json::to_value(&data).map_err(|e| ReviewError::InvalidResponse(e.to_string()))?;
        MatchRecord::from_riot_value(value).map_err(|e| ReviewError::ValidationError(e.to_string()))
    }

    async fn recent_match_ids(
        &self,
        riot_id: &str,
        count: u32,
    ) -> Result<Vec<String>, ReviewError> {
        let riot_id: RiotId = riot_id.parse()?;
        let account = self
            .timed(self.riot_api.account_v1().get_by_riot_id(
                self.route,
                &riot_id.game_name,
                &riot_id.tag_line,
            ))
            .await?
            .ok_or_else(|| ReviewError::NotFound(format!("account {riot_id}")))?;
        debug!("Resolved {riot_id} to {}", account.puuid);

        // match-v5 serves at most 100 ids per page
        let count = count.clamp(1, 100) as i32;
        self.timed(self.riot_api.match_v5().get_match_ids_by_puuid(
            self.route,
            &account.puuid,
            Some(count),
            None,
            None,
            None,
            None,
            None,
        ))
        .await
    }
}

fn map_riot_error(error: RiotApiError) -> ReviewError {
    match error.status_code().map(|status| status.as_u16()) {
        Some(404) => ReviewError::NotFound(error.to_string()),
        Some(429) => ReviewError::RateLimited {
            retry_after: retry_after(&error),
        },
        Some(status) if (200..300).contains(&status) => {
            ReviewError::InvalidResponse(error.to_string())
        }
        _ => ReviewError::TransportError(error.to_string()),
    }
}

fn retry_after(error: &RiotApiError) -> Option<Duration> {
    error
        .response()?
        .headers()
        .get("retry-after")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}
