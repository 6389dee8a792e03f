use crate::ai::{OpenAiClient, ReportGenerator};
use crate::config::Config;
use crate::error::ReviewError;
use crate::notify::{Notifier, WebhookNotifier};
use crate::riot_api::{MatchSource, RiotMatchFetcher};
use anyhow::Context as _;
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use the_reviewer_analysis::{AnalysisResult, MatchAnalyzer, MatchRecord, PromptGenerator};
use the_reviewer_db::model::{NewReview, ReviewStatus};
use the_reviewer_db::DbHandler;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Steps of a single review, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fetching,
    Analyzing,
    Prompting,
    Generating,
    Notifying,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetching => "fetching",
            Stage::Analyzing => "analyzing",
            Stage::Prompting => "prompting",
            Stage::Generating => "generating",
            Stage::Notifying => "notifying",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Done {
        match_id: String,
        result: AnalysisResult,
        /// Number of chat messages the review was split into
        messages: usize,
    },
    Failed {
        match_id: String,
        stage: Stage,
        error: ReviewError,
    },
    /// The review never ran to the end, its task died or no worker was left
    Aborted { match_id: String, reason: String },
}

impl RunOutcome {
    pub fn match_id(&self) -> &str {
        match self {
            RunOutcome::Done { match_id, .. }
            | RunOutcome::Failed { match_id, .. }
            | RunOutcome::Aborted { match_id, .. } => match_id,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, RunOutcome::Done { .. })
    }
}

impl Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Done {
                match_id,
                result,
                messages,
            } => {
                write!(f, "{match_id}: done, score {}/100", result.score)?;
                if result.flagged {
                    f.write_str(" (clamped)")?;
                }
                write!(f, ", {messages} message(s) sent")
            }
            RunOutcome::Failed {
                match_id,
                stage,
                error,
            } => write!(f, "{match_id}: failed at {stage} ({}): {error}", error.kind()),
            RunOutcome::Aborted { match_id, reason } => write!(f, "{match_id}: aborted: {reason}"),
        }
    }
}

type StageError = (Stage, ReviewError);

fn at(stage: Stage) -> impl FnOnce(ReviewError) -> StageError {
    move |error| (stage, error)
}

/// Runs matches through fetch, analysis, prompt, generation and delivery. A
/// failure ends the run it happened in and nothing else.
#[derive(Clone)]
pub struct Orchestrator {
    source: Arc<dyn MatchSource>,
    generator: Arc<dyn ReportGenerator>,
    notifier: Arc<dyn Notifier>,
    analyzer: MatchAnalyzer,
    prompts: PromptGenerator,
    store: Option<Arc<DbHandler>>,
    cache_ttl: Duration,
    /// Shared by every clone, so runs started from batches and from separate
    /// requests count against the same limit.
    permits: Arc<Semaphore>,
    workers: usize,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("analyzer", &self.analyzer)
            .field("prompts", &self.prompts)
            .field("store", &self.store.is_some())
            .field("workers", &self.workers)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn MatchSource>,
        generator: Arc<dyn ReportGenerator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            generator,
            notifier,
            analyzer: MatchAnalyzer::default(),
            prompts: PromptGenerator::default(),
            store: None,
            cache_ttl: Duration::from_secs(3600),
            permits: Arc::new(Semaphore::new(2)),
            workers: 2,
        }
    }

    /// Wire the production clients from configuration.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        info!("Setting up Riot API client");
        let source = RiotMatchFetcher::from_config(&config.riot)
            .context("Failed to set up the Riot API client")?;
        info!("Setting up AI client for {}", config.ai.model);
        let generator =
            OpenAiClient::new(&config.ai).context("Failed to set up the AI client")?;
        let notifier =
            WebhookNotifier::new(&config.webhook).context("Failed to set up the webhook")?;

        let mut orchestrator = Self::new(Arc::new(source), Arc::new(generator), Arc::new(notifier))
            .with_analyzer(MatchAnalyzer::new(config.scoring.clone()))
            .with_prompts(PromptGenerator::new(config.ai.language.clone()))
            .with_workers(config.batch.workers);

        if let Some(database_url) = &config.database_url {
            info!("Setting up DB client");
            let db_handler = DbHandler::connect(database_url)
                .await
                .context("Failed to connect to database")?;
            orchestrator = orchestrator.with_store(Arc::new(db_handler), config.cache_ttl());
        }
        Ok(orchestrator)
    }

    pub fn with_analyzer(mut self, analyzer: MatchAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_prompts(mut self, prompts: PromptGenerator) -> Self {
        self.prompts = prompts;
        self
    }

    /// Cache fetched matches and keep a history of runs.
    pub fn with_store(mut self, store: Arc<DbHandler>, cache_ttl: Duration) -> Self {
        self.store = Some(store);
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.permits = Arc::new(Semaphore::new(self.workers));
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Review a single match once a worker is free.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, match_id: &str) -> RunOutcome {
        let Ok(_permit) = self.permits.acquire().await else {
            return RunOutcome::Aborted {
                match_id: match_id.to_string(),
                reason: "worker pool closed".to_string(),
            };
        };

        let outcome = match self.pipeline(match_id).await {
            Ok((result, messages)) => {
                info!("Review of {match_id} delivered, score {}/100", result.score);
                RunOutcome::Done {
                    match_id: match_id.to_string(),
                    result,
                    messages,
                }
            }
            Err((stage, error)) => {
                error!(
                    stage = %stage,
                    kind = %error.kind(),
                    "Review of {match_id} failed: {error}"
                );
                RunOutcome::Failed {
                    match_id: match_id.to_string(),
                    stage,
                    error,
                }
            }
        };
        self.record(&outcome).await;
        outcome
    }

    async fn pipeline(&self, match_id: &str) -> Result<(AnalysisResult, usize), StageError> {
        debug!("Stage {}", Stage::Fetching);
        let record = self.fetch(match_id).await.map_err(at(Stage::Fetching))?;

        debug!("Stage {}", Stage::Analyzing);
        record
            .validate()
            .map_err(|e| ReviewError::ValidationError(e.to_string()))
            .map_err(at(Stage::Analyzing))?;
        let report = self.analyzer.analyze(&record);

        debug!("Stage {}", Stage::Prompting);
        let prompt = self.prompts.generate(&report);

        debug!("Stage {}", Stage::Generating);
        let result = self
            .generator
            .generate(&prompt)
            .await
            .map_err(at(Stage::Generating))?;

        debug!("Stage {}", Stage::Notifying);
        let messages = self
            .notifier
            .notify(&report, &result)
            .await
            .map_err(at(Stage::Notifying))?;

        Ok((result, messages))
    }

    async fn fetch(&self, match_id: &str) -> Result<MatchRecord, ReviewError> {
        if let Some(store) = &self.store {
            match store.get_cached_match(match_id, self.cache_ttl).await {
                Ok(Some(record)) => {
                    debug!("Using cached match data for {match_id}");
                    return Ok(record);
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to read match cache: {e:?}"),
            }
        }

        let record = self.source.fetch_match(match_id).await?;

        if let Some(store) = &self.store {
            if let Err(e) = store.insert_cached_match(&record).await {
                warn!("Failed to cache match {match_id}: {e:?}");
            }
        }
        Ok(record)
    }

    async fn record(&self, outcome: &RunOutcome) {
        let Some(store) = &self.store else {
            return;
        };

        let reason;
        let review = match outcome {
            RunOutcome::Done {
                match_id, result, ..
            } => NewReview {
                match_id,
                status: ReviewStatus::Done,
                failed_stage: None,
                error_kind: None,
                reason: None,
                score: Some(result.score),
                flagged: result.flagged,
            },
            RunOutcome::Failed {
                match_id,
                stage,
                error,
            } => {
                reason = error.to_string();
                NewReview {
                    match_id,
                    status: ReviewStatus::Failed,
                    failed_stage: Some(stage.as_str()),
                    error_kind: Some(error.kind().as_str()),
                    reason: Some(reason.as_str()),
                    score: None,
                    flagged: false,
                }
            }
            RunOutcome::Aborted { .. } => return,
        };

        if let Err(e) = store.insert_review(&review).await {
            warn!("Failed to record review of {}: {e:?}", review.match_id);
        }
    }

    /// Review several matches, at most `workers` at a time across the whole
    /// orchestrator. Outcomes come back in
    /// the order of `match_ids`; duplicate ids are reviewed once.
    pub async fn run_batch(&self, match_ids: &[String]) -> Vec<RunOutcome> {
        let mut seen = HashSet::new();
        let match_ids: Vec<&String> = match_ids.iter().filter(|id| seen.insert(*id)).collect();
        let handles: Vec<_> = match_ids
            .iter()
            .map(|match_id| {
                let orchestrator = self.clone();
                let match_id = match_id.to_string();
                tokio::task::spawn(async move { orchestrator.run(&match_id).await })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (match_id, handle) in match_ids.into_iter().zip(handles) {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Review task for {match_id} did not finish: {e:?}");
                    RunOutcome::Aborted {
                        match_id: match_id.clone(),
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let done = outcomes.iter().filter(|outcome| outcome.is_done()).count();
        info!("Batch finished: {done} done, {} failed", outcomes.len() - done);
        outcomes
    }

    /// Review the most recent matches of a player. Matches that already have a
    /// successful review in the history are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn review_summoner(
        &self,
        riot_id: &str,
        count: u32,
    ) -> Result<Vec<RunOutcome>, ReviewError> {
        let match_ids = self.source.recent_match_ids(riot_id, count).await?;

        let pending = match &self.store {
            Some(store) => match store.reviewed_match_ids(&match_ids).await {
                Ok(reviewed) => match_ids
                    .iter()
                    .filter(|id| !reviewed.contains(id))
                    .cloned()
                    .collect(),
                Err(e) => {
                    warn!("Failed to read review history: {e:?}");
                    match_ids.clone()
                }
            },
            None => match_ids.clone(),
        };
        info!(
            "{riot_id}: {} recent matches, {} not reviewed yet",
            match_ids.len(),
            pending.len()
        );

        Ok(self.run_batch(&pending).await)
    }
}
