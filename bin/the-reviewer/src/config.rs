use anyhow::Context as _;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use the_reviewer_analysis::scoring::ScoringTiers;
use the_reviewer_ipc::IPC_REVIEW_PATH;
use tokio::fs::read_to_string;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub riot: RiotConfig,
    pub ai: AiConfig,
    pub webhook: WebhookConfig,
    pub batch: BatchConfig,
    /// Match cache and review history are disabled without it
    pub database_url: Option<String>,
    pub cache_ttl_secs: u64,
    pub ipc_url: String,
    pub scoring: ScoringTiers,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            riot: Default::default(),
            ai: Default::default(),
            webhook: Default::default(),
            batch: Default::default(),
            database_url: None,
            cache_ttl_secs: 3600,
            ipc_url: IPC_REVIEW_PATH.to_string(),
            scoring: Default::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RiotConfig {
    pub api_key: String,
    /// Platform (`KR`, `EUW1`, ...) or regional (`ASIA`, `EUROPE`, ...) route
    pub region: String,
    pub retries: u8,
    pub timeout_secs: u64,
}

impl Default for RiotConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            region: "KR".to_string(),
            retries: 0,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Language the review is written in
    pub language: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 1500,
            temperature: 0.2,
            timeout_secs: 60,
            language: "English".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WebhookKind {
    #[default]
    Discord,
    Wecom,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: String,
    pub kind: WebhookKind,
    pub message_limit: usize,
    pub mention_all: bool,
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            kind: WebhookKind::Discord,
            message_limit: 2000,
            mention_all: false,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BatchConfig {
    /// Riot IDs (`name#tag`) reviewed by the `batch` command
    pub summoners: Vec<String>,
    pub match_count: u32,
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            summoners: Vec::new(),
            match_count: 5,
            workers: 2,
        }
    }
}

impl Config {
    pub async fn load(path: Option<impl AsRef<Path>>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_file(path).await?,
            None => Default::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    async fn load_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Environment variables take precedence over the file.
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        self.riot.api_key = var("RGAPI_KEY")
            .or_else(|| var("RIOT_API_KEY"))
            .unwrap_or(std::mem::take(&mut self.riot.api_key));
        self.riot.region = var("GAME_REGION").unwrap_or(std::mem::take(&mut self.riot.region));

        self.ai.api_key = var("AI_API_KEY").unwrap_or(std::mem::take(&mut self.ai.api_key));
        self.ai.base_url = var("AI_API_BASE_URL").unwrap_or(std::mem::take(&mut self.ai.base_url));
        self.ai.model = var("AI_MODEL").unwrap_or(std::mem::take(&mut self.ai.model));
        self.ai.language = var("AI_LANGUAGE").unwrap_or(std::mem::take(&mut self.ai.language));

        self.webhook.url = var("WEBHOOK_URL").unwrap_or(std::mem::take(&mut self.webhook.url));

        if let Some(names) = var("SUMMONER_NAMES") {
            self.batch.summoners = names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }

        self.database_url = var("DATABASE_URL").or(self.database_url.take());
        self.ipc_url = var("REVIEW_IPC_URL").unwrap_or(std::mem::take(&mut self.ipc_url));
    }

    /// Settings every pipeline run needs. Missing ones are reported together.
    pub fn validate(&self) -> anyhow::Result<()> {
        let missing: Vec<&str> = [
            ("riot.api_key (RGAPI_KEY)", self.riot.api_key.is_empty()),
            ("ai.api_key (AI_API_KEY)", self.ai.api_key.is_empty()),
            ("webhook.url (WEBHOOK_URL)", self.webhook.url.is_empty()),
        ]
        .into_iter()
        .filter_map(|(name, is_missing)| is_missing.then_some(name))
        .collect();

        if !missing.is_empty() {
            anyhow::bail!("Missing configuration: {}", missing.join(", "));
        }
        if self.batch.workers == 0 {
            anyhow::bail!("batch.workers must be at least 1");
        }
        if self.webhook.message_limit == 0 {
            anyhow::bail!("webhook.message_limit must be at least 1");
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
