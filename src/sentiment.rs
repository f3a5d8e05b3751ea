use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};

use crate::error::ApiError;

/// Normalized polarity of a mood entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
}

/// Raw output of the inference collaborator, before normalization
#[derive(Debug, Clone, Deserialize)]
pub struct RawPrediction {
    pub label: String,
    pub score: f64,
}

/// Result of one analysis call. Immutable once produced.
#[derive(Debug, Clone)]
pub struct SentimentResult {
    pub label: Sentiment,
    pub confidence: f64,
    pub text: String,
}

/// The opaque sentiment-inference collaborator.
///
/// `warm_up` may be slow or fail; `classify` assumes a completed warmup.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    async fn warm_up(&self) -> anyhow::Result<()>;

    async fn classify(&self, text: &str) -> anyhow::Result<RawPrediction>;
}

type InitOutcome = Option<Result<(), String>>;

enum InitState {
    Idle,
    InFlight(watch::Receiver<InitOutcome>),
    Ready,
}

/// Wraps the inference collaborator with lazy, single-flight initialization.
///
/// The first caller to need the model becomes the leader: it spawns the
/// warmup on a detached task and publishes the outcome on a watch channel
/// that every concurrent caller awaits. Success is cached for the process
/// lifetime; failure resets to idle so a later call can retry.
pub struct SentimentService {
    model: Arc<dyn SentimentModel>,
    init: Arc<Mutex<InitState>>,
    ready: Arc<AtomicBool>,
}

impl SentimentService {
    pub fn new(model: Arc<dyn SentimentModel>) -> Self {
        Self {
            model,
            init: Arc::new(Mutex::new(InitState::Idle)),
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Explicitly trigger initialization without analyzing anything
    pub async fn warm_up(&self) -> Result<(), ApiError> {
        self.ensure_ready().await
    }

    /// Analyze `text`, initializing the model first if needed.
    pub async fn analyze(&self, text: &str) -> Result<SentimentResult, ApiError> {
        self.ensure_ready().await?;

        let trimmed = text.trim();
        let raw = self
            .model
            .classify(trimmed)
            .await
            .map_err(|e| ApiError::internal(format!("sentiment inference failed: {e:#}")))?;

        let label = if raw.label.eq_ignore_ascii_case("positive") {
            Sentiment::Positive
        } else {
            Sentiment::Negative
        };

        Ok(SentimentResult {
            label,
            confidence: round_confidence(raw.score),
            text: trimmed.to_string(),
        })
    }

    async fn ensure_ready(&self) -> Result<(), ApiError> {
        if self.is_ready() {
            return Ok(());
        }

        let mut rx = {
            let mut state = self.init.lock().await;
            match &*state {
                InitState::Ready => return Ok(()),
                InitState::InFlight(rx) => rx.clone(),
                InitState::Idle => {
                    let (tx, rx) = watch::channel::<InitOutcome>(None);
                    *state = InitState::InFlight(rx.clone());
                    self.spawn_init(tx);
                    rx
                }
            }
        };

        let outcome = loop {
            if let Some(outcome) = rx.borrow_and_update().clone() {
                break outcome;
            }
            if rx.changed().await.is_err() {
                break Err("initialization task aborted".to_string());
            }
        };

        outcome.map_err(ApiError::ServiceUnavailable)
    }

    // Warmup runs on a detached task so a caller disconnecting mid-request
    // cannot abort an initialization other callers are waiting on.
    fn spawn_init(&self, tx: watch::Sender<InitOutcome>) {
        let model = Arc::clone(&self.model);
        let init = Arc::clone(&self.init);
        let ready = Arc::clone(&self.ready);

        tokio::spawn(async move {
            tracing::info!("initializing sentiment model");
            let outcome = model.warm_up().await.map_err(|e| format!("{e:#}"));

            let mut state = init.lock().await;
            match &outcome {
                Ok(()) => {
                    *state = InitState::Ready;
                    ready.store(true, Ordering::Release);
                    tracing::info!("sentiment model ready");
                }
                Err(detail) => {
                    *state = InitState::Idle;
                    tracing::warn!(detail = %detail, "sentiment model initialization failed");
                }
            }
            let _ = tx.send(Some(outcome));
        });
    }
}

fn round_confidence(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

/// Production collaborator: a sentiment inference service spoken to over HTTP.
pub struct HttpSentimentModel {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSentimentModel {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SentimentModel for HttpSentimentModel {
    async fn warm_up(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("sentiment backend health returned {}", response.status());
        }
        Ok(())
    }

    async fn classify(&self, text: &str) -> anyhow::Result<RawPrediction> {
        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("sentiment backend returned {}", response.status());
        }

        Ok(response.json::<RawPrediction>().await?)
    }
}
