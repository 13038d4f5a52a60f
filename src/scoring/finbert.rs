use anyhow::{anyhow, Context, Result};
use rust_bert::pipelines::zero_shot_classification::ZeroShotClassificationModel;
use std::str::FromStr;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::utils::{log_ml_error, log_ml_loading, log_ml_model_loaded, log_ml_ready};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, IntoStaticStr)]
pub enum SentimentLabel {
    #[strum(to_string = "positive")]
    Positive,
    #[strum(to_string = "negative")]
    Negative,
    #[strum(to_string = "neutral")]
    Neutral,
}

impl SentimentLabel {
    /// Direction of the signed score for this label.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
            Self::Neutral => 0.0,
        }
    }

    pub fn all_labels() -> Vec<&'static str> {
        Self::iter().map(|l| l.into()).collect()
    }
}

impl FromStr for SentimentLabel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::iter().find(|l| l.to_string() == s).ok_or(())
    }
}

/// One model verdict: the winning label, its confidence, and the
/// confidence-scaled signed score.
#[derive(Debug, Clone, Default)]
pub struct ModelScore {
    pub label: String,
    pub confidence: f64,
    pub signed: f64,
}

enum ModelRequest {
    Score {
        texts: Vec<String>,
        response_tx: mpsc::Sender<Result<Vec<ModelScore>>>,
    },
}

/// Handle to the model worker thread. The model is expensive, so the worker
/// exists only when the finbert path is enabled in settings; everything else
/// talks to it through this handle.
#[derive(Clone)]
pub struct FinbertHandle {
    request_tx: mpsc::Sender<ModelRequest>,
}

impl FinbertHandle {
    pub fn spawn(max_length: usize) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<ModelRequest>();

        thread::spawn(move || {
            if let Err(e) = run_model_worker(request_rx, max_length) {
                log_ml_error(&format!("Worker failed: {e}"));
            }
        });

        Ok(Self { request_tx })
    }

    /// Score a batch of texts, blocking until the worker answers. A dead
    /// worker or a failed inference is an error; there is no neutral
    /// fallback that could masquerade as a real verdict.
    pub fn score(&self, texts: Vec<String>) -> Result<Vec<ModelScore>> {
        let (response_tx, response_rx) = mpsc::channel();

        self.request_tx
            .send(ModelRequest::Score { texts, response_tx })
            .map_err(|_| anyhow!("Model worker is not running"))?;

        response_rx
            .recv()
            .map_err(|_| anyhow!("Model worker stopped before answering"))?
    }

    /// A handle whose worker never existed, for exercising failure paths.
    #[cfg(test)]
    pub(crate) fn disconnected() -> Self {
        let (request_tx, _) = mpsc::channel();
        Self { request_tx }
    }
}

fn run_model_worker(request_rx: mpsc::Receiver<ModelRequest>, max_length: usize) -> Result<()> {
    log_ml_loading();
    let start = Instant::now();
    let classifier = ZeroShotClassificationModel::new(Default::default())?;
    log_ml_model_loaded(start.elapsed().as_secs_f32());
    log_ml_ready();

    for request in request_rx {
        let ModelRequest::Score { texts, response_tx } = request;
        let _ = response_tx.send(classify(&classifier, &texts, max_length));
    }

    Ok(())
}

fn classify(
    classifier: &ZeroShotClassificationModel,
    texts: &[String],
    max_length: usize,
) -> Result<Vec<ModelScore>> {
    let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let labels = SentimentLabel::all_labels();

    let predictions = classifier
        .predict(
            &inputs,
            &labels,
            Some(Box::new(|label| {
                format!("The financial sentiment of this text is {}.", label)
            })),
            max_length,
        )
        .context("Inference failed")?;

    Ok(predictions
        .into_iter()
        .map(|prediction| {
            let confidence = prediction.score;
            let signed = SentimentLabel::from_str(&prediction.text)
                .map(|l| l.sign())
                .unwrap_or(0.0)
                * confidence;
            ModelScore {
                label: prediction.text,
                confidence,
                signed,
            }
        })
        .collect())
}
