use vader_sentiment::SentimentIntensityAnalyzer;

/// The four VADER sub-scores. `pos`/`neg`/`neu` are proportions in [0, 1];
/// `compound` is the normalized signed score in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LexiconScores {
    pub pos: f64,
    pub neg: f64,
    pub neu: f64,
    pub compound: f64,
}

/// Lexicon-based polarity scorer. VADER is tuned for social-media text,
/// which is exactly what flows through here.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    pub fn score(&self, text: &str) -> LexiconScores {
        if text.trim().is_empty() {
            return LexiconScores::default();
        }

        let scores = self.analyzer.polarity_scores(text);
        LexiconScores {
            pos: scores.get("pos").copied().unwrap_or(0.0),
            neg: scores.get("neg").copied().unwrap_or(0.0),
            neu: scores.get("neu").copied().unwrap_or(0.0),
            compound: scores.get("compound").copied().unwrap_or(0.0),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}
