mod finbert;
mod vader;

pub use finbert::{FinbertHandle, ModelScore, SentimentLabel};
pub use vader::{LexiconScores, VaderScorer};

use anyhow::{bail, Result};
use chrono::Utc;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::db::{self, NewCommentSentiment, NewPostSentiment, ScorableRow};
use crate::utils::{log_score_done, log_score_empty};

/// Score posts that are unscored (`rescore=false`) or inside the trailing
/// window (`rescore=true`), then bulk-upsert the results. Returns the number
/// of rows written; an empty selection writes nothing. A model failure
/// propagates before anything is persisted.
pub fn score_posts(
    conn: &mut SqliteConnection,
    lexicon: &VaderScorer,
    model: Option<&FinbertHandle>,
    rescore: bool,
    since_days: i64,
) -> Result<usize> {
    let cutoff = Utc::now().timestamp() - since_days * 86_400;
    let rows = db::posts_for_scoring(conn, rescore, cutoff)?;
    if rows.is_empty() {
        log_score_empty("posts");
        return Ok(0);
    }

    let model_scores = run_model(model, &rows)?;
    let scored_at = Utc::now().timestamp();

    let sentiments: Vec<NewPostSentiment> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let lex = lexicon.score(&row.text);
            let m = model_scores.as_ref().map(|scores| scores[i].clone());
            NewPostSentiment {
                post_id: row.id,
                vader_pos: lex.pos,
                vader_neg: lex.neg,
                vader_neu: lex.neu,
                vader_compound: lex.compound,
                finbert_label: m.as_ref().map(|m| m.label.clone()),
                finbert_conf: m.as_ref().map(|m| m.confidence),
                finbert_signed: m.as_ref().map(|m| m.signed),
                scored_at,
            }
        })
        .collect();

    db::upsert_post_sentiments(conn, &sentiments)?;
    log_score_done("posts", sentiments.len());
    Ok(sentiments.len())
}

/// Comment counterpart of [`score_posts`], same selection and persistence
/// contract.
pub fn score_comments(
    conn: &mut SqliteConnection,
    lexicon: &VaderScorer,
    model: Option<&FinbertHandle>,
    rescore: bool,
    since_days: i64,
) -> Result<usize> {
    let cutoff = Utc::now().timestamp() - since_days * 86_400;
    let rows = db::comments_for_scoring(conn, rescore, cutoff)?;
    if rows.is_empty() {
        log_score_empty("comments");
        return Ok(0);
    }

    let model_scores = run_model(model, &rows)?;
    let scored_at = Utc::now().timestamp();

    let sentiments: Vec<NewCommentSentiment> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let lex = lexicon.score(&row.text);
            let m = model_scores.as_ref().map(|scores| scores[i].clone());
            NewCommentSentiment {
                comment_id: row.id,
                vader_pos: lex.pos,
                vader_neg: lex.neg,
                vader_neu: lex.neu,
                vader_compound: lex.compound,
                finbert_label: m.as_ref().map(|m| m.label.clone()),
                finbert_conf: m.as_ref().map(|m| m.confidence),
                finbert_signed: m.as_ref().map(|m| m.signed),
                scored_at,
            }
        })
        .collect();

    db::upsert_comment_sentiments(conn, &sentiments)?;
    log_score_done("comments", sentiments.len());
    Ok(sentiments.len())
}

/// Run the optional model over the selected rows. The batch must come back
/// with one score per text; anything else would pair verdicts with the wrong
/// rows.
fn run_model(
    model: Option<&FinbertHandle>,
    rows: &[ScorableRow],
) -> Result<Option<Vec<ModelScore>>> {
    let Some(handle) = model else {
        return Ok(None);
    };

    let scores = handle.score(rows.iter().map(|r| r.text.clone()).collect())?;
    if scores.len() != rows.len() {
        bail!(
            "Model returned {} scores for {} texts",
            scores.len(),
            rows.len()
        );
    }
    Ok(Some(scores))
}
