use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

pub const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const OAUTH_API_BASE: &str = "https://oauth.reddit.com";

/// How many `more` placeholder ids one morechildren call may resolve.
const MORECHILDREN_BATCH: usize = 100;

/// Listing responses are capped at 100 items per page regardless of the
/// requested limit; larger bounds require following the `after` cursor.
const LISTING_PAGE_MAX: u32 = 100;

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Debug, Deserialize)]
struct ListingData<T> {
    children: Vec<Thing<T>>,
    #[serde(default)]
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thing<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    created_utc: f64,
}

/// One post from the ranked listing, with its flattened comments filled in by
/// the ingestion pass.
#[derive(Debug, Clone)]
pub struct PostSnapshot {
    pub id: String,
    pub author: Option<String>,
    pub title: String,
    pub selftext: String,
    pub url: String,
    pub permalink: String,
    pub score: i64,
    pub num_comments: i64,
    pub created_utc: i64,
    pub comments: Vec<CommentSnapshot>,
}

impl From<PostData> for PostSnapshot {
    fn from(p: PostData) -> Self {
        Self {
            id: p.id,
            author: p.author,
            title: p.title,
            selftext: p.selftext,
            url: p.url,
            permalink: p.permalink,
            score: p.score,
            num_comments: p.num_comments,
            created_utc: p.created_utc as i64,
            comments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentSnapshot {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    pub score: i64,
    pub created_utc: i64,
}

struct CachedToken {
    value: String,
    expires_at: i64,
}

pub struct RedditClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    user_agent: String,
    token: Option<CachedToken>,
}

impl RedditClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        user_agent: String,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            client_id,
            client_secret,
            user_agent,
            token: None,
        })
    }

    pub fn from_env(timeout_secs: u64) -> Result<Self> {
        let client_id = std::env::var("REDDIT_CLIENT_ID").context("REDDIT_CLIENT_ID not set")?;
        let client_secret =
            std::env::var("REDDIT_CLIENT_SECRET").context("REDDIT_CLIENT_SECRET not set")?;
        let user_agent = std::env::var("REDDIT_USER_AGENT")
            .unwrap_or_else(|_| "stock-sentiment/0.1".to_string());
        Self::new(client_id, client_secret, user_agent, timeout_secs)
    }

    /// App-only OAuth token, re-requested shortly before expiry.
    async fn access_token(&mut self) -> Result<String> {
        let now = Utc::now().timestamp();
        if let Some(token) = &self.token {
            if token.expires_at > now + 60 {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("User-Agent", &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .context("Token request failed")?
            .error_for_status()
            .context("Token request rejected")?;

        let auth: AuthResponse = response.json().await.context("Token parse failed")?;
        let value = auth.access_token.clone();
        self.token = Some(CachedToken {
            value: auth.access_token,
            expires_at: now + auth.expires_in,
        });
        Ok(value)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&mut self, url: &str) -> Result<T> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("bearer {}", token))
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?
            .error_for_status()
            .with_context(|| format!("API error for {}", url))?;
        response
            .json()
            .await
            .with_context(|| format!("Parse failed for {}", url))
    }

    /// The ranked "hot" listing for one subreddit, bounded by `limit`. The
    /// `after` cursor is followed until the bound is met or the listing runs
    /// out. Comments are not fetched here.
    pub async fn hot_posts(&mut self, subreddit: &str, limit: u32) -> Result<Vec<PostSnapshot>> {
        let mut snapshots: Vec<PostSnapshot> = Vec::new();
        let mut after: Option<String> = None;

        while (snapshots.len() as u32) < limit {
            let page_size = (limit - snapshots.len() as u32).min(LISTING_PAGE_MAX);
            let url = hot_listing_url(subreddit, page_size, after.as_deref());
            let listing: Listing<PostData> = self.get_json(&url).await?;

            let ListingData { children, after: cursor } = listing.data;
            if children.is_empty() {
                break;
            }
            snapshots.extend(children.into_iter().map(|thing| thing.data.into()));

            match cursor {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        snapshots.truncate(limit as usize);
        Ok(snapshots)
    }

    /// The full flattened comment set for one post. `more` placeholders are
    /// resolved through the morechildren endpoint until none remain.
    pub async fn comments_for(&mut self, post_id: &str) -> Result<Vec<CommentSnapshot>> {
        let url = format!(
            "{}/comments/{}?limit=500&raw_json=1",
            OAUTH_API_BASE,
            urlencoding::encode(post_id)
        );
        let listings: Vec<serde_json::Value> = self.get_json(&url).await?;

        let mut comments = Vec::new();
        let mut more_ids = Vec::new();

        if let Some(children) = listings
            .get(1)
            .and_then(|l| l.pointer("/data/children"))
            .and_then(|c| c.as_array())
        {
            flatten_comment_tree(children, &mut comments, &mut more_ids);
        }

        while !more_ids.is_empty() {
            let batch: Vec<String> = more_ids
                .drain(..more_ids.len().min(MORECHILDREN_BATCH))
                .collect();
            let url = format!(
                "{}/api/morechildren?api_type=json&link_id=t3_{}&children={}",
                OAUTH_API_BASE,
                urlencoding::encode(post_id),
                urlencoding::encode(&batch.join(","))
            );
            let response: serde_json::Value = self.get_json(&url).await?;
            if let Some(things) = response
                .pointer("/json/data/things")
                .and_then(|t| t.as_array())
            {
                flatten_comment_tree(things, &mut comments, &mut more_ids);
            }
        }

        Ok(comments)
    }
}

fn hot_listing_url(subreddit: &str, page_size: u32, after: Option<&str>) -> String {
    let mut url = format!(
        "{}/r/{}/hot?limit={}&raw_json=1",
        OAUTH_API_BASE,
        urlencoding::encode(subreddit),
        page_size
    );
    if let Some(cursor) = after {
        url.push_str("&after=");
        url.push_str(&urlencoding::encode(cursor));
    }
    url
}

/// Walk a comment listing depth-first, collecting every `t1` comment into a
/// flat list and queueing ids from `more` placeholders for a follow-up fetch.
fn flatten_comment_tree(
    children: &[serde_json::Value],
    out: &mut Vec<CommentSnapshot>,
    more_ids: &mut Vec<String>,
) {
    for child in children {
        let kind = child.get("kind").and_then(|k| k.as_str()).unwrap_or("");
        let Some(data) = child.get("data") else {
            continue;
        };

        match kind {
            "t1" => {
                out.push(CommentSnapshot {
                    id: data
                        .get("id")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    author: data
                        .get("author")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    body: data
                        .get("body")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    score: data.get("score").and_then(|v| v.as_i64()).unwrap_or(0),
                    created_utc: data
                        .get("created_utc")
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.0) as i64,
                });

                if let Some(replies) = data
                    .get("replies")
                    .filter(|r| r.is_object())
                    .and_then(|r| r.pointer("/data/children"))
                    .and_then(|c| c.as_array())
                {
                    flatten_comment_tree(replies, out, more_ids);
                }
            }
            "more" => {
                if let Some(ids) = data.get("children").and_then(|c| c.as_array()) {
                    more_ids.extend(ids.iter().filter_map(|v| v.as_str()).map(str::to_string));
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hot_listing_url_carries_cursor() {
        let first = hot_listing_url("stocks", 100, None);
        assert!(first.contains("/r/stocks/hot?limit=100"));
        assert!(!first.contains("after="));

        let next = hot_listing_url("stocks", 100, Some("t3_abc"));
        assert!(next.contains("&after=t3_abc"));
    }

    #[test]
    fn test_listing_deserializes_after_cursor() {
        let page: Listing<PostData> = serde_json::from_value(json!({
            "data": {
                "children": [
                    { "data": { "id": "p1", "title": "GME", "score": 3 } }
                ],
                "after": "t3_p1"
            }
        }))
        .unwrap();
        assert_eq!(page.data.after.as_deref(), Some("t3_p1"));
        assert_eq!(page.data.children.len(), 1);

        // The final page carries a null cursor.
        let last: Listing<PostData> = serde_json::from_value(json!({
            "data": { "children": [], "after": null }
        }))
        .unwrap();
        assert!(last.data.after.is_none());
    }

    #[test]
    fn test_flatten_visits_nested_replies() {
        let children = vec![json!({
            "kind": "t1",
            "data": {
                "id": "c1",
                "author": "alice",
                "body": "GME all the way",
                "score": 5,
                "created_utc": 1700000000.0,
                "replies": {
                    "data": {
                        "children": [{
                            "kind": "t1",
                            "data": {
                                "id": "c2",
                                "author": "bob",
                                "body": "agreed",
                                "score": 2,
                                "created_utc": 1700000100.0,
                                "replies": ""
                            }
                        }]
                    }
                }
            }
        })];

        let mut out = Vec::new();
        let mut more = Vec::new();
        flatten_comment_tree(&children, &mut out, &mut more);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "c1");
        assert_eq!(out[1].id, "c2");
        assert_eq!(out[1].author.as_deref(), Some("bob"));
        assert!(more.is_empty());
    }

    #[test]
    fn test_flatten_queues_more_placeholders() {
        let children = vec![
            json!({
                "kind": "t1",
                "data": {
                    "id": "c1",
                    "author": "alice",
                    "body": "top",
                    "score": 1,
                    "created_utc": 1700000000.0,
                    "replies": ""
                }
            }),
            json!({
                "kind": "more",
                "data": { "children": ["d1", "d2", "d3"] }
            }),
        ];

        let mut out = Vec::new();
        let mut more = Vec::new();
        flatten_comment_tree(&children, &mut out, &mut more);

        assert_eq!(out.len(), 1);
        assert_eq!(more, vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn test_flatten_tolerates_missing_fields() {
        let children = vec![json!({
            "kind": "t1",
            "data": { "id": "c1" }
        })];

        let mut out = Vec::new();
        let mut more = Vec::new();
        flatten_comment_tree(&children, &mut out, &mut more);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].body, "");
        assert_eq!(out[0].score, 0);
        assert!(out[0].author.is_none());
    }
}
