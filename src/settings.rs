use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

static SETTINGS: OnceLock<Settings> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub reddit: Reddit,
    pub scoring: Scoring,
    pub registry: Registry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reddit {
    pub subreddits: Vec<String>,
    pub post_limit: u32,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scoring {
    pub use_finbert: bool,
    pub rescore: bool,
    pub since_days: i64,
    pub finbert_max_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    pub feed_urls: Vec<String>,
    pub output_path: String,
    pub fetch_retries: u32,
    pub fetch_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reddit: Reddit {
                subreddits: vec![
                    "stocks".to_string(),
                    "wallstreetbets".to_string(),
                    "investing".to_string(),
                ],
                post_limit: 200,
                request_timeout_secs: 30,
            },
            scoring: Scoring {
                use_finbert: false,
                rescore: false,
                since_days: 14,
                finbert_max_length: 256,
            },
            registry: Registry {
                feed_urls: vec![
                    "https://www.nasdaqtrader.com/dynamic/symdir/nasdaqlisted.txt".to_string(),
                    "https://www.nasdaqtrader.com/dynamic/symdir/otherlisted.txt".to_string(),
                ],
                output_path: "data/refs/valid_tickers.csv".to_string(),
                fetch_retries: 3,
                fetch_timeout_secs: 30,
            },
        }
    }
}

impl Settings {
    pub fn load() -> &'static Settings {
        SETTINGS.get_or_init(Self::load_from_files)
    }

    fn load_from_files() -> Settings {
        let default_path = Path::new("settings.default.ron");
        let override_path = Path::new("settings.ron");

        let mut settings = if default_path.exists() {
            fs::read_to_string(default_path)
                .ok()
                .and_then(|content| ron::from_str(&content).ok())
                .unwrap_or_default()
        } else {
            Settings::default()
        };

        if override_path.exists() {
            if let Ok(content) = fs::read_to_string(override_path) {
                if let Ok(overrides) = ron::from_str::<Settings>(&content) {
                    settings = overrides;
                }
            }
        }

        settings
    }
}

pub fn settings() -> &'static Settings {
    Settings::load()
}
