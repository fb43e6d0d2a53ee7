use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub detect: DetectConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Sender filter for the mailbox query.
    #[serde(default = "default_sender")]
    pub sender: String,
    /// How far back each mailbox query reaches.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// Path to the OAuth token file (google-auth `token.json` layout).
    #[serde(default = "default_token_file")]
    pub token_file: String,
    /// Only messages whose subject starts with this are treated as alerts.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectConfig {
    #[serde(default = "default_detect_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub chat_id: String,
    /// Fixed pause between consecutive sends, to stay under channel limits.
    #[serde(default = "default_send_delay_secs")]
    pub send_delay_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Ordered field labels expected in every alert message. The first one
    /// also anchors the body fragment scan.
    pub fields: Vec<String>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_sender() -> String {
    "TradingView <noreply@tradingview.com>".to_string()
}

fn default_lookback_days() -> i64 {
    10
}

fn default_token_file() -> String {
    "token.json".to_string()
}

fn default_subject_prefix() -> String {
    "Alert".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_secs() -> u64 {
    3
}

fn default_detect_interval_secs() -> u64 {
    1
}

fn default_send_delay_secs() -> u64 {
    2
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sender: default_sender(),
            lookback_days: default_lookback_days(),
            token_file: default_token_file(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay_secs(),
        }
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_detect_interval_secs(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            send_delay_secs: default_send_delay_secs(),
        }
    }
}

const CONFIG_TEMPLATE: &str = r#"# tradewatch configuration

data_dir = "data"

[mail]
sender = "TradingView <noreply@tradingview.com>"
lookback_days = 10
token_file = "token.json"
subject_prefix = "Alert"

[fetch]
max_retries = 5
base_delay_secs = 3

[detect]
interval_secs = 1

[telegram]
token = ""
chat_id = ""
send_delay_secs = 2

[strategy]
fields = ["Timestamp", "Ticker", "Action", "Price"]
"#;

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{path}': {e}"))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{path}': {e}"))?;
        Ok(config)
    }

    /// Writes a starter config for the operator to fill in.
    pub fn write_template(path: &str) -> anyhow::Result<()> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, CONFIG_TEMPLATE)
            .map_err(|e| anyhow::anyhow!("Failed to write config template '{path}': {e}"))?;
        Ok(())
    }
}
