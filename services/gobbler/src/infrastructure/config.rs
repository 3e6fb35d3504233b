// Twitter API接続設定
//
// 認証情報とAPIエンドポイントを環境変数から一度だけ読み込み、
// 必要なコンポーネントに明示的に渡す。

use std::time::Duration;

use thiserror::Error;

/// デフォルトのAPIベースURL
pub const DEFAULT_API_URL: &str = "https://api.twitter.com";

/// ストリーム経路のクライアントタイムアウト（秒）
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 120;

/// ルール管理経路のクライアントタイムアウト（秒）
pub const DEFAULT_MANAGEMENT_TIMEOUT_SECS: u64 = 30;

/// 設定読み込みエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 必須の環境変数が設定されていない
    #[error("必須の環境変数が設定されていません: {0}")]
    MissingEnvVar(String),

    /// 環境変数の値が不正
    #[error("環境変数の値が不正です: {name}={value}")]
    InvalidValue {
        /// 環境変数名
        name: String,
        /// 設定されていた値
        value: String,
    },
}

/// 必須の環境変数を読み込む（空文字は未設定扱い）
pub(crate) fn required_env(name: &str) -> Result<String, ConfigError> {
    optional_env(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// 任意の環境変数を読み込む（空文字は未設定扱い）
pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// 数値の環境変数を読み込む（未設定時はデフォルト値）
pub(crate) fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match optional_env(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

/// Twitter API接続設定
///
/// # 環境変数
/// - `TWITTER_API_KEY` / `TWITTER_API_KEY_SECRET`: コンシューマーキー（必須）
/// - `TWITTER_ACCESS_TOKEN` / `TWITTER_ACCESS_TOKEN_SECRET`: 投稿用ユーザーコンテキスト（リプライ時のみ使用）
/// - `TWITTER_BEARER_TOKEN`: アプリ認証トークン（未設定時はコンシューマーキーから取得）
/// - `TWITTER_API_URL`: APIベースURL（デフォルト: https://api.twitter.com）
/// - `STREAM_TIMEOUT_SECS`: ストリーム経路のタイムアウト（デフォルト: 120）
/// - `MANAGEMENT_TIMEOUT_SECS`: ルール管理経路のタイムアウト（デフォルト: 30）
/// - `REMOTE_MAX_RETRIES`: 一時的な失敗の再試行回数（デフォルト: 0）
#[derive(Clone)]
pub struct TwitterApiConfig {
    api_url: String,
    api_key: String,
    api_key_secret: String,
    access_token: Option<String>,
    access_token_secret: Option<String>,
    bearer_token: Option<String>,
    stream_timeout: Duration,
    management_timeout: Duration,
    max_retries: u32,
}

impl std::fmt::Debug for TwitterApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterApiConfig")
            .field("api_url", &self.api_url)
            .field("has_access_token", &self.access_token.is_some())
            .field("has_bearer_token", &self.bearer_token.is_some())
            .field("stream_timeout", &self.stream_timeout)
            .field("management_timeout", &self.management_timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl TwitterApiConfig {
    /// コンシューマーキーのみを持つ設定を作成（その他はデフォルト値）
    pub fn new(api_key: impl Into<String>, api_key_secret: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            api_key_secret: api_key_secret.into(),
            access_token: None,
            access_token_secret: None,
            bearer_token: None,
            stream_timeout: Duration::from_secs(DEFAULT_STREAM_TIMEOUT_SECS),
            management_timeout: Duration::from_secs(DEFAULT_MANAGEMENT_TIMEOUT_SECS),
            max_retries: 0,
        }
    }

    /// 環境変数から設定を読み込み
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = required_env("TWITTER_API_KEY")?;
        let api_key_secret = required_env("TWITTER_API_KEY_SECRET")?;

        let api_url = match optional_env("TWITTER_API_URL") {
            Some(url) => validate_api_url(&url)?,
            None => DEFAULT_API_URL.to_string(),
        };

        let stream_timeout = parse_env_or("STREAM_TIMEOUT_SECS", DEFAULT_STREAM_TIMEOUT_SECS)?;
        let management_timeout =
            parse_env_or("MANAGEMENT_TIMEOUT_SECS", DEFAULT_MANAGEMENT_TIMEOUT_SECS)?;
        let max_retries = parse_env_or("REMOTE_MAX_RETRIES", 0u32)?;

        Ok(Self {
            api_url,
            api_key,
            api_key_secret,
            access_token: optional_env("TWITTER_ACCESS_TOKEN"),
            access_token_secret: optional_env("TWITTER_ACCESS_TOKEN_SECRET"),
            bearer_token: optional_env("TWITTER_BEARER_TOKEN"),
            stream_timeout: Duration::from_secs(stream_timeout),
            management_timeout: Duration::from_secs(management_timeout),
            max_retries,
        })
    }

    /// APIベースURLを設定
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// 投稿用アクセストークンを設定
    pub fn with_access_token(
        mut self,
        access_token: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        self.access_token = Some(access_token.into());
        self.access_token_secret = Some(access_token_secret.into());
        self
    }

    /// アプリ認証トークンを設定
    pub fn with_bearer_token(mut self, bearer_token: impl Into<String>) -> Self {
        self.bearer_token = Some(bearer_token.into());
        self
    }

    /// 再試行回数を設定
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_key_secret(&self) -> &str {
        &self.api_key_secret
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn access_token_secret(&self) -> Option<&str> {
        self.access_token_secret.as_deref()
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    pub fn stream_timeout(&self) -> Duration {
        self.stream_timeout
    }

    pub fn management_timeout(&self) -> Duration {
        self.management_timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// エンドポイントの完全なURLを構築
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}

/// APIベースURLを検証（http/httpsのみ許可）
fn validate_api_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        name: "TWITTER_API_URL".to_string(),
        value: raw.to_string(),
    };

    let parsed = url::Url::parse(raw).map_err(|_| invalid())?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid());
    }

    Ok(raw.trim_end_matches('/').to_string())
}
