// TwitterApiClient - Twitter API v2 HTTPクライアント
//
// 投稿作成（OAuth 1.0aユーザーコンテキスト）と、ストリームルール管理・
// フィルタードストリーム接続（アプリ認証Bearerトークン）を行う。
// すべての呼び出しは同じエラー型TwitterApiErrorを返し、扱いは呼び出し側が決める。

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, instrument, warn};

use super::api_types::{
    AddRulesRequest, ApiErrorBody, CreateTweetRequest, CreateTweetResponse, CreatedTweet,
    DeleteRuleIds, DeleteRulesRequest, RulesResponse, TokenResponse,
};
use super::config::TwitterApiConfig;
use super::oauth::{percent_encode, OAuthSigner};
use crate::domain::{RuleSet, StreamRule};

/// 接続タイムアウト（秒）
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 投稿作成エンドポイント
const TWEETS_PATH: &str = "/2/tweets";

/// ストリームルールエンドポイント
const STREAM_RULES_PATH: &str = "/2/tweets/search/stream/rules";

/// フィルタードストリームエンドポイント
const SEARCH_STREAM_PATH: &str = "/2/tweets/search/stream";

/// アプリ認証トークン取得エンドポイント
const TOKEN_PATH: &str = "/oauth2/token";

/// Twitter API呼び出しのエラー型
///
/// # エラー種別
/// - `Credential`: 認証情報の取得・署名に失敗
/// - `Http`: エラーステータスのレスポンス
/// - `Network`: 接続・タイムアウト等の通信エラー
/// - `Serialization`: リクエスト・レスポンスの変換エラー
/// - `Rejected`: 正常ステータスだがリモートが操作を拒否
/// - `InvalidUrl`: エンドポイントURLの構築に失敗
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TwitterApiError {
    /// 認証情報エラー
    #[error("認証情報エラー: {0}")]
    Credential(String),

    /// HTTPエラー（ステータスコード付き）
    #[error("HTTPエラー: status={status}, message={message}")]
    Http {
        /// HTTPステータスコード
        status: u16,
        /// エラーメッセージ
        message: String,
    },

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    Network(String),

    /// シリアライズエラー
    #[error("シリアライズエラー: {0}")]
    Serialization(String),

    /// リモートによる拒否
    #[error("リクエストが拒否されました: {0}")]
    Rejected(String),

    /// URLエラー
    #[error("URLが不正です: {0}")]
    InvalidUrl(String),
}

/// Twitter API v2クライアント
///
/// 冪等なリクエスト/レスポンス型の呼び出しは再試行ミドルウェア付きクライアントを使い、
/// 投稿作成とストリーム接続は再試行なしのクライアントを使う。どちらも同じタイムアウトを持つ。
#[derive(Clone)]
pub struct TwitterApiClient {
    /// HTTPクライアント（再試行ミドルウェア付き）
    client: ClientWithMiddleware,
    /// 再試行なしHTTPクライアント（投稿作成・ストリーム接続用）
    single_attempt_client: Client,
    /// 接続設定
    config: TwitterApiConfig,
    /// 投稿用署名器
    signer: OAuthSigner,
    /// アプリ認証トークン（未設定時は初回利用時に取得）
    bearer_token: Arc<OnceCell<String>>,
}

impl std::fmt::Debug for TwitterApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterApiClient")
            .field("api_url", &self.config.api_url())
            .finish_non_exhaustive()
    }
}

impl TwitterApiClient {
    /// 設定とタイムアウトからクライアントを作成
    ///
    /// # 引数
    /// * `config` - API接続設定
    /// * `timeout` - クライアント全体のタイムアウト（ストリーム受信全体にも適用される）
    pub fn new(config: &TwitterApiConfig, timeout: Duration) -> Result<Self, TwitterApiError> {
        info!(
            api_url = config.api_url(),
            timeout_secs = timeout.as_secs(),
            max_retries = config.max_retries(),
            "TwitterApiClientを初期化"
        );

        let base_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("gobbler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TwitterApiError::Network(format!("HTTPクライアントの構築に失敗: {e}")))?;

        // 指数バックオフ再試行ポリシー（0回なら再試行しない）
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries());

        let client = ClientBuilder::new(base_client.clone())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            single_attempt_client: base_client,
            config: config.clone(),
            signer: OAuthSigner::new(config),
            bearer_token: Arc::new(OnceCell::new_with(
                config.bearer_token().map(ToString::to_string),
            )),
        })
    }

    /// ストリーム経路用（タイムアウト120秒）のクライアントを作成
    pub fn for_stream(config: &TwitterApiConfig) -> Result<Self, TwitterApiError> {
        Self::new(config, config.stream_timeout())
    }

    /// ルール管理用（タイムアウト30秒）のクライアントを作成
    pub fn for_management(config: &TwitterApiConfig) -> Result<Self, TwitterApiError> {
        Self::new(config, config.management_timeout())
    }

    /// アプリ認証トークンを取得（プロセス内で一度だけ取得）
    pub async fn bearer_token(&self) -> Result<String, TwitterApiError> {
        self.bearer_token
            .get_or_try_init(|| self.fetch_bearer_token())
            .await
            .cloned()
    }

    /// コンシューマーキーからアプリ認証トークンを取得（POST /oauth2/token）
    #[instrument(skip(self))]
    async fn fetch_bearer_token(&self) -> Result<String, TwitterApiError> {
        let url = self.config.endpoint_url(TOKEN_PATH);
        let credentials = format!(
            "{}:{}",
            percent_encode(self.config.api_key()),
            percent_encode(self.config.api_key_secret())
        );

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Basic {}", BASE64.encode(credentials)))
            .header(
                "Content-Type",
                "application/x-www-form-urlencoded;charset=UTF-8",
            )
            .body("grant_type=client_credentials");

        let token: TokenResponse = self.send_json(request).await.map_err(|e| {
            error!(error = %e, "アプリ認証トークンの取得に失敗");
            TwitterApiError::Credential(format!("アプリ認証トークンの取得に失敗: {e}"))
        })?;

        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(TwitterApiError::Credential(format!(
                "想定外のトークン種別: {}",
                token.token_type
            )));
        }

        info!("アプリ認証トークンを取得");
        Ok(token.access_token)
    }

    /// Bearer認証ヘッダー値
    async fn bearer_header(&self) -> Result<String, TwitterApiError> {
        Ok(format!("Bearer {}", self.bearer_token().await?))
    }

    /// リクエストを送信しJSONレスポンスを返す
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TwitterApiError> {
        let response = request.send().await.map_err(|e| {
            error!(error = %e, "リクエスト送信失敗");
            TwitterApiError::Network(e.to_string())
        })?;

        parse_json_response(response).await
    }

    /// 投稿を作成（POST /2/tweets）
    ///
    /// 呼び出しごとに新しいOAuth署名を生成する。
    /// 投稿は冪等ではなく、署名のnonceも使い回せないため再試行しない。
    /// アクセストークン未設定時は送信前に`Credential`エラーを返す。
    #[instrument(skip(self, text))]
    pub async fn create_tweet(&self, text: &str) -> Result<CreatedTweet, TwitterApiError> {
        let url = self.config.endpoint_url(TWEETS_PATH);
        let auth_header = self.signer.sign("POST", &url, &[])?;

        let body = serde_json::to_string(&CreateTweetRequest { text })
            .map_err(|e| TwitterApiError::Serialization(e.to_string()))?;

        let response = self
            .single_attempt_client
            .post(&url)
            .header("Authorization", auth_header)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "投稿リクエスト送信失敗");
                TwitterApiError::Network(e.to_string())
            })?;

        let response: CreateTweetResponse = parse_json_response(response).await?;
        debug!(tweet_id = %response.data.id, "投稿を作成");
        Ok(response.data)
    }

    /// ストリームルール一覧を取得（GET /2/tweets/search/stream/rules）
    #[instrument(skip(self))]
    pub async fn list_rules(&self) -> Result<RuleSet, TwitterApiError> {
        let request = self
            .client
            .get(self.config.endpoint_url(STREAM_RULES_PATH))
            .header("Authorization", self.bearer_header().await?);

        let response: RulesResponse = self.send_json(request).await?;
        accept_rules_response(response)
    }

    /// ストリームルールを追加（POST /2/tweets/search/stream/rules）
    #[instrument(skip(self, rules), fields(rule_count = rules.len()))]
    pub async fn add_rules(&self, rules: &[StreamRule]) -> Result<RuleSet, TwitterApiError> {
        let body = serde_json::to_string(&AddRulesRequest { add: rules })
            .map_err(|e| TwitterApiError::Serialization(e.to_string()))?;

        self.post_rules(body).await
    }

    /// ストリームルールを削除（POST /2/tweets/search/stream/rules）
    #[instrument(skip(self))]
    pub async fn delete_rules(&self, ids: &[String]) -> Result<RuleSet, TwitterApiError> {
        let body = serde_json::to_string(&DeleteRulesRequest {
            delete: DeleteRuleIds { ids },
        })
        .map_err(|e| TwitterApiError::Serialization(e.to_string()))?;

        self.post_rules(body).await
    }

    async fn post_rules(&self, body: String) -> Result<RuleSet, TwitterApiError> {
        let request = self
            .client
            .post(self.config.endpoint_url(STREAM_RULES_PATH))
            .header("Authorization", self.bearer_header().await?)
            .header("Content-Type", "application/json")
            .body(body);

        let response: RulesResponse = self.send_json(request).await?;
        accept_rules_response(response)
    }

    /// フィルタードストリームのURL（author_idを要求）
    pub(crate) fn stream_url(&self) -> Result<url::Url, TwitterApiError> {
        url::Url::parse_with_params(
            &self.config.endpoint_url(SEARCH_STREAM_PATH),
            &[("tweet.fields", "author_id")],
        )
        .map_err(|e| TwitterApiError::InvalidUrl(e.to_string()))
    }

    /// フィルタードストリームに接続（GET /2/tweets/search/stream）
    ///
    /// 接続は再試行しない。成功時はボディを読み進める前のレスポンスを返す。
    pub async fn open_stream(&self) -> Result<reqwest::Response, TwitterApiError> {
        let url = self.stream_url()?;
        let auth_header = self.bearer_header().await?;

        info!(url = %url, "フィルタードストリームに接続");

        let response = self
            .single_attempt_client
            .get(url)
            .header("Authorization", auth_header)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "ストリーム接続リクエスト失敗");
                TwitterApiError::Network(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        info!(status = %response.status(), "フィルタードストリームに接続完了");
        Ok(response)
    }
}

/// 成功ステータスならボディをJSONとして解析し、そうでなければエラーに変換
async fn parse_json_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TwitterApiError> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| TwitterApiError::Network(e.to_string()))?;

    serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "レスポンスの解析に失敗");
        TwitterApiError::Serialization(e.to_string())
    })
}

/// エラーステータスのレスポンスをTwitterApiErrorに変換
async fn error_from_response(response: reqwest::Response) -> TwitterApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.describe())
        .unwrap_or(body);

    warn!(status = %status, message = %message, "APIエラーレスポンス");

    TwitterApiError::Http {
        status: status.as_u16(),
        message,
    }
}

/// ルール操作レスポンスを検証
///
/// エラーのみで何も返らず何も変更されていない場合は拒否として扱う。
fn accept_rules_response(response: RulesResponse) -> Result<RuleSet, TwitterApiError> {
    let errors = response.error_messages();
    let rule_set = response.into_rule_set();
    let changed = rule_set
        .summary
        .is_some_and(|summary| summary.changed_anything());

    if !errors.is_empty() && rule_set.rules.is_empty() && !changed {
        return Err(TwitterApiError::Rejected(errors.join("; ")));
    }

    for message in &errors {
        warn!(message = %message, "ルール操作で一部エラー");
    }

    Ok(rule_set)
}
