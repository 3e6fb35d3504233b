//! Twitter API v2のリクエスト・レスポンス型

use serde::{Deserialize, Serialize};

use crate::domain::{RuleChangeSummary, RuleSet, StreamRule};

/// 投稿作成リクエスト
#[derive(Debug, Clone, Serialize)]
pub struct CreateTweetRequest<'a> {
    pub text: &'a str,
}

/// 投稿作成レスポンス
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTweetResponse {
    pub data: CreatedTweet,
}

/// 作成された投稿
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedTweet {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

/// ルール追加リクエスト
#[derive(Debug, Clone, Serialize)]
pub struct AddRulesRequest<'a> {
    pub add: &'a [StreamRule],
}

/// ルール削除リクエスト
#[derive(Debug, Clone, Serialize)]
pub struct DeleteRulesRequest<'a> {
    pub delete: DeleteRuleIds<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteRuleIds<'a> {
    pub ids: &'a [String],
}

/// ルール一覧・追加・削除の共通レスポンス
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesResponse {
    #[serde(default)]
    pub data: Option<Vec<StreamRule>>,
    #[serde(default)]
    pub meta: Option<RulesMeta>,
    #[serde(default)]
    pub errors: Option<Vec<ApiErrorDetail>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesMeta {
    #[serde(default)]
    pub summary: Option<RulesSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesSummary {
    #[serde(default)]
    pub created: u32,
    #[serde(default)]
    pub not_created: u32,
    #[serde(default)]
    pub deleted: u32,
    #[serde(default)]
    pub not_deleted: u32,
}

/// レスポンス内のエラー要素
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ApiErrorDetail {
    /// 最も具体的なメッセージを返す
    pub fn describe(&self) -> String {
        let message = self
            .detail
            .as_deref()
            .or(self.message.as_deref())
            .or(self.title.as_deref())
            .unwrap_or("Unknown error");

        match &self.value {
            Some(value) => format!("{message} (value={value})"),
            None => message.to_string(),
        }
    }
}

/// エラーレスポンスのボディ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<ApiErrorDetail>>,
}

impl ApiErrorBody {
    pub fn describe(&self) -> Option<String> {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .or_else(|| {
                self.errors
                    .as_ref()
                    .and_then(|errors| errors.first())
                    .map(ApiErrorDetail::describe)
            })
    }
}

/// アプリ認証トークン取得レスポンス
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
}

impl RulesResponse {
    /// エラーメッセージ一覧
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .flatten()
            .map(ApiErrorDetail::describe)
            .collect()
    }

    /// ドメインのRuleSetに変換
    pub fn into_rule_set(self) -> RuleSet {
        let summary = self
            .meta
            .and_then(|meta| meta.summary)
            .map(|summary| RuleChangeSummary {
                created: summary.created,
                not_created: summary.not_created,
                deleted: summary.deleted,
                not_deleted: summary.not_deleted,
            });

        RuleSet {
            rules: self.data.unwrap_or_default(),
            summary,
        }
    }
}
