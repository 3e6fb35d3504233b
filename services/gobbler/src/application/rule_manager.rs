/// ルールマネージャー
///
/// ストリームルールの一覧・作成・削除を行う。各操作は1回のリクエスト/レスポンスで完結する。
use thiserror::Error;
use tracing::{info, instrument};

use crate::domain::{RuleSet, StreamRule};
use crate::infrastructure::{StreamRuleApi, TwitterApiError};

/// ルールマネージャーのエラー型
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleManagerError {
    /// キーワードが空
    #[error("キーワードが空です")]
    EmptyKeyword,

    /// ルールIDが空
    #[error("ルールIDが空です")]
    EmptyRuleId,

    /// API呼び出しの失敗
    #[error(transparent)]
    Api(#[from] TwitterApiError),
}

/// ストリームルールを管理する
pub struct RuleManager<R>
where
    R: StreamRuleApi,
{
    api: R,
}

impl<R> RuleManager<R>
where
    R: StreamRuleApi,
{
    /// 新しいRuleManagerを作成
    pub fn new(api: R) -> Self {
        Self { api }
    }

    /// 登録済みのルールをすべて取得
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<RuleSet, RuleManagerError> {
        let rule_set = self.api.list_rules().await?;
        info!(rule_count = rule_set.rules.len(), "ルール一覧を取得");
        Ok(rule_set)
    }

    /// キーワードからルールを1件作成（マッチ条件とタグはキーワードそのもの）
    #[instrument(skip(self))]
    pub async fn create(&self, keyword: &str) -> Result<RuleSet, RuleManagerError> {
        if keyword.trim().is_empty() {
            return Err(RuleManagerError::EmptyKeyword);
        }

        let rule_set = self
            .api
            .add_rules(&[StreamRule::from_keyword(keyword)])
            .await?;
        info!(summary = ?rule_set.summary, "ルールを作成");
        Ok(rule_set)
    }

    /// ルールをIDで1件削除
    #[instrument(skip(self))]
    pub async fn delete(&self, rule_id: &str) -> Result<RuleSet, RuleManagerError> {
        if rule_id.trim().is_empty() {
            return Err(RuleManagerError::EmptyRuleId);
        }

        let rule_set = self.api.delete_rules(&[rule_id.to_string()]).await?;
        info!(summary = ?rule_set.summary, "ルールを削除");
        Ok(rule_set)
    }
}
