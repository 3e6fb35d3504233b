// ストリームルールAPI
use async_trait::async_trait;

use super::twitter_client::{TwitterApiClient, TwitterApiError};
use crate::domain::{RuleSet, StreamRule};

/// ストリームルールを管理するリモートAPI
#[async_trait]
pub trait StreamRuleApi: Send + Sync {
    /// 登録済みルールを取得
    async fn list_rules(&self) -> Result<RuleSet, TwitterApiError>;

    /// ルールを追加
    async fn add_rules(&self, rules: &[StreamRule]) -> Result<RuleSet, TwitterApiError>;

    /// ルールをIDで削除
    async fn delete_rules(&self, ids: &[String]) -> Result<RuleSet, TwitterApiError>;
}

#[async_trait]
impl StreamRuleApi for TwitterApiClient {
    async fn list_rules(&self) -> Result<RuleSet, TwitterApiError> {
        TwitterApiClient::list_rules(self).await
    }

    async fn add_rules(&self, rules: &[StreamRule]) -> Result<RuleSet, TwitterApiError> {
        TwitterApiClient::add_rules(self, rules).await
    }

    async fn delete_rules(&self, ids: &[String]) -> Result<RuleSet, TwitterApiError> {
        TwitterApiClient::delete_rules(self, ids).await
    }
}
