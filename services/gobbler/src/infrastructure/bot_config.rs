// bot動作設定
//
// 自アカウントID、除外アカウント、リプライ上限、失敗ポリシーを保持する。

use super::config::{optional_env, parse_env_or, required_env, ConfigError};
use crate::domain::{
    FailurePolicies, FailurePolicy, ReplyBudget, ReplyFilter, DEFAULT_REPLY_CEILING,
};

/// bot動作設定
///
/// # 環境変数
/// - `BOT_ACCOUNT_ID`: bot自身のアカウントID（必須）
/// - `BOT_EXCLUDED_ACCOUNT_IDS`: リプライしないアカウントID（カンマ区切り）
/// - `BOT_REPLY_CEILING`: リプライ上限（デフォルト: 10）
/// - `BOT_FAILURE_POLICY`: `abort` または `report`（未設定時は経路別の従来ポリシー）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    own_account_id: String,
    excluded_account_ids: Vec<String>,
    reply_ceiling: u32,
    failure_policies: FailurePolicies,
}

impl BotConfig {
    /// 自アカウントIDのみを指定して作成（その他はデフォルト値）
    pub fn new(own_account_id: impl Into<String>) -> Self {
        Self {
            own_account_id: own_account_id.into(),
            excluded_account_ids: Vec::new(),
            reply_ceiling: DEFAULT_REPLY_CEILING,
            failure_policies: FailurePolicies::legacy(),
        }
    }

    /// 環境変数から設定を読み込み
    pub fn from_env() -> Result<Self, ConfigError> {
        let own_account_id = required_env("BOT_ACCOUNT_ID")?;
        let excluded_account_ids = optional_env("BOT_EXCLUDED_ACCOUNT_IDS")
            .map(|raw| parse_account_ids(&raw))
            .unwrap_or_default();
        let reply_ceiling = parse_env_or("BOT_REPLY_CEILING", DEFAULT_REPLY_CEILING)?;
        let failure_policies = failure_policies_from_env()?;

        Ok(Self {
            own_account_id,
            excluded_account_ids,
            reply_ceiling,
            failure_policies,
        })
    }

    /// 除外アカウントを設定
    pub fn with_excluded_account_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_account_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// リプライ上限を設定
    pub fn with_reply_ceiling(mut self, reply_ceiling: u32) -> Self {
        self.reply_ceiling = reply_ceiling;
        self
    }

    /// 失敗ポリシーを設定
    pub fn with_failure_policies(mut self, failure_policies: FailurePolicies) -> Self {
        self.failure_policies = failure_policies;
        self
    }

    pub fn own_account_id(&self) -> &str {
        &self.own_account_id
    }

    pub fn excluded_account_ids(&self) -> &[String] {
        &self.excluded_account_ids
    }

    pub fn reply_ceiling(&self) -> u32 {
        self.reply_ceiling
    }

    pub fn failure_policies(&self) -> FailurePolicies {
        self.failure_policies
    }

    /// 設定からリプライフィルターを構築
    pub fn reply_filter(&self) -> ReplyFilter {
        ReplyFilter::new(
            self.own_account_id.clone(),
            self.excluded_account_ids.iter().cloned(),
        )
    }

    /// 設定からリプライカウンターを構築
    pub fn reply_budget(&self) -> ReplyBudget {
        ReplyBudget::new(self.reply_ceiling)
    }
}

/// `BOT_FAILURE_POLICY`から経路別ポリシーを決定
///
/// ルール管理CLIのように`BotConfig`全体を必要としない経路でも使う。
pub fn failure_policies_from_env() -> Result<FailurePolicies, ConfigError> {
    let override_policy = optional_env("BOT_FAILURE_POLICY")
        .map(|raw| {
            raw.parse::<FailurePolicy>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "BOT_FAILURE_POLICY".to_string(),
                    value: raw.clone(),
                })
        })
        .transpose()?;

    Ok(FailurePolicies::resolve(override_policy))
}

/// カンマ区切りのアカウントIDを分解（空要素は無視）
fn parse_account_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect()
}
