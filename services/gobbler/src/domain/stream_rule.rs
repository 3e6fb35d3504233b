/// フィルタードストリームのルール
///
/// ルールはリモート側に保存される述語で、作成と削除のみを行い更新はしない。
use serde::{Deserialize, Serialize};
use std::fmt;

/// ストリームルール
///
/// `id`は作成前は存在せず、リモートサービスが採番する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRule {
    /// ルールID（作成後に採番）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// マッチ条件（キーワードまたはクエリ式）
    pub value: String,
    /// ラベル
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl StreamRule {
    /// キーワードからルールを作成（マッチ条件とタグは同じ値）
    pub fn from_keyword(keyword: &str) -> Self {
        Self {
            id: None,
            value: keyword.to_string(),
            tag: Some(keyword.to_string()),
        }
    }
}

impl fmt::Display for StreamRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}, Value: {}, Tag: {}",
            self.id.as_deref().unwrap_or(""),
            self.value,
            self.tag.as_deref().unwrap_or("")
        )
    }
}

/// ルール変更の集計（作成・削除レスポンスのmeta.summary）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleChangeSummary {
    pub created: u32,
    pub not_created: u32,
    pub deleted: u32,
    pub not_deleted: u32,
}

impl RuleChangeSummary {
    /// 1件でも作成または削除されたか
    pub fn changed_anything(&self) -> bool {
        self.created > 0 || self.deleted > 0
    }
}

impl fmt::Display for RuleChangeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Summary: created={}, not_created={}, deleted={}, not_deleted={}",
            self.created, self.not_created, self.deleted, self.not_deleted
        )
    }
}

/// ルール操作の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    /// リモートが返したルール
    pub rules: Vec<StreamRule>,
    /// 変更の集計（一覧取得時はなし）
    pub summary: Option<RuleChangeSummary>,
}

impl RuleSet {
    /// 人間が読める形式の出力行を生成
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.rules.iter().map(ToString::to_string).collect();
        if let Some(summary) = &self.summary {
            lines.push(summary.to_string());
        }
        lines
    }
}
