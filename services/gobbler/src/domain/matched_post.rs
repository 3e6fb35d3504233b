/// フィルタードストリームから配信される投稿
///
/// ストリームの1行は `{"data": {...}, "matching_rules": [...]}` 形式のJSON。
/// `data` の `id` / `author_id` / `text` はいずれも必須で、欠けている行は読み取りエラーとして扱う。
use serde::Deserialize;

/// ルールにマッチした投稿
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatchedPost {
    /// 投稿ID
    pub id: String,
    /// 投稿者のアカウントID
    pub author_id: String,
    /// 本文
    pub text: String,
}

impl MatchedPost {
    /// 新しいMatchedPostを作成
    pub fn new(
        id: impl Into<String>,
        author_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            author_id: author_id.into(),
            text: text.into(),
        }
    }
}

/// 投稿がマッチしたルール
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatchingRule {
    /// ルールID
    pub id: String,
    /// ルールのタグ
    #[serde(default)]
    pub tag: Option<String>,
}

/// ストリームの1要素
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamPayload {
    /// 投稿本体
    pub data: MatchedPost,
    /// マッチしたルール一覧
    #[serde(default)]
    pub matching_rules: Option<Vec<MatchingRule>>,
}

impl StreamPayload {
    /// 投稿のみを持つペイロードを作成
    pub fn from_post(post: MatchedPost) -> Self {
        Self {
            data: post,
            matching_rules: None,
        }
    }

    /// マッチしたルールのタグ一覧（タグなしのルールは除く）
    pub fn matching_tags(&self) -> Vec<&str> {
        self.matching_rules
            .iter()
            .flatten()
            .filter_map(|rule| rule.tag.as_deref())
            .collect()
    }
}
