//! リモート呼び出し失敗時のポリシー
//!
//! すべてのリモート呼び出しは`Result`を返し、呼び出し側がポリシーに従って
//! 中断するか報告して続行するかを決める。

use std::fmt;
use std::str::FromStr;

use tracing::error;

/// 失敗時の振る舞い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 処理を中断し、エラーを呼び出し元に返す（非ゼロ終了）
    Abort,
    /// エラーをログに記録して正常終了扱いにする
    Report,
}

/// ポリシー文字列の解析エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFailurePolicy(pub String);

impl fmt::Display for UnknownFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown failure policy: {}", self.0)
    }
}

impl std::error::Error for UnknownFailurePolicy {}

impl FromStr for FailurePolicy {
    type Err = UnknownFailurePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "report" => Ok(FailurePolicy::Report),
            _ => Err(UnknownFailurePolicy(s.to_string())),
        }
    }
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Abort => "abort",
            FailurePolicy::Report => "report",
        }
    }

    /// 操作結果にポリシーを適用する
    ///
    /// # 戻り値
    /// * 成功時は`Ok(Some(value))`
    /// * `Report`で失敗した場合はログ出力して`Ok(None)`
    /// * `Abort`で失敗した場合は`Err(error)`
    pub fn settle<T, E>(self, operation: &str, result: Result<T, E>) -> Result<Option<T>, E>
    where
        E: fmt::Display,
    {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => match self {
                FailurePolicy::Abort => Err(err),
                FailurePolicy::Report => {
                    error!(operation = operation, error = %err, "操作に失敗（報告のみで続行）");
                    Ok(None)
                }
            },
        }
    }
}

/// 経路ごとの失敗ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicies {
    /// ストリーム接続の確立失敗
    pub subscribe: FailurePolicy,
    /// リプライの認証情報取得・送信失敗
    pub reply: FailurePolicy,
    /// ルール管理呼び出しの失敗
    pub management: FailurePolicy,
}

impl FailurePolicies {
    /// 従来の経路別ポリシー（リプライ失敗のみ中断）
    pub fn legacy() -> Self {
        Self {
            subscribe: FailurePolicy::Report,
            reply: FailurePolicy::Abort,
            management: FailurePolicy::Report,
        }
    }

    /// 全経路に同じポリシーを適用
    pub fn uniform(policy: FailurePolicy) -> Self {
        Self {
            subscribe: policy,
            reply: policy,
            management: policy,
        }
    }

    /// 上書き指定があれば統一ポリシー、なければ従来ポリシー
    pub fn resolve(override_policy: Option<FailurePolicy>) -> Self {
        override_policy.map_or_else(Self::legacy, Self::uniform)
    }
}

impl Default for FailurePolicies {
    fn default() -> Self {
        Self::legacy()
    }
}
