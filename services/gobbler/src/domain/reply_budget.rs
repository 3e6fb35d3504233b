//! 1回の実行で送るリプライ数の上限管理
//!
//! 上限判定は `count > ceiling`。上限10の場合、11件目を送信した直後に停止する。

/// デフォルトのリプライ上限
pub const DEFAULT_REPLY_CEILING: u32 = 10;

/// リプライ数カウンター
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyBudget {
    ceiling: u32,
    count: u32,
}

impl ReplyBudget {
    /// 新しいカウンターを作成
    pub fn new(ceiling: u32) -> Self {
        Self { ceiling, count: 0 }
    }

    /// リプライ1件を記録し、記録後のカウントを返す
    pub fn record(&mut self) -> u32 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// 上限を超えたか
    pub fn is_exhausted(&self) -> bool {
        self.count > self.ceiling
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    /// 1回の実行で送信されうる最大リプライ数
    pub fn max_replies(&self) -> u32 {
        self.ceiling.saturating_add(1)
    }
}

impl Default for ReplyBudget {
    fn default() -> Self {
        Self::new(DEFAULT_REPLY_CEILING)
    }
}
