// ドメイン層モジュール
pub mod failure_policy;
pub mod matched_post;
pub mod reply_budget;
pub mod reply_filter;
pub mod reply_post;
pub mod stream_rule;

// 再エクスポート
pub use failure_policy::{FailurePolicies, FailurePolicy, UnknownFailurePolicy};
pub use matched_post::{MatchedPost, MatchingRule, StreamPayload};
pub use reply_budget::{ReplyBudget, DEFAULT_REPLY_CEILING};
pub use reply_filter::{FilterDecision, ReplyFilter, RETWEET_MARKER};
pub use reply_post::{status_url, ReplyPost, REPLY_GREETING};
pub use stream_rule::{RuleChangeSummary, RuleSet, StreamRule};
