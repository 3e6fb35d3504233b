/// Reply eligibility filter
///
/// Checks run in a fixed order: own account, excluded accounts, retweet marker.
/// The retweet check is a plain substring test, so "START" is rejected as well.
use std::collections::HashSet;

use super::MatchedPost;

/// Substring that marks a post as a retweet
pub const RETWEET_MARKER: &str = "RT";

/// Outcome of filtering one post
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Reply to this post
    Eligible,
    /// Posted by the bot itself
    OwnAccount,
    /// Posted by an excluded account
    ExcludedAccount,
    /// Text contains the retweet marker
    Retweet,
}

impl FilterDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, FilterDecision::Eligible)
    }

    /// Label used in log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterDecision::Eligible => "eligible",
            FilterDecision::OwnAccount => "own_account",
            FilterDecision::ExcludedAccount => "excluded_account",
            FilterDecision::Retweet => "retweet",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplyFilter {
    own_account_id: String,
    excluded_account_ids: HashSet<String>,
}

impl ReplyFilter {
    pub fn new<I, S>(own_account_id: impl Into<String>, excluded_account_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            own_account_id: own_account_id.into(),
            excluded_account_ids: excluded_account_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn own_account_id(&self) -> &str {
        &self.own_account_id
    }

    pub fn is_excluded(&self, account_id: &str) -> bool {
        self.excluded_account_ids.contains(account_id)
    }

    /// Decide whether a post gets a reply
    pub fn evaluate(&self, post: &MatchedPost) -> FilterDecision {
        if post.author_id == self.own_account_id {
            return FilterDecision::OwnAccount;
        }
        if self.is_excluded(&post.author_id) {
            return FilterDecision::ExcludedAccount;
        }
        if post.text.contains(RETWEET_MARKER) {
            return FilterDecision::Retweet;
        }
        FilterDecision::Eligible
    }
}
