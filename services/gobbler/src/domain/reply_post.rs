/// Reply post composition
///
/// A reply never sets a reply-to field; the triggering post is referenced only
/// through the status URL embedded in the text.
use super::MatchedPost;

/// Fixed greeting that opens every reply
pub const REPLY_GREETING: &str = "Robble, Robble, Good Gobble";

/// Base of the status URL embedded in replies
const STATUS_URL_BASE: &str = "https://twitter.com";

/// Outgoing reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyPost {
    text: String,
}

impl ReplyPost {
    /// Build the reply for a matched post
    pub fn for_post(post: &MatchedPost) -> Self {
        Self {
            text: format!(
                "{} {}",
                REPLY_GREETING,
                status_url(&post.author_id, &post.id)
            ),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Status URL of a post
pub fn status_url(author_id: &str, post_id: &str) -> String {
    format!("{}/{}/status/{}", STATUS_URL_BASE, author_id, post_id)
}
