use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static CHANNEL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/channels/(\d+)/(\d+)").unwrap_or_else(|e| panic!("invalid channel regex: {e}"))
});

/// Community and channel ids extracted from a shareable link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReference {
    pub community_id: Option<String>,
    pub channel_id: String,
}

impl ChannelReference {
    /// Segment used in permalinks for the community part.
    ///
    /// Links without a community resolve to the direct-message scope.
    pub fn community_segment(&self) -> &str {
        self.community_id.as_deref().unwrap_or("@me")
    }
}

/// Extract `/channels/{community}/{channel}` from anywhere in `url`.
///
/// Returns `None` when the pattern is absent; callers skip such inputs.
pub fn parse(url: &str) -> Option<ChannelReference> {
    let caps = CHANNEL_PATH.captures(url)?;
    Some(ChannelReference {
        community_id: Some(caps[1].to_string()),
        channel_id: caps[2].to_string(),
    })
}
