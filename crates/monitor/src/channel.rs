//! Channel identities and the structured dedup key.

use std::fmt;

/// Streaming platform a channel lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Twitch,
    Youtube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::Youtube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named stream source on a platform, drawn from static configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    pub platform: Platform,
    pub name: String,
}

impl Channel {
    pub fn new(platform: Platform, name: impl Into<String>) -> Self {
        Self {
            platform,
            name: name.into(),
        }
    }

    /// Registry key for this channel.
    pub fn key(&self) -> ChannelKey {
        ChannelKey {
            platform: self.platform,
            name: self.name.clone(),
        }
    }

    /// Public page used to resolve or record the channel's live stream.
    pub fn page_url(&self) -> String {
        match self.platform {
            Platform::Twitch => format!("https://www.twitch.tv/{}", self.name),
            Platform::Youtube => format!("https://www.youtube.com/{}/live", self.name),
        }
    }

    /// Filename-safe identifier. YouTube handles lose their `@` prefix.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.platform, self.name.trim_start_matches('@'))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.name)
    }
}

/// Key identifying a channel in the active-download registry.
///
/// Platform and name are separate fields, so two differently partitioned
/// inputs can never produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    pub platform: Platform,
    pub name: String,
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.name)
    }
}
