//! Competitive-programming platforms and handle normalization

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Platforms a profile may carry a handle for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    LeetCode,
    Codeforces,
    CodeChef,
    AtCoder,
    HackerRank,
    GitHub,
}

// Scheme and `www.` are optional and the match is unanchored, so a pasted
// `leetcode.com/u/alice` without a scheme is still recognised.
static LEETCODE: LazyLock<Regex> = LazyLock::new(|| platform_pattern(r"leetcode\.com/(?:u/)?"));
static CODEFORCES: LazyLock<Regex> = LazyLock::new(|| platform_pattern(r"codeforces\.com/profile/"));
static CODECHEF: LazyLock<Regex> = LazyLock::new(|| platform_pattern(r"codechef\.com/users/"));
static ATCODER: LazyLock<Regex> = LazyLock::new(|| platform_pattern(r"atcoder\.jp/users/"));
static HACKERRANK: LazyLock<Regex> = LazyLock::new(|| platform_pattern(r"hackerrank\.com/(?:profile/)?"));
static GITHUB: LazyLock<Regex> = LazyLock::new(|| platform_pattern(r"github\.com/"));

fn platform_pattern(host_and_path: &str) -> Regex {
    Regex::new(&format!(
        r"(?i)(?:https?://)?(?:www\.)?{host_and_path}([^/?#]+)"
    ))
    .expect("platform URL pattern is a valid regex")
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::LeetCode,
        Platform::Codeforces,
        Platform::CodeChef,
        Platform::AtCoder,
        Platform::HackerRank,
        Platform::GitHub,
    ];

    /// Key used in the profile handles map
    pub fn key(&self) -> &'static str {
        match self {
            Platform::LeetCode => "leetcode",
            Platform::Codeforces => "codeforces",
            Platform::CodeChef => "codechef",
            Platform::AtCoder => "atcoder",
            Platform::HackerRank => "hackerrank",
            Platform::GitHub => "github",
        }
    }

    /// Case-insensitive lookup of a handles-map key
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.to_lowercase();
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    fn profile_url_pattern(&self) -> &'static Regex {
        match self {
            Platform::LeetCode => &LEETCODE,
            Platform::Codeforces => &CODEFORCES,
            Platform::CodeChef => &CODECHEF,
            Platform::AtCoder => &ATCODER,
            Platform::HackerRank => &HACKERRANK,
            Platform::GitHub => &GITHUB,
        }
    }

    /// Reduce a bare username or profile URL to a canonical lowercase username
    pub fn normalize(&self, value: &str) -> String {
        if value.is_empty() {
            return String::new();
        }

        match self
            .profile_url_pattern()
            .captures(value)
            .and_then(|caps| caps.get(1))
        {
            Some(username) => username.as_str().trim().to_lowercase(),
            None => value.trim().to_lowercase(),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("Invalid platform: {s}"))
    }
}

/// Normalize a handle for the given platform key.
///
/// Unknown platforms fall back to trim + lowercase; this never fails.
pub fn normalize_handle(platform: &str, value: &str) -> String {
    match Platform::from_key(platform) {
        Some(platform) => platform.normalize(value),
        None => value.trim().to_lowercase(),
    }
}
