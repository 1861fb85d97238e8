//! Turning free-form version arguments into the `major.minor` token the
//! release indexes are organised by.

use crate::error::GetBlenderError;
use anyhow::Result;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;

const TOKEN_PATTERN: &str = r"(\d)\.(\d\d)";

/// Canonical `major.minor` pair, e.g. `2.79`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken {
    major: u32,
    minor: u32,
    text: String,
}

impl VersionToken {
    /// Finds the first `d.dd` pair anywhere in `input`.
    pub fn parse(input: &str) -> Result<Self> {
        let re = Regex::new(TOKEN_PATTERN)?;
        let caps = re
            .captures(input)
            .ok_or_else(|| GetBlenderError::UnparseableVersion {
                input: input.to_string(),
            })?;

        Ok(VersionToken {
            major: caps[1].parse()?,
            minor: caps[2].parse()?,
            text: caps[0].to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Ord for VersionToken {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor).cmp(&(other.major, other.minor))
    }
}

impl PartialOrd for VersionToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A version as asked for on the command line.
///
/// `label` is the argument cut at its first hyphen (`2.79b-custom` -> `2.79b`)
/// and names the cache directory; `token` drives index lookup and matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedVersion {
    pub label: String,
    pub token: VersionToken,
}

impl RequestedVersion {
    pub fn parse(input: &str) -> Result<Self> {
        let label = input.split('-').next().unwrap_or(input).trim();
        let token = VersionToken::parse(label).map_err(|_| GetBlenderError::UnparseableVersion {
            input: input.to_string(),
        })?;

        tracing::debug!("Requested version '{}' -> label {}, token {}", input, label, token);

        Ok(RequestedVersion {
            label: label.to_string(),
            token,
        })
    }
}

impl fmt::Display for RequestedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualifier_is_stripped() {
        let requested = RequestedVersion::parse("2.79b-custom").unwrap();
        assert_eq!(requested.label, "2.79b");
        assert_eq!(requested.token.as_str(), "2.79");

        let requested = RequestedVersion::parse("2.83-nightly").unwrap();
        assert_eq!(requested.label, "2.83");
        assert_eq!(requested.token.as_str(), "2.83");
    }

    #[test]
    fn test_token_found_inside_noise() {
        assert_eq!(VersionToken::parse("Blender2.80rc1").unwrap().as_str(), "2.80");
        assert_eq!(VersionToken::parse("2.79").unwrap().as_str(), "2.79");
    }

    #[test]
    fn test_unparseable_versions() {
        for input in ["", "latest", "2", "2.7", "v3-2.80"] {
            let err = RequestedVersion::parse(input).unwrap_err();
            match err.downcast_ref::<GetBlenderError>() {
                Some(GetBlenderError::UnparseableVersion { input: reported }) => {
                    assert_eq!(reported, input)
                }
                other => panic!("unexpected error for '{}': {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_tokens_order_numerically() {
        let mut tokens: Vec<VersionToken> = ["2.80", "2.79", "3.00", "2.83"]
            .iter()
            .map(|v| VersionToken::parse(v).unwrap())
            .collect();
        tokens.sort();
        let sorted: Vec<&str> = tokens.iter().map(|t| t.as_str()).collect();
        assert_eq!(sorted, vec!["2.79", "2.80", "2.83", "3.00"]);
    }
}
