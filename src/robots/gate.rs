//! Per-scan robots.txt gate
//!
//! The policy is fetched once when the gate is built. Every failure mode
//! degrades to allow-all; the gate never fails closed.

use super::ParsedRobots;
use reqwest::Client;

/// Wildcard user agent used for every decision
pub const ROBOTS_USER_AGENT: &str = "*";

/// Answers whether a page may be processed during one scan
#[derive(Debug, Clone)]
pub struct RobotsGate {
    enabled: bool,
    policy: ParsedRobots,
}

impl RobotsGate {
    /// Builds the gate for a site origin
    ///
    /// # Arguments
    ///
    /// * `origin` - Site origin such as `https://example.com`
    /// * `enabled` - When false nothing is fetched and every page is allowed
    /// * `client` - Shared HTTP client
    pub async fn new(origin: &str, enabled: bool, client: &Client) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));
        let policy = match fetch_policy(&robots_url, client).await {
            Ok(policy) => policy,
            Err(reason) => {
                tracing::warn!(
                    "Robots policy unavailable for {}, allowing all: {}",
                    origin,
                    reason
                );
                ParsedRobots::allow_all()
            }
        };

        Self {
            enabled: true,
            policy,
        }
    }

    /// A gate that allows every page
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            policy: ParsedRobots::allow_all(),
        }
    }

    /// Builds an enabled gate from already-fetched robots.txt content
    pub fn from_policy(policy: ParsedRobots) -> Self {
        Self {
            enabled: true,
            policy,
        }
    }

    /// Returns true if robots rules are being applied
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true if the page may be processed
    pub fn is_allowed(&self, page_url: &str) -> bool {
        if !self.enabled {
            return true;
        }
        self.policy.is_allowed(page_url, ROBOTS_USER_AGENT)
    }
}

async fn fetch_policy(robots_url: &str, client: &Client) -> Result<ParsedRobots, String> {
    tracing::debug!("Fetching {}", robots_url);

    let response = client
        .get(robots_url)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status.as_u16()));
    }

    let body = response.text().await.map_err(|e| e.to_string())?;
    Ok(ParsedRobots::from_content(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_gate_skips_fetch() {
        // Port 9 is discard; nothing is contacted when disabled
        let client = Client::new();
        let gate = RobotsGate::new("http://127.0.0.1:9", false, &client).await;
        assert!(!gate.is_enabled());
        assert!(gate.is_allowed("http://127.0.0.1:9/private"));
    }

    #[tokio::test]
    async fn test_unreachable_host_allows_all() {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let gate = RobotsGate::new("http://127.0.0.1:1", true, &client).await;
        assert!(gate.is_enabled());
        assert!(gate.is_allowed("http://127.0.0.1:1/anything"));
    }

    #[test]
    fn test_from_policy_applies_rules() {
        let gate = RobotsGate::from_policy(ParsedRobots::from_content(
            "User-agent: *\nDisallow: /private",
        ));
        assert!(gate.is_allowed("https://example.com/public"));
        assert!(!gate.is_allowed("https://example.com/private/x"));
    }
}
