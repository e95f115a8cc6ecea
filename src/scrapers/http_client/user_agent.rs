//! User agent handling for HTTP requests.

/// Desktop Chrome identity sent by default; the tax site rejects obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.0.0 Safari/537.36";

/// Configured user agent, or [`DEFAULT_USER_AGENT`] when none is set.
pub fn resolve_user_agent(config: Option<&str>) -> String {
    config.unwrap_or(DEFAULT_USER_AGENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_browser_identity() {
        let ua = resolve_user_agent(None);
        assert!(ua.starts_with("Mozilla/5.0"));
        assert!(ua.contains("Chrome"));
    }

    #[test]
    fn test_custom_agent_verbatim() {
        assert_eq!(resolve_user_agent(Some("CountyAudit/2.0")), "CountyAudit/2.0");
    }
}
