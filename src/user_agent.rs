//! Default User-Agent string for guard requests.

/// Default User-Agent sent by every guard request unless the config overrides it.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("RestGuard v{version}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent_contains_crate_version() {
        let ua = default_user_agent();
        assert_eq!(
            ua.strip_prefix("RestGuard v"),
            Some(env!("CARGO_PKG_VERSION")),
            "UA must be 'RestGuard v<version>': {ua}"
        );
    }
}
