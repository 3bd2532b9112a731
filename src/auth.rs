//! Bearer-token gates for the HTTP surface.
//!
//! Two variants exist: the allow-list gate guarding `/api/*` (configured via
//! `API_BEARER_TOKENS`) and the single-token gate guarding the health and
//! documentation endpoints (`SERVER_BEARER_TOKEN`). Both degrade open when
//! nothing is configured, which keeps tokenless deployments working.

/// Split a comma-separated token list, trimming each entry.
pub fn parse_allowlist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Check a presented `Authorization` header value against the allow-list.
///
/// An empty allow-list admits every caller. Otherwise the header must carry a
/// non-empty token (with or without the `Bearer ` prefix) that appears
/// verbatim in the list. The `Err` value is a human-readable denial reason.
pub fn check(allowlist: &[String], presented: Option<&str>) -> Result<(), String> {
    if allowlist.is_empty() {
        return Ok(());
    }
    let Some(header) = presented else {
        return Err("missing Authorization header".to_string());
    };
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    if token.is_empty() {
        return Err("empty bearer token".to_string());
    }
    if allowlist.iter().any(|allowed| allowed == token) {
        Ok(())
    } else {
        Err("bearer token not recognized".to_string())
    }
}

/// Single-token variant of the gate. `None` means the endpoint is open.
pub fn check_single(expected: Option<&str>, presented: Option<&str>) -> Result<(), String> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let Some(header) = presented else {
        return Err("missing Authorization header".to_string());
    };
    let Some(token) = header.strip_prefix("Bearer ") else {
        return Err("Authorization header must use the Bearer scheme".to_string());
    };
    if token.trim() == expected {
        Ok(())
    } else {
        Err("bearer token not recognized".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowlist(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_empty_allowlist_admits_everyone() {
        assert!(check(&[], None).is_ok());
        assert!(check(&[], Some("Bearer anything")).is_ok());
    }

    #[test]
    fn test_matching_token_is_allowed() {
        let list = allowlist(&["t1", "t2"]);
        assert!(check(&list, Some("Bearer t1")).is_ok());
        assert!(check(&list, Some("t2")).is_ok());
    }

    #[test]
    fn test_unknown_token_is_denied_with_reason() {
        let list = allowlist(&["t1"]);
        let reason = check(&list, Some("Bearer t2")).unwrap_err();
        assert!(!reason.is_empty());
    }

    #[test]
    fn test_missing_and_empty_tokens_are_denied() {
        let list = allowlist(&["t1"]);
        assert!(check(&list, None).is_err());
        assert!(check(&list, Some("")).is_err());
        assert!(check(&list, Some("Bearer ")).is_err());
    }

    #[test]
    fn test_prefix_is_stripped_and_whitespace_trimmed() {
        let list = allowlist(&["t1"]);
        assert!(check(&list, Some("Bearer t1 ")).is_ok());
    }

    #[test]
    fn test_parse_allowlist_trims_entries() {
        assert_eq!(parse_allowlist("t1, t2 ,,t3"), allowlist(&["t1", "t2", "t3"]));
        assert!(parse_allowlist("").is_empty());
        assert!(parse_allowlist(" , ").is_empty());
    }

    #[test]
    fn test_single_token_gate() {
        assert!(check_single(None, None).is_ok());
        assert!(check_single(Some("s1"), Some("Bearer s1")).is_ok());
        assert!(check_single(Some("s1"), Some("s1")).is_err());
        assert!(check_single(Some("s1"), Some("Bearer nope")).is_err());
        assert!(check_single(Some("s1"), None).is_err());
    }
}
