//! Callback data grammar
//!
//! Inline buttons carry one of:
//! - `approve:<token>`
//! - `reject:<token>`
//! - `street:<token>:<index>`
//!
//! Prefixes match case-insensitively. Tokens never contain `:`. Anything
//! malformed fails to parse and must be rejected without touching any state.

const APPROVE_PREFIX: &str = "approve:";
const REJECT_PREFIX: &str = "reject:";
const STREET_PREFIX: &str = "street:";

/// A parsed inline-button action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Approve { token: String },
    Reject { token: String },
    SelectStreet { token: String, index: usize },
}

impl CallbackAction {
    pub fn token(&self) -> &str {
        match self {
            CallbackAction::Approve { token }
            | CallbackAction::Reject { token }
            | CallbackAction::SelectStreet { token, .. } => token,
        }
    }
}

/// Parse callback data. `None` means the payload is malformed or carries an
/// unknown action.
pub fn parse(data: &str) -> Option<CallbackAction> {
    if data.trim().is_empty() {
        return None;
    }

    if let Some(token) = strip_prefix_ignore_case(data, APPROVE_PREFIX) {
        return non_blank(token).map(|token| CallbackAction::Approve { token });
    }

    if let Some(token) = strip_prefix_ignore_case(data, REJECT_PREFIX) {
        return non_blank(token).map(|token| CallbackAction::Reject { token });
    }

    if let Some(rest) = strip_prefix_ignore_case(data, STREET_PREFIX) {
        let mut segments = rest.split(':');
        let token = non_blank(segments.next()?)?;
        let index = segments.next()?.parse::<usize>().ok()?;
        // A token never contains ':', so a third segment means garbage.
        if segments.next().is_some() {
            return None;
        }

        return Some(CallbackAction::SelectStreet { token, index });
    }

    None
}

fn strip_prefix_ignore_case<'a>(data: &'a str, prefix: &str) -> Option<&'a str> {
    let head = data.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        data.get(prefix.len()..)
    } else {
        None
    }
}

fn non_blank(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_approve_and_reject() {
        assert_eq!(
            parse("approve:abc"),
            Some(CallbackAction::Approve { token: "abc".into() })
        );
        assert_eq!(
            parse("reject:abc"),
            Some(CallbackAction::Reject { token: "abc".into() })
        );
    }

    #[test]
    fn prefix_matching_is_case_insensitive() {
        assert_eq!(
            parse("APPROVE:abc"),
            Some(CallbackAction::Approve { token: "abc".into() })
        );
        assert_eq!(
            parse("Street:tok:0"),
            Some(CallbackAction::SelectStreet { token: "tok".into(), index: 0 })
        );
    }

    #[test]
    fn parses_street_selection_with_index() {
        assert_eq!(
            parse("street:tok:2"),
            Some(CallbackAction::SelectStreet { token: "tok".into(), index: 2 })
        );
    }

    #[test]
    fn rejects_malformed_payloads() {
        for data in [
            "",
            "   ",
            "approve:",
            "approve: ",
            "reject:",
            "street:tok",
            "street:tok:",
            "street:tok:x",
            "street::2",
            "street:tok:1:extra",
            "unknown:1",
            "approve",
        ] {
            assert_eq!(parse(data), None, "expected {:?} to fail parsing", data);
        }
    }

    #[test]
    fn negative_index_fails_to_parse() {
        assert_eq!(parse("street:tok:-1"), None);
    }
}
