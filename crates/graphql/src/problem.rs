//! Mutation `problems` payloads.
//!
//! Mutations answer with a payload object that may carry
//! `problems: [{__typename, message}]` even when the request succeeded.

use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value as Json;

/// One server-reported objection
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Problem {
    #[serde(rename = "__typename", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// Problems listed on a payload
pub fn problems(payload: &Json) -> Result<Vec<Problem>> {
    match payload.get("problems") {
        None | Some(Json::Null) => Ok(Vec::new()),
        Some(list) => Ok(serde_json::from_value(list.clone())?),
    }
}

/// Fail with [`Error::Problem`] if the payload lists any problems
///
/// The error kind is the first problem's type; messages are joined.
pub fn check(payload: &Json) -> Result<()> {
    let problems = problems(payload)?;
    let Some(first) = problems.first() else {
        return Ok(());
    };
    Err(Error::Problem {
        kind: first.kind.clone(),
        message: problems
            .iter()
            .map(|p| p.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_problems() {
        assert!(check(&json!({"account": {"id": "a"}})).is_ok());
        assert!(check(&json!({"problems": []})).is_ok());
        assert!(check(&json!({"problems": null})).is_ok());
    }

    #[test]
    fn test_problems_become_error() {
        let payload = json!({"problems": [
            {"__typename": "InvalidInputProblem", "message": "bad email"},
            {"__typename": "InvalidInputProblem", "message": "bad key"}
        ]});
        assert_eq!(
            check(&payload).unwrap_err(),
            Error::Problem {
                kind: "InvalidInputProblem".into(),
                message: "bad email; bad key".into(),
            }
        );
    }
}
