//! Uniform `(status, message, payload)` envelope returned by every public
//! catalog operation and by metadata providers.

use serde::{Deserialize, Serialize};

pub const OK: u16 = 200;
pub const BAD_REQUEST: u16 = 400;
pub const NOT_FOUND: u16 = 404;
pub const SERVER_ERROR: u16 = 500;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<T>,
}

impl<T> Response<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            status: OK,
            message: "OK".to_string(),
            payload: Some(payload),
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            payload: None,
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::error(NOT_FOUND, format!("Not found: {}", what))
    }

    pub fn is_success(&self) -> bool {
        self.status == OK
    }

    /// Convert back into a `Result`, carrying the status on failure
    pub fn into_result(self) -> std::result::Result<T, (u16, String)> {
        match (self.status, self.payload) {
            (OK, Some(payload)) => Ok(payload),
            (OK, None) => Err((self.status, "missing payload".to_string())),
            (status, _) => Err((status, self.message)),
        }
    }
}

impl<T> From<crate::Result<T>> for Response<T> {
    fn from(result: crate::Result<T>) -> Self {
        match result {
            Ok(payload) => Response::ok(payload),
            Err(e) => Response::error(e.status(), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_from_result() {
        let ok: Response<u32> = Ok(3).into();
        assert!(ok.is_success());
        assert_eq!(ok.payload, Some(3));

        let missing: Response<u32> = Err(Error::NotFound("Foo::bar".into())).into();
        assert_eq!(missing.status, NOT_FOUND);
        assert!(missing.message.contains("Foo::bar"));
        assert!(missing.payload.is_none());
    }

    #[test]
    fn test_into_result() {
        assert_eq!(Response::ok("x").into_result(), Ok("x"));
        let err: Response<()> = Response::error(503, "down");
        assert_eq!(err.into_result(), Err((503, "down".to_string())));
    }

    #[test]
    fn test_json_shape() {
        let resp: Response<()> = Response::not_found("Demo");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], 404);
        assert!(json.get("payload").is_none());
    }
}
