//! Error taxonomy shared by every daemon operation, and the classifier that
//! maps transport failures and non-success responses onto it.

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::Credentials;

pub const TIMEOUT_HEADER: &str = "Connection Timeout!!!";
pub const TIMEOUT_BODY: &str = "Please check your Internet/VPN connection for connectivity to the daemon.";
pub const NETWORK_HEADER: &str = "Network Error!!!";
pub const UNAUTHORIZED_HEADER: &str = "Unauthorized Access!!!";
pub const UNAUTHORIZED_MISSING_CONFIG: &str = "EMAIL_ID or ACCESS_TOKEN is not present in proclink config file.";
pub const UNAUTHORIZED_INVALID_CONFIG: &str =
    "Please check the EMAIL_ID and ACCESS_TOKEN validity in proclink config file.";
pub const FORBIDDEN_MESSAGE: &str =
    "Access denied. You are not authorized to perform this operation. Please contact the job admin.";
pub const NOT_FOUND_MESSAGE: &str = "Job not found";
pub const EMPTY_RESULT_MESSAGE: &str = "No scheduled jobs found";
pub const SERVER_ERROR_HEADER: &str = "Server Error!!!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    EmptyResult,
    Generic,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message}")]
    Network { timeout: bool, message: String },

    /// `body` is the raw response body, kept even when `message` is canned.
    #[error("{message}")]
    Http { kind: HttpErrorKind, message: String, body: String },

    #[error("Failed to decode daemon response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No definitive status received for execution with id {execution_id} from the daemon")]
    Exhausted { execution_id: u64 },

    #[error("Failed to build request: {0}")]
    Request(String),

    #[error("Encountered error while loading config: {0}")]
    Config(String),
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Network { timeout: true, .. })
    }

    pub fn http_kind(&self) -> Option<HttpErrorKind> {
        match self {
            ClientError::Http { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The daemon's own explanation, when it says more than `message`.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Http { message, body, .. } => {
                let body = body.trim();
                (!body.is_empty() && body != message.trim()).then_some(body)
            }
            _ => None,
        }
    }

    /// What the user should try next, if there is anything useful to say.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ClientError::Network { timeout: true, .. } => {
                Some("Check your network connectivity to the daemon and try again.")
            }
            ClientError::Http { kind: HttpErrorKind::Unauthorized, .. } => {
                Some("Check EMAIL_ID and ACCESS_TOKEN with `proclink config show`.")
            }
            ClientError::Exhausted { .. } => {
                Some("The job may still be running; check again later with `proclink status <id>`.")
            }
            ClientError::Config(_) => Some("Set up the client with `proclink config set PROCLINK_HOST=<host:port>`."),
            _ => None,
        }
    }
}

/// A transport-level failure: the request never produced an HTTP response.
pub trait TransportError: std::fmt::Display {
    fn is_timeout(&self) -> bool;
}

impl TransportError for reqwest::Error {
    fn is_timeout(&self) -> bool {
        reqwest::Error::is_timeout(self)
    }
}

impl TransportError for std::io::Error {
    fn is_timeout(&self) -> bool {
        self.kind() == std::io::ErrorKind::TimedOut
    }
}

impl TransportError for tokio_tungstenite::tungstenite::Error {
    fn is_timeout(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::TimedOut)
    }
}

pub fn classify_transport<E: TransportError + ?Sized>(err: &E) -> ClientError {
    if err.is_timeout() {
        ClientError::Network {
            timeout: true,
            message: format!("{}\n{}\n{}", TIMEOUT_HEADER, err, TIMEOUT_BODY),
        }
    } else {
        ClientError::Network {
            timeout: false,
            message: format!("{}\n{}", NETWORK_HEADER, err),
        }
    }
}

/// Classify a response whose status was not the one the operation expects.
pub fn classify_status(status: u16, body: String, credentials: &Credentials) -> ClientError {
    let (kind, message) = match status {
        401 => {
            let detail = if credentials.is_incomplete() {
                UNAUTHORIZED_MISSING_CONFIG
            } else {
                UNAUTHORIZED_INVALID_CONFIG
            };
            (HttpErrorKind::Unauthorized, format!("{}\n{}", UNAUTHORIZED_HEADER, detail))
        }
        // The daemon sends human-readable text for these.
        400 | 500 => (HttpErrorKind::Generic, body.clone()),
        403 => (HttpErrorKind::Forbidden, FORBIDDEN_MESSAGE.to_string()),
        404 => (HttpErrorKind::NotFound, NOT_FOUND_MESSAGE.to_string()),
        204 => (HttpErrorKind::EmptyResult, EMPTY_RESULT_MESSAGE.to_string()),
        other => {
            let reason = StatusCode::from_u16(other)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown Status");
            (
                HttpErrorKind::Generic,
                format!("{}\nStatus Code: {}, {}", SERVER_ERROR_HEADER, other, reason),
            )
        }
    };

    ClientError::Http { kind, message, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    struct FakeTransport {
        message: &'static str,
        timeout: bool,
    }

    impl fmt::Display for FakeTransport {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl TransportError for FakeTransport {
        fn is_timeout(&self) -> bool {
            self.timeout
        }
    }

    fn credentials(email: &str, token: &str) -> Credentials {
        Credentials {
            host: "daemon.example.com".into(),
            email: email.into(),
            access_token: token.into(),
        }
    }

    #[test]
    fn transport_timeout_is_flagged_and_embeds_cause() {
        let err = classify_transport(&FakeTransport { message: "Unable to reach daemon", timeout: true });
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Connection Timeout!!!\nUnable to reach daemon\nPlease check your Internet/VPN connection for connectivity to the daemon."
        );
        assert!(err.hint().is_some());
    }

    #[test]
    fn other_transport_failures_are_not_timeouts() {
        let err = classify_transport(&FakeTransport { message: "Unknown Error", timeout: false });
        assert!(matches!(err, ClientError::Network { timeout: false, .. }));
        assert_eq!(err.to_string(), "Network Error!!!\nUnknown Error");
    }

    #[test]
    fn io_timed_out_counts_as_timeout() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline");
        assert!(classify_transport(&io).is_timeout());
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(!classify_transport(&refused).is_timeout());
    }

    #[test]
    fn unauthorized_distinguishes_missing_from_invalid_credentials() {
        let invalid = classify_status(401, "{}".into(), &credentials("dev@example.com", "token"));
        assert_eq!(invalid.http_kind(), Some(HttpErrorKind::Unauthorized));
        assert_eq!(
            invalid.to_string(),
            "Unauthorized Access!!!\nPlease check the EMAIL_ID and ACCESS_TOKEN validity in proclink config file."
        );

        for (email, token) in [("dev@example.com", ""), ("", "token"), ("", "")] {
            let missing = classify_status(401, String::new(), &credentials(email, token));
            assert_eq!(missing.http_kind(), Some(HttpErrorKind::Unauthorized));
            assert_eq!(
                missing.to_string(),
                "Unauthorized Access!!!\nEMAIL_ID or ACCESS_TOKEN is not present in proclink config file."
            );
        }
    }

    #[test]
    fn bad_request_and_server_error_surface_body_verbatim() {
        let creds = credentials("dev@example.com", "token");
        for status in [400, 500] {
            let body = "Invalid Job ID\n  with  spacing ".to_string();
            let err = classify_status(status, body.clone(), &creds);
            assert_eq!(err.http_kind(), Some(HttpErrorKind::Generic));
            assert_eq!(err.to_string(), body);
        }
    }

    #[test]
    fn status_grid_maps_to_kinds() {
        let creds = credentials("dev@example.com", "token");
        let cases = [
            (403, HttpErrorKind::Forbidden, FORBIDDEN_MESSAGE),
            (404, HttpErrorKind::NotFound, NOT_FOUND_MESSAGE),
            (204, HttpErrorKind::EmptyResult, EMPTY_RESULT_MESSAGE),
        ];
        for (status, kind, message) in cases {
            let err = classify_status(status, "ignored".into(), &creds);
            assert_eq!(err.http_kind(), Some(kind), "status {status}");
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn other_statuses_report_code_and_reason_and_keep_body() {
        let creds = credentials("dev@example.com", "token");
        let err = classify_status(409, "duplicate schedule".into(), &creds);
        assert_eq!(err.to_string(), "Server Error!!!\nStatus Code: 409, Conflict");
        match err {
            ClientError::Http { kind, body, .. } => {
                assert_eq!(kind, HttpErrorKind::Generic);
                assert_eq!(body, "duplicate schedule");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let unknown = classify_status(599, String::new(), &creds);
        assert_eq!(unknown.to_string(), "Server Error!!!\nStatus Code: 599, Unknown Status");
    }

    #[test]
    fn detail_only_when_body_adds_information() {
        let creds = credentials("dev@example.com", "token");

        let conflict = classify_status(409, "Schedule job name and args duplicate is found\n".into(), &creds);
        assert_eq!(conflict.detail(), Some("Schedule job name and args duplicate is found"));

        let verbatim = classify_status(500, "list proc error".into(), &creds);
        assert_eq!(verbatim.detail(), None);

        let empty = classify_status(204, String::new(), &creds);
        assert_eq!(empty.detail(), None);

        assert_eq!(ClientError::Exhausted { execution_id: 1 }.detail(), None);
    }

    #[test]
    fn exhausted_names_execution_and_suggests_waiting() {
        let err = ClientError::Exhausted { execution_id: 42 };
        assert_eq!(
            err.to_string(),
            "No definitive status received for execution with id 42 from the daemon"
        );
        assert!(err.hint().unwrap().contains("still be running"));
    }
}
