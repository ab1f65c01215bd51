//! GitHub webhook deliveries.
//!
//! A delivery is authenticated with the shared secret (`X-Hub-Signature-256`),
//! then dispatched on its event name (`X-GitHub-Event`). Pull request
//! payloads are parsed once, here, into a [`PullRequestEvent`].

use hmac::{Hmac, Mac};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

use crate::{
    github::PullRequestHost,
    lifecycle::{BillError, Lifecycle},
    model::{PullRequestAction, PullRequestEvent},
};

type HmacSha256 = Hmac<Sha256>;

/// Why a delivery was refused or could not be processed.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("request does not contain X-Hub-Signature-256 header")]
    MissingSignature,

    #[error("request does not contain X-GitHub-Event header")]
    MissingEvent,

    #[error("unsupported X-Hub-Signature-256 digest mode: {0}")]
    UnsupportedDigest(String),

    #[error("invalid X-Hub-Signature-256 signature")]
    InvalidSignature,

    #[error("unsupported X-GitHub-Event header found: {0}")]
    UnsupportedEvent(String),

    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Bill(#[from] BillError),
}

impl WebhookError {
    /// The HTTP status a server should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidSignature => 403,
            Self::Bill(_) => 500,
            _ => 400,
        }
    }
}

/// One webhook request as received.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    pub signature: Option<&'a str>,
    pub event: Option<&'a str>,
    pub body: &'a [u8],
}

/// What a delivery did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WebhookResponse {
    Pong,
    PushReceived,
    PullRequest {
        action: PullRequestAction,
        #[serde(skip_serializing_if = "Option::is_none")]
        pull_request: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bill: Option<i64>,
    },
}

impl WebhookResponse {
    /// The response body: plain text for pings and pushes, JSON otherwise.
    pub fn body(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Pong => Ok("pong".into()),
            Self::PushReceived => Ok("push received".into()),
            Self::PullRequest { .. } => serde_json::to_string(self),
        }
    }
}

/// Authenticates and processes a delivery.
pub fn receive<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    secret: &str,
    delivery: Delivery<'_>,
    now: Timestamp,
) -> Result<WebhookResponse, WebhookError> {
    let result = delivery
        .signature
        .ok_or(WebhookError::MissingSignature)
        .and_then(|signature| {
            let event = delivery.event.ok_or(WebhookError::MissingEvent)?;
            verify_signature(secret, signature, delivery.body)?;
            Ok(event)
        });
    let event = result.inspect_err(|e| warn!(error = %e, "GitHub webhook refused"))?;

    handle(lifecycle, event, delivery.body, now)
}

/// Checks a `sha256=<hex>` signature over `body`.
pub fn verify_signature(secret: &str, header: &str, body: &[u8]) -> Result<(), WebhookError> {
    let (digest, signature) = header
        .split_once('=')
        .ok_or_else(|| WebhookError::UnsupportedDigest(header.to_string()))?;
    if digest != "sha256" {
        return Err(WebhookError::UnsupportedDigest(digest.to_string()));
    }
    let signature = hex::decode(signature).map_err(|_| WebhookError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&signature)
        .map_err(|_| WebhookError::InvalidSignature)
}

/// Dispatches an authenticated delivery on its event name.
pub fn handle<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    event: &str,
    body: &[u8],
    now: Timestamp,
) -> Result<WebhookResponse, WebhookError> {
    match event {
        "ping" => Ok(WebhookResponse::Pong),
        "push" => Ok(WebhookResponse::PushReceived),
        "pull_request" => pull_request(lifecycle, serde_json::from_slice(body)?, now),
        other => {
            warn!(event = other, "GitHub webhook failed: unsupported event");
            Err(WebhookError::UnsupportedEvent(other.to_string()))
        }
    }
}

fn pull_request<H: PullRequestHost>(
    lifecycle: &Lifecycle<'_, H>,
    payload: PullRequestPayload,
    now: Timestamp,
) -> Result<WebhookResponse, WebhookError> {
    let Some(action) = PullRequestAction::parse(&payload.action) else {
        warn!(
            action = %payload.action,
            "GitHub pull request webhook failed: unsupported action"
        );
        return Err(WebhookError::UnsupportedAction(payload.action));
    };
    let event = PullRequestEvent::from(payload.pull_request);
    info!(pr = event.number, action = action.as_str(), "pull request webhook");

    let (pr, bill) = match action {
        PullRequestAction::Opened | PullRequestAction::Reopened => {
            let (pr, bill) = lifecycle.open_pull_request(&event, now)?;
            (Some(pr), bill)
        }
        PullRequestAction::ReadyForReview => lifecycle.ready_for_review(event.number, now)?,
        PullRequestAction::Closed => lifecycle.close_pull_request(event.number, now)?,
    };

    Ok(WebhookResponse::PullRequest {
        action,
        pull_request: pr.map(|pr| pr.number),
        bill: bill.map(|bill| bill.id),
    })
}

// ── GitHub payload shapes ──

#[derive(Debug, Deserialize)]
struct PullRequestPayload {
    action: String,
    pull_request: PullRequestObject,
}

#[derive(Debug, Deserialize)]
struct PullRequestObject {
    number: i64,
    title: String,
    #[serde(default)]
    additions: i64,
    #[serde(default)]
    deletions: i64,
    diff_url: String,
    user: Account,
    state: String,
    head: Head,
    #[serde(default)]
    draft: bool,
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct Head {
    sha: String,
}

impl From<PullRequestObject> for PullRequestEvent {
    fn from(pr: PullRequestObject) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            additions: pr.additions,
            deletions: pr.deletions,
            diff_url: pr.diff_url,
            author_login: pr.user.login,
            author_id: pr.user.id.to_string(),
            sha: pr.head.sha,
            state: pr.state,
            draft: pr.draft,
            // GitHub sends null for an empty body.
            body: pr.body.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::{lifecycle::harness::*, model::BillStatus};

    const SECRET: &str = "It's a Secret to Everybody";

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn payload(action: &str, number: i64, user_id: u64, draft: bool) -> Vec<u8> {
        json!({
            "action": action,
            "number": number,
            "pull_request": {
                "number": number,
                "title": "Add widget",
                "additions": 4,
                "deletions": 1,
                "diff_url": format!("https://github.com/owner/repo/pull/{number}.diff"),
                "user": { "login": "alice", "id": user_id },
                "state": if action == "closed" { "closed" } else { "open" },
                "head": { "sha": format!("{number:040x}") },
                "draft": draft,
                "body": null,
            },
        })
        .to_string()
        .into_bytes()
    }

    fn deliver(h: &Harness, event: &str, body: &[u8]) -> Result<WebhookResponse, WebhookError> {
        let signature = sign(SECRET, body);
        receive(
            &h.lifecycle(),
            SECRET,
            Delivery {
                signature: Some(&signature),
                event: Some(event),
                body,
            },
            at(0),
        )
    }

    #[test]
    fn signature_from_github_docs_verifies() {
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";

        assert!(verify_signature(SECRET, header, b"Hello, World!").is_ok());
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let body = b"{}";
        let header = sign("another secret", body);

        assert!(matches!(
            verify_signature(SECRET, &header, body).unwrap_err(),
            WebhookError::InvalidSignature
        ));
    }

    #[test]
    fn tampered_body_is_invalid() {
        let header = sign(SECRET, b"original");

        assert!(verify_signature(SECRET, &header, b"tampered").is_err());
    }

    #[test]
    fn other_digests_are_unsupported() {
        let err = verify_signature(SECRET, "sha1=abcdef", b"").unwrap_err();

        assert!(matches!(err, WebhookError::UnsupportedDigest(d) if d == "sha1"));
        assert_eq!(
            WebhookError::UnsupportedDigest("sha1".into()).status_code(),
            400
        );
        assert_eq!(WebhookError::InvalidSignature.status_code(), 403);
    }

    #[test]
    fn missing_headers_are_refused() {
        let h = Harness::new(ORDINARY_DIFF);
        let no_signature = Delivery {
            signature: None,
            event: Some("ping"),
            body: b"{}",
        };
        let signature = sign(SECRET, b"{}");
        let no_event = Delivery {
            signature: Some(&signature),
            event: None,
            body: b"{}",
        };

        assert!(matches!(
            receive(&h.lifecycle(), SECRET, no_signature, at(0)).unwrap_err(),
            WebhookError::MissingSignature
        ));
        assert!(matches!(
            receive(&h.lifecycle(), SECRET, no_event, at(0)).unwrap_err(),
            WebhookError::MissingEvent
        ));
    }

    #[test]
    fn ping_and_push_are_acknowledged() {
        let h = Harness::new(ORDINARY_DIFF);

        let pong = deliver(&h, "ping", b"{}").unwrap();
        let push = deliver(&h, "push", b"{}").unwrap();

        assert_eq!(pong.body().unwrap(), "pong");
        assert_eq!(push.body().unwrap(), "push received");
    }

    #[test]
    fn unsupported_event_is_refused() {
        let h = Harness::new(ORDINARY_DIFF);

        assert!(matches!(
            deliver(&h, "issues", b"{}").unwrap_err(),
            WebhookError::UnsupportedEvent(e) if e == "issues"
        ));
    }

    #[test]
    fn unsupported_action_is_refused() {
        let h = Harness::new(ORDINARY_DIFF);

        let err = deliver(&h, "pull_request", &payload("edited", 7, 1001, false)).unwrap_err();

        assert!(matches!(err, WebhookError::UnsupportedAction(a) if a == "edited"));
    }

    #[test]
    fn malformed_payload_is_refused() {
        let h = Harness::new(ORDINARY_DIFF);

        let err = deliver(&h, "pull_request", br#"{"action": "opened"}"#).unwrap_err();

        assert!(matches!(err, WebhookError::Payload(_)));
    }

    #[test]
    fn opened_pull_request_creates_bill() {
        let h = Harness::new(ORDINARY_DIFF);
        h.storage.create_user("alice", "1001").unwrap();

        let response = deliver(&h, "pull_request", &payload("opened", 7, 1001, false)).unwrap();

        let bill = h.storage.live_bill_for_pull_request(7).unwrap().unwrap();
        assert_eq!(bill.description, "");
        assert_eq!(
            response,
            WebhookResponse::PullRequest {
                action: PullRequestAction::Opened,
                pull_request: Some(7),
                bill: Some(bill.id),
            }
        );
        assert_eq!(
            response.body().unwrap(),
            format!(r#"{{"action":"opened","pull_request":7,"bill":{}}}"#, bill.id)
        );
    }

    #[test]
    fn opened_by_stranger_reports_no_bill() {
        let h = Harness::new(ORDINARY_DIFF);

        let response = deliver(&h, "pull_request", &payload("opened", 7, 404, false)).unwrap();

        assert_eq!(response.body().unwrap(), r#"{"action":"opened","pull_request":7}"#);
    }

    #[test]
    fn draft_then_ready_for_review_publishes() {
        let h = Harness::new(ORDINARY_DIFF);
        h.storage.create_user("alice", "1001").unwrap();
        deliver(&h, "pull_request", &payload("opened", 5, 1001, true)).unwrap();
        let draft = h.storage.live_bill_for_pull_request(5).unwrap().unwrap();
        assert_eq!(draft.status, BillStatus::Draft);

        deliver(&h, "pull_request", &payload("ready_for_review", 5, 1001, false)).unwrap();

        assert_eq!(h.storage.load_bill(draft.id).unwrap().status, BillStatus::Open);
    }

    #[test]
    fn closed_pull_request_closes_bill() {
        let h = Harness::new(ORDINARY_DIFF);
        h.storage.create_user("alice", "1001").unwrap();
        deliver(&h, "pull_request", &payload("opened", 7, 1001, false)).unwrap();

        let response = deliver(&h, "pull_request", &payload("closed", 7, 1001, false)).unwrap();

        let WebhookResponse::PullRequest { bill: Some(id), .. } = response else {
            panic!("expected a closed bill, got {response:?}");
        };
        assert_eq!(h.storage.load_bill(id).unwrap().status, BillStatus::Closed);
    }

    #[test]
    fn closing_unknown_pull_request_is_noop() {
        let h = Harness::new(ORDINARY_DIFF);

        let response = deliver(&h, "pull_request", &payload("closed", 99, 1001, false)).unwrap();

        assert_eq!(response.body().unwrap(), r#"{"action":"closed"}"#);
    }
}
