//! Connection admission.
//!
//! Runs the ordered gates for a new connection: parameter validation, token
//! authorization, object lookup, and the endpoint's pre-relay check. The
//! first failing gate rejects; no gate opens a subscription or touches the
//! socket. The caller applies the resulting decision to the transport.

use tracing::{debug, warn};

use crate::model::Principal;
use crate::state::AppState;

use super::channels::StreamTopic;
use super::policy::{EndpointPolicy, Verdict};
use super::session::NotifySession;

/// Parameters extracted from the connection request, validated once.
#[derive(Debug, Clone, Default)]
pub struct ConnectParams {
    /// Object id from the connection path.
    pub object_id: Option<String>,

    /// Access token from the `token` query parameter.
    pub token: Option<String>,
}

/// Why a connection was turned away.
///
/// Every variant closes the socket with the same policy-violation code and
/// no payload; which gate failed is visible in logs only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// A required path or query parameter was missing.
    #[error("required connection parameter missing")]
    MalformedRequest,

    /// The token was rejected or the auth service failed.
    #[error("authorization failed")]
    AuthorizationFailure,

    /// The object does not exist or is not owned by the principal.
    #[error("object not found")]
    ObjectNotFound,
}

/// Admission decision for one connection attempt.
#[derive(Debug)]
pub enum Admission {
    /// Every gate passed; start the relay for this session.
    Admitted(NotifySession),

    /// The pre-relay check ended the connection: deliver this payload and
    /// close normally without subscribing.
    ShortCircuit(serde_json::Value),

    /// A gate failed; close with the policy-violation code.
    Rejected(Rejection),
}

/// Runs the admission gates in order.
pub async fn admit(state: &AppState, policy: &EndpointPolicy, params: &ConnectParams) -> Admission {
    let Some(object_id) = params.object_id.as_deref().filter(|id| !id.is_empty()) else {
        return Admission::Rejected(Rejection::MalformedRequest);
    };

    let principal = if policy.require_auth {
        match authenticate(state, policy, params).await {
            Ok(principal) => Some(principal),
            Err(rejection) => return Admission::Rejected(rejection),
        }
    } else {
        None
    };

    let object = match state
        .store
        .load(policy.kind, object_id, principal.as_ref())
        .await
    {
        Ok(Some(object)) => object,
        Ok(None) => {
            debug!(kind = policy.kind.as_str(), id = object_id, "object not found");
            return Admission::Rejected(Rejection::ObjectNotFound);
        }
        Err(err) => {
            warn!(kind = policy.kind.as_str(), id = object_id, error = %err, "object lookup failed");
            return Admission::Rejected(Rejection::ObjectNotFound);
        }
    };

    match (policy.short_circuit)(&object) {
        Verdict::Terminate(payload) => Admission::ShortCircuit(payload),
        Verdict::Continue => Admission::Admitted(NotifySession::new(
            StreamTopic::new(policy.kind, object_id),
            principal,
            object,
        )),
    }
}

async fn authenticate(
    state: &AppState,
    policy: &EndpointPolicy,
    params: &ConnectParams,
) -> Result<Principal, Rejection> {
    let Some(token) = params.token.as_deref().filter(|token| !token.is_empty()) else {
        return Err(Rejection::MalformedRequest);
    };

    state
        .authorizer
        .authorize(token, policy.kind.management_scope())
        .await
        .map_err(|err| {
            debug!(kind = policy.kind.as_str(), error = %err, "token rejected");
            Rejection::AuthorizationFailure
        })
}
