//! The booking status transition table.
//!
//! Every allowed edge of the lifecycle graph is declared here together with
//! the role permitted to drive it. Handlers consult the table exactly once,
//! before any mutation; there are no inline role checks scattered through
//! the engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::BookingStatus;
use crate::error::BookingError;

/// Role of the authenticated principal, as supplied by the external
/// identity service. The core trusts this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Worker,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Customer => f.write_str("customer"),
            Role::Worker => f.write_str("worker"),
        }
    }
}

/// The authenticated caller: `{id, role}` from the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

/// A single allowed edge in the lifecycle graph.
///
/// `required_role: None` marks a settlement-internal edge that is driven by
/// the coordinator or the webhook reconciler rather than a caller role.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub required_role: Option<Role>,
}

/// The full transition table. This is the only place lifecycle edges are
/// defined; anything not listed here is an invalid transition.
const TRANSITIONS: &[Transition] = &[
    Transition {
        from: BookingStatus::Pending,
        to: BookingStatus::Accepted,
        required_role: Some(Role::Worker),
    },
    Transition {
        from: BookingStatus::Pending,
        to: BookingStatus::Declined,
        required_role: Some(Role::Worker),
    },
    Transition {
        from: BookingStatus::Pending,
        to: BookingStatus::Cancelled,
        required_role: Some(Role::Customer),
    },
    Transition {
        from: BookingStatus::Accepted,
        to: BookingStatus::Cancelled,
        required_role: Some(Role::Customer),
    },
    // Worker-triggered service completion. The serviceStartedAt precondition
    // is enforced by the ledger on top of this edge.
    Transition {
        from: BookingStatus::Accepted,
        to: BookingStatus::PaymentPending,
        required_role: Some(Role::Worker),
    },
    // Settlement success, either strategy (gateway verify, cash verify, or
    // webhook reconciliation).
    Transition {
        from: BookingStatus::PaymentPending,
        to: BookingStatus::Completed,
        required_role: None,
    },
    // Price edit reopening settlement: an idempotent self-edge.
    Transition {
        from: BookingStatus::PaymentPending,
        to: BookingStatus::PaymentPending,
        required_role: Some(Role::Worker),
    },
];

/// Look up the edge `from -> to`, if the graph allows it.
pub fn edge(from: BookingStatus, to: BookingStatus) -> Option<&'static Transition> {
    TRANSITIONS.iter().find(|t| t.from == from && t.to == to)
}

/// Authorize `role` to drive `from -> to`.
///
/// Fails with `InvalidTransition` if the edge does not exist and with
/// `Unauthorized` if it exists but requires a different role. Checked before
/// any mutation, so a rejected call leaves no observable side effects.
pub fn authorize(from: BookingStatus, to: BookingStatus, role: Role) -> Result<(), BookingError> {
    let t = edge(from, to).ok_or(BookingError::InvalidTransition { from, to })?;
    match t.required_role {
        Some(required) if required != role => Err(BookingError::Unauthorized {
            role,
            action: format!("{from} -> {to}"),
        }),
        _ => Ok(()),
    }
}
