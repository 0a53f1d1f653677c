//! Authorization gate: who may read or mutate which record.
//!
//! The gate is a pure function over an optional [`Identity`], a [`Resource`]
//! and an [`Action`]. It never touches storage; handlers load the record,
//! ask the gate, and map a [`Decision::Deny`] onto a response.

use crate::error::AppError;

/// An authenticated user's id and role flag, resolved from a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub is_admin: bool,
}

/// What the action targets. Owned records carry their owner's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Todo { owner_id: i64 },
    Ticket { owner_id: i64 },
    User { id: i64 },
    /// Collections and anything else without a single owner.
    Site,
}

impl Resource {
    fn owner_id(&self) -> Option<i64> {
        match *self {
            Resource::Todo { owner_id } | Resource::Ticket { owner_id } => Some(owner_id),
            Resource::User { id } => Some(id),
            Resource::Site => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewOwn,
    CreateOwn,
    EditOwn,
    DeleteOwn,
    /// View every user, todo and ticket.
    AdminView,
    AdminEdit,
    AdminDelete,
    AdminReply,
}

impl Action {
    pub fn requires_admin(self) -> bool {
        matches!(
            self,
            Action::AdminView | Action::AdminEdit | Action::AdminDelete | Action::AdminReply
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    /// Authenticated but does not own the record.
    NotOwner,
    /// Authenticated but the action needs admin rights.
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

pub fn authorize(actor: Option<Identity>, resource: Resource, action: Action) -> Decision {
    let Some(actor) = actor else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    if action.requires_admin() {
        return if actor.is_admin {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::Forbidden)
        };
    }

    match resource.owner_id() {
        Some(owner_id) if owner_id == actor.id => Decision::Allow,
        Some(_) => Decision::Deny(DenyReason::NotOwner),
        // Own-scoped action with no owner to compare against.
        None => Decision::Deny(DenyReason::Forbidden),
    }
}

/// Runs the gate and turns a denial into the matching [`AppError`].
/// `what` names the record in 404 responses.
pub fn ensure(
    actor: Option<Identity>,
    resource: Resource,
    action: Action,
    what: &'static str,
) -> Result<(), AppError> {
    match authorize(actor, resource, action) {
        Decision::Allow => Ok(()),
        Decision::Deny(DenyReason::Unauthenticated) => Err(AppError::Unauthenticated),
        Decision::Deny(DenyReason::NotOwner) => Err(AppError::NotFound(what)),
        Decision::Deny(DenyReason::Forbidden) => Err(AppError::Forbidden),
    }
}
