use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use courtside_core::Side;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{role_key, DocumentStore};

/// The role an authenticated identity resolves to.
///
/// Roles form a total order: a `Viewer` can only look, an `Editor` can apply
/// every mutation except the destructive reset, an `Admin` can do everything.
/// Unauthenticated access is treated identically to `Viewer`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Viewer,
    Editor,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Viewer => f.write_str("viewer"),
            Self::Editor => f.write_str("editor"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(UnknownRole),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown role")]
pub struct UnknownRole;

/// A mutation request against the bracket, dispatched by the display surface.
///
/// The display never infers intent from rendered content; it constructs one
/// of these and hands it to the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    SelectWinner {
        round: usize,
        slot: usize,
        candidate: String,
    },
    EditScore {
        round: usize,
        slot: usize,
        side: Side,
        value: String,
    },
    EditTime {
        round: usize,
        slot: usize,
        value: String,
    },
    EditName {
        round: usize,
        slot: usize,
        side: Side,
        name: String,
    },
    Reset,
}

impl Command {
    /// The minimum role required to apply this command.
    pub fn required_role(&self) -> Role {
        match self {
            Self::Reset => Role::Admin,
            _ => Role::Editor,
        }
    }
}

/// Why a command was refused. The message is display-ready.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Denied {
    #[error("login to edit the bracket")]
    LoginRequired,
    #[error("only administrators can reset the bracket")]
    AdminRequired,
}

/// Decides whether `role` may apply `command`.
///
/// A denial carries a human-readable reason; the caller treats it as a no-op,
/// never as a hard failure.
pub fn authorize(command: &Command, role: Role) -> Result<(), Denied> {
    if role >= command.required_role() {
        return Ok(());
    }

    match command.required_role() {
        Role::Admin => Err(Denied::AdminRequired),
        _ => Err(Denied::LoginRequired),
    }
}

/// The per-session authorization state: the resolved role and the contact
/// tooltip policy.
///
/// Tooltip visibility is deliberately an independent bit rather than being
/// tied to edit rights; the default of showing contacts to everyone,
/// including unauthenticated viewers, is a product default and can be
/// flipped without touching role handling.
#[derive(Clone, Debug)]
pub struct Gate {
    role: Role,
    show_contacts: bool,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            role: Role::Viewer,
            show_contacts: true,
        }
    }

    #[inline]
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    #[inline]
    pub fn can_view_contacts(&self) -> bool {
        self.show_contacts
    }

    pub fn set_show_contacts(&mut self, show: bool) {
        self.show_contacts = show;
    }

    pub fn authorize(&self, command: &Command) -> Result<(), Denied> {
        authorize(command, self.role)
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves the stored role of a user.
///
/// Anything short of a stored, well-formed role resolves to [`Role::Viewer`]:
/// a missing document, an unknown role name and a store failure all degrade
/// to read-only access.
pub async fn resolve_role<S>(store: &S, user_id: &str) -> Role
where
    S: DocumentStore,
{
    let document = match store.get(&role_key(user_id)).await {
        Ok(document) => document,
        Err(err) => {
            log::warn!("Failed to resolve role of {user_id}: {err}");
            return Role::Viewer;
        }
    };

    document
        .as_ref()
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}
