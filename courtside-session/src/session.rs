use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use courtside_core::BracketTree;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::contacts::{ContactDirectory, ContactsClient};
use crate::gate::{resolve_role, Command, Denied, Gate, Role};
use crate::identity::{Credentials, Identity, IdentityError, IdentityProvider};
use crate::store::{bracket_key, BracketDocument, DocumentStore, StoreError};
use crate::Error;

/// Broadcast to subscribed display surfaces whenever the session state they
/// render from changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    BracketChanged,
    RoleChanged(Role),
}

/// The result of [`Session::apply`]. A denied command left the bracket
/// untouched; the reason is display-ready.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Denied(Denied),
}

/// An editing session over one tournament bracket.
///
/// The session owns the authoritative in-memory [`BracketTree`]. Mutations
/// arrive as typed [`Command`]s, pass the role gate, apply synchronously and
/// are then persisted in the background: the caller never waits for
/// durability, and a failed save leaves the session editing in a degraded,
/// unsynced mode. The remote store is reconciled by whole-document overwrite,
/// so the last completed save wins; the system assumes a single active editor
/// at a time.
pub struct Session<S, P> {
    inner: Arc<SessionInner<S, P>>,
}

struct SessionInner<S, P> {
    store: S,
    provider: P,
    tournament: String,
    sport: String,
    bracket: RwLock<BracketTree>,
    gate: RwLock<Gate>,
    /// The identity the cached role was resolved for. Used to skip redundant
    /// lookups when both the direct sign-in path and the identity watcher
    /// react to the same change.
    resolved: RwLock<Option<Identity>>,
    tx: broadcast::Sender<SessionEvent>,
}

impl<S, P> Clone for Session<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S, P> Debug for Session<S, P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("tournament", &self.inner.tournament)
            .field("sport", &self.inner.sport)
            .finish_non_exhaustive()
    }
}

impl<S, P> Session<S, P>
where
    S: DocumentStore,
    P: IdentityProvider,
{
    /// Opens the session for `tournament`, loading the persisted bracket
    /// from `store`.
    ///
    /// On the first ever load, when nothing is persisted yet, the bracket is
    /// seeded from `entrants` and the seed is written back. A failing seed
    /// write is logged and the session starts unsynced.
    ///
    /// # Errors
    ///
    /// Returns an [`enum@Error`] when the store cannot be read, when the stored
    /// document is malformed, or when seeding is required and `entrants` is
    /// empty.
    pub async fn open<T, U>(
        store: S,
        provider: P,
        tournament: T,
        sport: U,
        entrants: Vec<String>,
    ) -> Result<Self, Error>
    where
        T: Into<String>,
        U: Into<String>,
    {
        let tournament = tournament.into();
        let sport = sport.into();

        let (bracket, fresh) = match store.get(&bracket_key(&tournament)).await? {
            Some(document) => {
                let document: BracketDocument = serde_json::from_value(document)?;
                (document.into_tree()?, false)
            }
            None => {
                log::info!("No bracket stored for {tournament}, seeding from entrant list");
                (BracketTree::seed(entrants)?, true)
            }
        };

        let (tx, _) = broadcast::channel(32);

        let session = Self {
            inner: Arc::new(SessionInner {
                store,
                provider,
                tournament,
                sport,
                bracket: RwLock::new(bracket),
                gate: RwLock::new(Gate::new()),
                resolved: RwLock::new(None),
                tx,
            }),
        };

        if fresh {
            if let Err(err) = session.save().await {
                log::error!("Failed to persist seeded bracket: {err}");
            }
        }

        session.spawn_identity_watcher();

        Ok(session)
    }

    /// Applies a mutation command against the bracket.
    ///
    /// The command is authorized against the cached role first; a denial is
    /// a no-op on the tree. An accepted command mutates the in-memory tree,
    /// notifies subscribers and dispatches the save without waiting for it.
    pub fn apply(&self, command: Command) -> Outcome {
        {
            let gate = self.inner.gate.read();
            if let Err(denied) = gate.authorize(&command) {
                log::debug!("Denied {:?} for role {}: {}", command, gate.role(), denied);
                return Outcome::Denied(denied);
            }
        }

        {
            let mut bracket = self.inner.bracket.write();

            match &command {
                Command::SelectWinner {
                    round,
                    slot,
                    candidate,
                } => {
                    bracket.select_winner(*round, *slot, candidate);
                    // Selection and unselection both change what feeds the
                    // later rounds.
                    bracket.rebuild();
                }
                Command::EditScore {
                    round,
                    slot,
                    side,
                    value,
                } => bracket.edit_score(*round, *slot, *side, value),
                Command::EditTime { round, slot, value } => {
                    bracket.edit_time(*round, *slot, value)
                }
                Command::EditName {
                    round,
                    slot,
                    side,
                    name,
                } => {
                    bracket.edit_player_name(*round, *slot, *side, name);
                    // A rename can follow the winner, which feeds the later
                    // rounds just like a selection does.
                    bracket.rebuild();
                }
                Command::Reset => bracket.reset(),
            }
        }

        let _ = self.inner.tx.send(SessionEvent::BracketChanged);
        self.spawn_save();

        Outcome::Applied
    }

    /// Returns a copy of the current bracket for rendering.
    pub fn snapshot(&self) -> BracketTree {
        self.inner.bracket.read().clone()
    }

    /// Returns the currently effective role.
    pub fn role(&self) -> Role {
        self.inner.gate.read().role()
    }

    /// Subscribes to state change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.tx.subscribe()
    }

    /// Signs in against the identity provider and resolves the stored role
    /// of the new identity before returning it.
    ///
    /// No mutation is authorized under the new identity until that
    /// resolution has completed; until then the session acts as a viewer.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] with a display-ready message when the
    /// credentials are rejected or the provider is unreachable. The role
    /// stays at [`Role::Viewer`].
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Role, IdentityError> {
        self.inner.provider.sign_in(credentials).await?;
        Ok(self.sync_role().await)
    }

    /// Signs out and drops back to read-only access.
    pub async fn sign_out(&self) {
        self.inner.provider.sign_out().await;
        self.sync_role().await;
    }

    /// Persists the current bracket as a whole-document overwrite.
    ///
    /// Mutations dispatch this in the background; it is public so one-shot
    /// callers can await durability before exiting.
    pub async fn save(&self) -> Result<(), StoreError> {
        let document = {
            let bracket = self.inner.bracket.read();
            serde_json::to_value(BracketDocument::from(&*bracket))?
        };

        self.inner
            .store
            .put(&bracket_key(&self.inner.tournament), document)
            .await
    }

    /// Loads the contact directory for tooltips, honoring the tooltip
    /// policy: when contacts are hidden the directory is simply empty.
    pub async fn load_contacts(&self, initial: &ContactDirectory) -> ContactDirectory {
        if !self.inner.gate.read().can_view_contacts() {
            return ContactDirectory::new();
        }

        self.contacts().load(initial).await
    }

    /// Overwrites the stored contact directory. This maintains the lookup
    /// data next to the bracket; it is not a bracket mutation and is not
    /// role gated.
    pub async fn save_contacts(&self, contacts: &ContactDirectory) -> Result<(), StoreError> {
        self.contacts().save(contacts).await
    }

    /// Flips the contact tooltip policy for this session.
    pub fn set_show_contacts(&self, show: bool) {
        self.inner.gate.write().set_show_contacts(show);
    }

    /// Returns a client for the contact directory of this session's sport.
    #[inline]
    pub fn contacts(&self) -> ContactsClient<'_, S> {
        ContactsClient::new(&self.inner.store, &self.inner.sport)
    }

    fn spawn_save(&self) {
        let session = self.clone();

        tokio::spawn(async move {
            if let Err(err) = session.save().await {
                log::error!("Failed to save bracket state: {}", err);
            }
        });
    }

    /// Re-resolves the cached role from the current identity.
    ///
    /// The cached role drops to viewer before the lookup starts, so a stale
    /// elevated role can never authorize a mutation for a new identity.
    async fn sync_role(&self) -> Role {
        let identity = self.inner.provider.watch().borrow().clone();

        if *self.inner.resolved.read() == identity {
            return self.role();
        }

        self.set_role(Role::Viewer);

        let role = match &identity {
            Some(identity) => resolve_role(&self.inner.store, &identity.user_id).await,
            None => Role::Viewer,
        };

        *self.inner.resolved.write() = identity;
        self.set_role(role);

        role
    }

    fn set_role(&self, role: Role) {
        let mut gate = self.inner.gate.write();
        if gate.role() == role {
            return;
        }

        gate.set_role(role);
        drop(gate);

        let _ = self.inner.tx.send(SessionEvent::RoleChanged(role));
    }

    /// Watches the identity provider for changes the session did not
    /// initiate itself. The watcher holds the session weakly so it cannot
    /// keep it alive; it exits when the session is dropped.
    fn spawn_identity_watcher(&self) {
        let mut rx = self.inner.provider.watch();
        let weak = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(inner) = weak.upgrade() else {
                    break;
                };

                Session { inner }.sync_role().await;
            }
        });
    }
}
