use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// Email and password submitted by the display surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// An opaque authenticated identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid email or password")]
    BadCredentials,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// An external identity provider.
///
/// A successful sign-in yields an opaque [`Identity`]; the current identity
/// (or `None` when signed out) is observable through the [`watch`] channel,
/// which is how a session learns about identity changes it did not initiate
/// itself.
pub trait IdentityProvider: Send + Sync + 'static {
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Identity, IdentityError>> + Send;

    fn sign_out(&self) -> impl Future<Output = ()> + Send;

    /// Returns a receiver for the current identity.
    fn watch(&self) -> watch::Receiver<Option<Identity>>;
}

impl<P> IdentityProvider for Arc<P>
where
    P: IdentityProvider,
{
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, IdentityError> {
        (**self).sign_in(credentials).await
    }

    async fn sign_out(&self) {
        (**self).sign_out().await
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        (**self).watch()
    }
}

/// One entry of the credential list backing [`StaticProvider`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub password: String,
}

/// An [`IdentityProvider`] backed by a static credential list, as read from a
/// `users.json` file.
#[derive(Debug)]
pub struct StaticProvider {
    users: Vec<UserRecord>,
    tx: watch::Sender<Option<Identity>>,
}

impl StaticProvider {
    pub fn new(users: Vec<UserRecord>) -> Self {
        let (tx, _) = watch::channel(None);

        Self { users, tx }
    }

    /// Reads the credential list from a JSON file.
    pub async fn from_file<P>(path: P) -> Result<Self, IdentityError>
    where
        P: AsRef<Path>,
    {
        let buf = tokio::fs::read(path)
            .await
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?;

        let users = serde_json::from_slice(&buf)
            .map_err(|err| IdentityError::Unavailable(err.to_string()))?;

        Ok(Self::new(users))
    }
}

impl IdentityProvider for StaticProvider {
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, IdentityError> {
        log::debug!("Trying to authenticate {}", credentials.email);

        for user in &self.users {
            if user.email == credentials.email && user.password == credentials.password {
                let identity = Identity {
                    user_id: user.id.clone(),
                    email: user.email.clone(),
                };

                let _ = self.tx.send(Some(identity.clone()));
                return Ok(identity);
            }
        }

        Err(IdentityError::BadCredentials)
    }

    async fn sign_out(&self) {
        let _ = self.tx.send(None);
    }

    fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> StaticProvider {
        StaticProvider::new(vec![UserRecord {
            id: "u1".to_owned(),
            email: "ana@example.com".to_owned(),
            password: "hunter2".to_owned(),
        }])
    }

    #[tokio::test]
    async fn test_sign_in() {
        let provider = provider();
        let rx = provider.watch();

        let identity = provider
            .sign_in(&Credentials {
                email: "ana@example.com".to_owned(),
                password: "hunter2".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(identity.user_id, "u1");
        assert_eq!(rx.borrow().as_ref(), Some(&identity));

        provider.sign_out().await;
        assert_eq!(rx.borrow().as_ref(), None);
    }

    #[tokio::test]
    async fn test_sign_in_bad_credentials() {
        let provider = provider();

        let err = provider
            .sign_in(&Credentials {
                email: "ana@example.com".to_owned(),
                password: "wrong".to_owned(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, IdentityError::BadCredentials));
        assert_eq!(provider.watch().borrow().as_ref(), None);
    }
}
