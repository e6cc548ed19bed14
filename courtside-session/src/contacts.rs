use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::{contacts_key, DocumentStore, StoreError};

/// Contact fields shown in a player tooltip.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Player name to contact fields.
pub type ContactDirectory = BTreeMap<String, ContactInfo>;

/// Access to the contact directory of one sport.
///
/// Contacts live in their own persistence stream, fully decoupled from
/// bracket state: a bracket works fine without any contact data, tooltips
/// just have nothing to show.
pub struct ContactsClient<'a, S> {
    store: &'a S,
    sport: &'a str,
}

impl<'a, S> ContactsClient<'a, S>
where
    S: DocumentStore,
{
    pub(crate) fn new(store: &'a S, sport: &'a str) -> Self {
        Self { store, sport }
    }

    /// Loads the contact directory, seeding the store with `initial` on the
    /// first ever load.
    ///
    /// Absent data is not an error; neither is an unreachable store. Both
    /// degrade to whatever `initial` provides (usually nothing).
    pub async fn load(&self, initial: &ContactDirectory) -> ContactDirectory {
        let document = match self.store.get(&contacts_key(self.sport)).await {
            Ok(document) => document,
            Err(err) => {
                log::error!("Failed to load contacts for {}: {}", self.sport, err);
                return initial.clone();
            }
        };

        match document {
            Some(document) => match serde_json::from_value(document) {
                Ok(contacts) => contacts,
                Err(err) => {
                    log::error!("Malformed contact directory for {}: {}", self.sport, err);
                    initial.clone()
                }
            },
            None => {
                if !initial.is_empty() {
                    if let Err(err) = self.save(initial).await {
                        log::error!("Failed to seed contacts for {}: {}", self.sport, err);
                    }
                }

                initial.clone()
            }
        }
    }

    /// Overwrites the stored contact directory.
    pub async fn save(&self, contacts: &ContactDirectory) -> Result<(), StoreError> {
        let document = serde_json::to_value(contacts)?;
        self.store.put(&contacts_key(self.sport), document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn directory() -> ContactDirectory {
        let mut contacts = ContactDirectory::new();
        contacts.insert(
            "Ana".to_owned(),
            ContactInfo {
                email: "ana@example.com".to_owned(),
                phone: "x1234".to_owned(),
            },
        );
        contacts
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let store = MemoryStore::new();
        let client = ContactsClient::new(&store, "chess");

        let contacts = client.load(&ContactDirectory::new()).await;
        assert!(contacts.is_empty());

        // Nothing gets seeded from an empty initial directory.
        assert!(store.get(&contacts_key("chess")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_load_seeds_initial() {
        let store = MemoryStore::new();
        let client = ContactsClient::new(&store, "chess");

        let contacts = client.load(&directory()).await;
        assert_eq!(contacts, directory());

        // The seed is now persisted and a later load without an initial
        // directory still sees it.
        let contacts = client.load(&ContactDirectory::new()).await;
        assert_eq!(contacts, directory());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryStore::new();
        let client = ContactsClient::new(&store, "foosball");

        let mut contacts = directory();
        contacts.insert("Ben".to_owned(), ContactInfo::default());
        client.save(&contacts).await.unwrap();

        assert_eq!(client.load(&ContactDirectory::new()).await, contacts);
    }
}
