use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Deserialize;

use crate::model::Contact;

/// Owner of the contact collection.
///
/// Writes are fire-and-forget: callers never observe a result and the
/// store has no error channel.
pub trait ContactStore {
    /// Current collection in insertion order
    fn contacts(&self) -> &[Contact];

    fn add(&mut self, contact: Contact);

    /// Replace the contact with the same phone
    fn update(&mut self, contact: Contact);
}

/// In-memory store. Nothing written here outlives the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    contacts: Vec<Contact>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from an initial list, dropping later entries whose phone
    /// is already taken.
    pub fn from_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        for contact in contacts {
            if !seen.insert(contact.phone.clone()) {
                warn!(
                    "event=seed_duplicate phone={} name={}; skipping",
                    contact.phone, contact.name
                );
                continue;
            }
            kept.push(contact);
        }
        Self { contacts: kept }
    }

    /// Load the seed file. The file holds a `[[contacts]]` array of tables.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read contacts file at {}", path.display()))?;
        let file: SeedFile = toml::from_str(&raw)
            .with_context(|| format!("failed to parse {} as a contacts file", path.display()))?;
        let store = Self::from_contacts(file.contacts);
        info!(
            "event=seed_loaded path={} count={}",
            path.display(),
            store.contacts.len()
        );
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }
}

impl ContactStore for MemoryStore {
    fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    fn add(&mut self, contact: Contact) {
        debug!("event=store_add phone={}", contact.phone);
        self.contacts.push(contact);
    }

    fn update(&mut self, contact: Contact) {
        match self.contacts.iter_mut().find(|c| c.phone == contact.phone) {
            Some(existing) => {
                debug!(
                    "event=store_update phone={} favorite={}",
                    contact.phone, contact.is_favorite
                );
                *existing = contact;
            }
            None => warn!("event=store_update_unknown phone={}; ignored", contact.phone),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SeedFile {
    contacts: Vec<Contact>,
}
