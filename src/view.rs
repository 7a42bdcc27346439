//! The contact list component without any terminal concerns.
//!
//! `ContactListView` composes derived state (filtered rows, submit
//! eligibility) over a store handed in by the caller, and owns the
//! ephemeral text state: search query, name and phone inputs, and the
//! last joke shown.

use log::info;

use crate::model::Contact;
use crate::search;
use crate::store::ContactStore;
use crate::validate::{self, PhoneCheck};

pub struct ContactListView<'a> {
    store: &'a mut dyn ContactStore,
    search: String,
    name: String,
    phone: String,
    joke: String,
}

impl<'a> ContactListView<'a> {
    pub fn new(store: &'a mut dyn ContactStore) -> Self {
        Self {
            store,
            search: String::new(),
            name: String::new(),
            phone: String::new(),
            joke: String::new(),
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        self.store.contacts()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn joke(&self) -> &str {
        &self.joke
    }

    pub fn set_search(&mut self, value: impl Into<String>) {
        self.search = value.into();
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.name = value.into();
    }

    pub fn set_phone(&mut self, value: impl Into<String>) {
        self.phone = value.into();
    }

    /// Replaces whatever joke was shown before.
    pub fn set_joke(&mut self, value: impl Into<String>) {
        self.joke = value.into();
    }

    pub fn clear_form(&mut self) {
        self.name.clear();
        self.phone.clear();
    }

    /// Rows to display for the current query.
    pub fn visible_contacts(&self) -> Vec<&Contact> {
        search::filter(self.store.contacts(), &self.search)
    }

    pub fn phone_check(&self) -> PhoneCheck {
        validate::check_phone(self.store.contacts(), &self.phone)
    }

    /// Whether the submit control is enabled.
    pub fn can_submit(&self) -> bool {
        validate::is_valid_phone(self.store.contacts(), &self.phone)
    }

    /// Dispatch an update carrying `contact` with its favorite flag flipped.
    /// Returns the record that was dispatched.
    pub fn toggle_favorite(&mut self, contact: &Contact) -> Contact {
        let updated = contact.with_favorite_toggled();
        info!(
            "event=favorite_toggled phone={} favorite={}",
            updated.phone, updated.is_favorite
        );
        self.store.update(updated.clone());
        updated
    }

    /// Dispatch an add for the current form contents when the phone passes
    /// validation. The inputs are left as they are.
    pub fn submit(&mut self) -> Option<Contact> {
        if !self.can_submit() {
            return None;
        }
        let contact = Contact::new(self.phone.clone(), self.name.clone());
        info!("event=contact_added phone={}", contact.phone);
        self.store.add(contact.clone());
        Some(contact)
    }
}
