use crate::model::Contact;

/// Case-sensitive substring match against phone or name. The query is not trimmed.
pub fn matches(contact: &Contact, query: &str) -> bool {
    contact.phone.contains(query) || contact.name.contains(query)
}

/// Contacts matching `query`, in source order. An empty query matches everything.
pub fn filter<'c>(contacts: &'c [Contact], query: &str) -> Vec<&'c Contact> {
    contacts
        .iter()
        .filter(|contact| matches(contact, query))
        .collect()
}
