use serde::{Deserialize, Serialize};

/// A single entry in the contact list. The phone number is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    #[serde(default, rename = "favorite", alias = "isFavorite")]
    pub is_favorite: bool,
}

impl Contact {
    /// New contacts always start out as non-favorites.
    pub fn new(phone: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            is_favorite: false,
        }
    }

    /// Copy of this contact with the favorite flag inverted. `self` is left untouched.
    pub fn with_favorite_toggled(&self) -> Self {
        Self {
            is_favorite: !self.is_favorite,
            ..self.clone()
        }
    }
}
