//! REST API handlers

pub mod admin;
pub mod checkout;
pub mod content;
pub mod health;
pub mod packages;
pub mod shared;
pub mod subscriber;
pub mod webhook;

pub use admin::*;
pub use checkout::*;
pub use content::*;
pub use health::*;
pub use packages::*;
pub use subscriber::*;
pub use webhook::*;

use serde::Deserialize;

use dramapass_types::SubscriberProfile;

/// Optional profile details the chat frontend forwards on first contact
#[derive(Debug, Default, Deserialize)]
pub struct ProfileFields {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl From<ProfileFields> for SubscriberProfile {
    fn from(fields: ProfileFields) -> Self {
        Self {
            display_name: fields.display_name.unwrap_or_default(),
            username: fields.username.filter(|u| !u.is_empty()),
        }
    }
}
