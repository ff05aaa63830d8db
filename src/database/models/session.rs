use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Offline-credential state owned by the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub shop: String,
    pub scope: Option<String>,
    #[serde(default, with = "optional_secret")]
    pub access_token: Option<SecretString>,
    pub expires: Option<DateTime<Utc>>,
    pub is_online: bool,
}

impl Session {
    pub fn offline_id(shop: &str) -> String {
        format!("offline_{}", shop)
    }

    /// Long-lived credential record written when the handshake completes.
    pub fn offline(shop: &str, access_token: &str, scope: &str) -> Self {
        Self {
            id: Self::offline_id(shop),
            shop: shop.to_string(),
            scope: Some(scope.to_string()),
            access_token: Some(SecretString::from(access_token.to_string())),
            expires: None,
            is_online: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires.map_or(false, |at| at <= Utc::now())
    }

    pub fn is_active(&self) -> bool {
        !self.is_expired() && self.access_token.is_some()
    }
}

// The JSONB payload keeps the token; Debug output does not.
mod optional_secret {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(secret) => serializer.serialize_some(secret.expose_secret()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
    }
}
