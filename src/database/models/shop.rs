use secrecy::SecretString;
use serde::Serialize;
use sqlx::FromRow;

/// A shop that completed the OAuth handshake.
///
/// `token` is the offline access token and is never serialized.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Shop {
    pub shop: String,
    #[serde(skip_serializing)]
    #[sqlx(try_from = "String")]
    pub token: SecretString,
    pub scope: String,
}

impl Shop {
    pub fn new(shop: impl Into<String>, token: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            shop: shop.into(),
            token: SecretString::from(token.into()),
            scope: scope.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn token_is_hidden_from_debug_and_json() {
        let shop = Shop::new("a.myshopify.com", "shpat_secret_value", "read_orders");
        assert_eq!(shop.token.expose_secret(), "shpat_secret_value");
        assert!(!format!("{:?}", shop).contains("shpat_secret_value"));

        let json = serde_json::to_value(&shop).unwrap();
        assert_eq!(json["shop"], "a.myshopify.com");
        assert!(json.get("token").is_none());
    }
}
