//! Identity context passed explicitly to operations that record who acted.

use std::fmt;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::store::{StoreClient, StoreError, USERS};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AuthError {
    #[error("Invalid e-mail or password")]
    InvalidCredentials,
    #[error("Auth store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Staff,
    Customer,
}

impl Role {
    /// `carnicero` is the historical name of the staff role.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "staff" | "carnicero" => Role::Staff,
            _ => Role::Customer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role,
        }
    }

    /// Walk-in customer with no account.
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Customer,
        }
    }
}

#[derive(Debug, Clone)]
struct Credential {
    email: String,
    password: String,
    user_id: String,
    role: Role,
}

/// Fixed e-mail/password table for small deployments without an identity provider.
#[derive(Debug, Clone, Default)]
pub struct CredentialTable {
    entries: Vec<Credential>,
}

impl CredentialTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, email: &str, password: &str, user_id: &str, role: Role) -> Self {
        self.entries.push(Credential {
            email: email.trim().to_lowercase(),
            password: password.to_string(),
            user_id: user_id.to_string(),
            role,
        });
        self
    }

    #[instrument(skip(self, password))]
    pub fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim().to_lowercase();
        match self
            .entries
            .iter()
            .find(|c| c.email == email && c.password == password)
        {
            Some(credential) => {
                info!(user_id = %credential.user_id, role = %credential.role, "Signed in");
                Ok(Identity::new(&credential.user_id, credential.role))
            }
            None => {
                warn!("Sign-in rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

/// Role stored on the `users` profile document. Missing profiles or roles mean customer.
#[instrument(skip(store))]
pub async fn resolve_role(store: &StoreClient, user_id: &str) -> Result<Role, AuthError> {
    let profile = store.get(USERS, user_id).await?;
    Ok(profile
        .as_ref()
        .and_then(|doc| doc.str_field(&["role", "rol"]))
        .map_or(Role::Customer, Role::parse))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::document::fields;
    use crate::store::StoreActor;
    use serde_json::json;

    #[test]
    fn test_credential_table_sign_in() {
        let table = CredentialTable::new()
            .with("admin@shop.test", "secret", "u_admin", Role::Admin)
            .with("staff@shop.test", "1234", "u_staff", Role::Staff);

        let identity = table.sign_in(" Admin@Shop.test ", "secret").unwrap();
        assert_eq!(identity, Identity::new("u_admin", Role::Admin));

        assert_eq!(table.sign_in("staff@shop.test", "nope"), Err(AuthError::InvalidCredentials));
        assert_eq!(table.sign_in("ghost@shop.test", "1234"), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("carnicero"), Role::Staff);
        assert_eq!(Role::parse("ADMIN"), Role::Admin);
        assert_eq!(Role::parse("whatever"), Role::Customer);
    }

    #[tokio::test]
    async fn test_resolve_role_from_profile() {
        let (actor, store) = StoreActor::with_random_ids(10);
        tokio::spawn(actor.run());
        let admin = store.create(USERS, fields([("role", json!("admin"))])).await.unwrap();
        let plain = store.create(USERS, fields([("email", json!("a@b.c"))])).await.unwrap();

        assert_eq!(resolve_role(&store, &admin).await, Ok(Role::Admin));
        assert_eq!(resolve_role(&store, &plain).await, Ok(Role::Customer));
        assert_eq!(resolve_role(&store, "missing").await, Ok(Role::Customer));
    }
}
