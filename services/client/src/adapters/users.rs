//! services/client/src/adapters/users.rs
//!
//! The HTTP adapter for the `UserService` port.

use async_trait::async_trait;
use life_lessons_core::domain::{ProfileUpdate, User};
use life_lessons_core::ports::{PortResult, UserService};

use crate::adapters::records::UserEnvelopeRecord;
use crate::adapters::rest::RestClient;

#[derive(Clone, Debug)]
pub struct HttpUserAdapter {
    client: RestClient,
}

impl HttpUserAdapter {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserService for HttpUserAdapter {
    async fn current_user(&self) -> PortResult<User> {
        let record: UserEnvelopeRecord = self.client.get("users/me", &[]).await?;
        Ok(record.to_domain())
    }

    async fn sync_user(&self) -> PortResult<User> {
        let record: UserEnvelopeRecord = self.client.post_empty("users/sync").await?;
        Ok(record.to_domain())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> PortResult<User> {
        // Some deployments answer with `{ modifiedCount }`; read the user back then.
        let value: serde_json::Value = self.client.patch("users/me", update).await?;
        match serde_json::from_value::<UserEnvelopeRecord>(value) {
            Ok(record) => Ok(record.to_domain()),
            Err(_) => self.current_user().await,
        }
    }
}
