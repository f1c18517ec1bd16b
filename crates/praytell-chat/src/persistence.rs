//! Writing conversation turns into the context store

use praytell_core::{CategoryConfig, ContextStore, Error, NewRecord, Result, Role, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One turn to persist, in the shape clients send it.
///
/// Every field is required; an empty string counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub message: String,
    pub role: String,
    pub location: String,
    pub datetime: String,
}

impl SaveRequest {
    pub fn new(
        message: impl Into<String>,
        role: impl Into<String>,
        location: impl Into<String>,
        datetime: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            role: role.into(),
            location: location.into(),
            datetime: datetime.into(),
        }
    }

    pub fn from_turn(turn: &Turn) -> Self {
        Self::new(&turn.body, turn.role.as_str(), &turn.location, turn.datetime())
    }

    fn validate(&self) -> Result<Role> {
        let missing = [&self.message, &self.role, &self.location, &self.datetime]
            .iter()
            .any(|field| field.is_empty());
        if missing {
            return Err(Error::validation("Missing required fields"));
        }
        self.role.parse()
    }
}

/// Identifier the store assigned to a saved turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMessage {
    pub id: String,
}

/// Validates turns and writes them into one store category, under the
/// category's field names
pub struct MessagePersistenceService {
    store: Arc<dyn ContextStore>,
    category: CategoryConfig,
}

impl MessagePersistenceService {
    pub fn new(store: Arc<dyn ContextStore>, category: CategoryConfig) -> Self {
        Self { store, category }
    }

    pub fn category(&self) -> &CategoryConfig {
        &self.category
    }

    /// Save one turn.
    ///
    /// Validation failures never reach the store. Store failures come back as
    /// [`Error::Persistence`].
    pub async fn save(&self, request: SaveRequest) -> Result<SavedMessage> {
        let role = request.validate()?;

        let record = NewRecord {
            category: self.category.class_name.clone(),
            properties: self.category.turn_fields(
                &request.message,
                role.as_str(),
                &request.location,
                &request.datetime,
            ),
        };

        let id = self
            .store
            .insert(record)
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?;

        tracing::info!(
            store = self.store.name(),
            category = %self.category.class_name,
            role = %role,
            id = %id,
            "Saved message"
        );

        Ok(SavedMessage { id })
    }
}
