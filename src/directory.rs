use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::backend::{BackendError, ClientStore, ProfileStore, Services};
use crate::models::{Client, ClientDraft, Identity};

pub const RECENT_CLIENTS: i64 = 5;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("a client with identification number '{0}' already exists")]
    DuplicateIdentification(String),

    #[error("{field} {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total_clients: i64,
    pub recent: Vec<Client>,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorRow {
    pub identity: Identity,
    pub clients: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorSummary {
    pub rows: Vec<CreatorRow>,
    /// Clients whose creator has no profile.
    pub unattributed: usize,
}

/// Client record operations used by the screens.
#[derive(Clone)]
pub struct ClientDirectory {
    clients: Arc<dyn ClientStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl ClientDirectory {
    pub fn new(services: &Services) -> Self {
        Self {
            clients: services.clients.clone(),
            profiles: services.profiles.clone(),
        }
    }

    /// Every client, newest first.
    pub async fn list(&self) -> Result<Vec<Client>, DirectoryError> {
        Ok(self.clients.list_clients(None).await?)
    }

    /// Insert a client after checking that its identification number is free.
    #[instrument(skip(self, draft, actor), fields(actor = %actor.id))]
    pub async fn create(&self, draft: ClientDraft, actor: &Identity) -> Result<Client, DirectoryError> {
        validate(&draft)?;

        if self
            .clients
            .find_by_identification(&draft.identification_number)
            .await?
            .is_some()
        {
            return Err(DirectoryError::DuplicateIdentification(draft.identification_number));
        }

        let client = self
            .clients
            .insert_client(&draft, Utc::now(), actor.id)
            .await
            .map_err(|err| match err {
                BackendError::AlreadyExists { value, .. } => {
                    DirectoryError::DuplicateIdentification(value)
                }
                other => DirectoryError::Backend(other),
            })?;

        info!(client = %client.id, "client created");
        Ok(client)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DirectoryError> {
        self.clients.delete_client(id).await?;
        info!(client = %id, "client deleted");
        Ok(())
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, DirectoryError> {
        let recent = self.clients.list_clients(Some(RECENT_CLIENTS)).await?;
        let total_clients = self.clients.count_clients().await?;
        let last_activity = recent.first().map(|c| c.created_at);

        Ok(DashboardSummary {
            total_clients,
            recent,
            last_activity,
        })
    }

    /// How many clients each profile has created.
    pub async fn creators(&self) -> Result<CreatorSummary, DirectoryError> {
        let profiles = self.profiles.list_profiles().await?;
        let clients = self.clients.list_clients(None).await?;

        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for client in &clients {
            *counts.entry(client.created_by).or_default() += 1;
        }

        let rows: Vec<CreatorRow> = profiles
            .into_iter()
            .map(|identity| CreatorRow {
                clients: counts.remove(&identity.id).unwrap_or(0),
                identity,
            })
            .collect();

        Ok(CreatorSummary {
            rows,
            unattributed: counts.values().sum(),
        })
    }
}

fn validate(draft: &ClientDraft) -> Result<(), DirectoryError> {
    let required = [
        ("identification number", &draft.identification_number),
        ("first name", &draft.first_name),
        ("last name", &draft.last_name),
        ("email", &draft.email),
        ("phone", &draft.phone),
        ("address", &draft.address),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(DirectoryError::Validation {
                field,
                reason: "is required",
            });
        }
    }

    if !draft.email.contains('@') {
        return Err(DirectoryError::Validation {
            field: "email",
            reason: "must be an email address",
        });
    }

    Ok(())
}
