use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::backend::{
    normalize_email, AuthProvider, AuthSubscription, BackendError, ClientStore, PrincipalFeed,
    ProfileStore, Result,
};
use crate::config::Config;
use crate::models::{Client, ClientDraft, Identity, Principal, Role};

const CLIENT_COLUMNS: &str = "id, identification_number, first_name, last_name, email, phone, address, created_at, created_by";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
}

impl TryFrom<ProfileRow> for Identity {
    type Error = BackendError;

    fn try_from(row: ProfileRow) -> Result<Self> {
        let role = Role::parse(&row.role).ok_or_else(|| {
            BackendError::InvalidRecord(format!("user {} has unknown role '{}'", row.id, row.role))
        })?;
        Ok(Identity {
            id: row.id,
            email: row.email,
            role,
            name: row.name,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
}

/// PostgreSQL-backed auth provider and record stores.
pub struct Database {
    pool: PgPool,
    feed: PrincipalFeed,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool,
            feed: PrincipalFeed::new(),
        })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(self.get_pool()).await?;
        Ok(())
    }

    async fn find_account(&self, email: &str) -> Result<Option<AccountRow>> {
        let account = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, password_hash FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(account)
    }
}

fn unique_violation(err: sqlx::Error, entity: &'static str, field: &'static str, value: &str) -> BackendError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => BackendError::AlreadyExists {
            entity,
            field,
            value: value.to_string(),
        },
        _ => BackendError::Database(err),
    }
}

#[async_trait]
impl AuthProvider for Database {
    fn subscribe(&self) -> AuthSubscription {
        self.feed.subscribe()
    }

    fn listener_count(&self) -> usize {
        self.feed.listener_count()
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal> {
        let email = normalize_email(email);
        let account = self
            .find_account(&email)
            .await?
            .ok_or(BackendError::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(BackendError::InvalidCredentials);
        }

        let principal = Principal {
            id: account.id,
            email: account.email,
        };
        debug!(principal = %principal.id, "signed in");
        self.feed.publish(Some(principal.clone()));
        Ok(principal)
    }

    #[instrument(skip(self, password))]
    async fn register(&self, email: &str, password: &str) -> Result<Principal> {
        let email = normalize_email(email);
        if self.find_account(&email).await?.is_some() {
            return Err(BackendError::AlreadyExists {
                entity: "account",
                field: "email",
                value: email,
            });
        }

        let id = Uuid::new_v4();
        let password_hash = hash_password(password)?;
        sqlx::query("INSERT INTO accounts (id, email, password_hash) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&email)
            .bind(&password_hash)
            .execute(self.get_pool())
            .await
            .map_err(|err| unique_violation(err, "account", "email", &email))?;

        let principal = Principal { id, email };
        self.feed.publish(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<()> {
        self.feed.publish(None);
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for Database {
    #[instrument(skip(self))]
    async fn get_profile(&self, id: Uuid) -> Result<Option<Identity>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, name, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        row.map(Identity::try_from).transpose()
    }

    async fn insert_profile(&self, identity: &Identity) -> Result<()> {
        sqlx::query("INSERT INTO users (id, email, name, role) VALUES ($1, $2, $3, $4)")
            .bind(identity.id)
            .bind(&identity.email)
            .bind(&identity.name)
            .bind(identity.role.as_str())
            .execute(self.get_pool())
            .await?;

        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<Identity>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, name, role FROM users ORDER BY name ASC",
        )
        .fetch_all(self.get_pool())
        .await?;

        rows.into_iter().map(Identity::try_from).collect()
    }
}

#[async_trait]
impl ClientStore for Database {
    #[instrument(skip(self))]
    async fn list_clients(&self, limit: Option<i64>) -> Result<Vec<Client>> {
        // LIMIT NULL returns every row.
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.get_pool())
        .await?;

        Ok(clients)
    }

    async fn find_by_identification(&self, identification_number: &str) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE identification_number = $1 LIMIT 1"
        ))
        .bind(identification_number)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }

    #[instrument(skip(self, draft), fields(identification_number = %draft.identification_number))]
    async fn insert_client(
        &self,
        draft: &ClientDraft,
        created_at: DateTime<Utc>,
        created_by: Uuid,
    ) -> Result<Client> {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients ({CLIENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&draft.identification_number)
        .bind(&draft.first_name)
        .bind(&draft.last_name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.address)
        .bind(created_at)
        .bind(created_by)
        .fetch_one(self.get_pool())
        .await
        .map_err(|err| {
            unique_violation(err, "client", "identification_number", &draft.identification_number)
        })?;

        Ok(client)
    }

    #[instrument(skip(self))]
    async fn delete_client(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(self.get_pool())
            .await?;

        Ok(())
    }

    async fn count_clients(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clients")
            .fetch_one(self.get_pool())
            .await?;

        Ok(count)
    }
}

/// Connect to the configured database, running migrations when asked to.
pub async fn init(config: &Config) -> anyhow::Result<Database> {
    let url = config.database_url()?;
    let db = Database::new(url, config.database_max_connections).await?;
    info!(max_connections = config.database_max_connections, "database pool ready");

    if config.run_migrations {
        db.migrate().await?;
        info!("migrations applied");
    }

    Ok(db)
}
