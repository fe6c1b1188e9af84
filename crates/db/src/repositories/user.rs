use sqlx::Row;

use reqflow_core::domain::user::{Role, User, UserId};
use reqflow_core::routing::DirectorySnapshot;

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a user and return it with its assigned id.
    pub async fn create(
        &self,
        name: &str,
        role: Role,
        manager_id: Option<UserId>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query(
            "INSERT INTO users (name, role, manager_id) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(name)
        .bind(role_as_str(role))
        .bind(manager_id.map(|id| id.0))
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
        Ok(User { id: UserId(id), name: name.to_string(), role, manager_id })
    }
}

pub fn role_as_str(role: Role) -> &'static str {
    match role {
        Role::Requester => "REQUESTER",
        Role::DirectManager => "DIRECT_MANAGER",
        Role::Procurement => "PROCUREMENT",
        Role::AdminManager => "ADMIN_MANAGER",
        Role::FinanceManager => "FINANCE_MANAGER",
        Role::Executive => "EXECUTIVE",
    }
}

pub fn parse_role(raw: &str) -> Result<Role, RepositoryError> {
    match raw {
        "REQUESTER" => Ok(Role::Requester),
        "DIRECT_MANAGER" => Ok(Role::DirectManager),
        "PROCUREMENT" => Ok(Role::Procurement),
        "ADMIN_MANAGER" => Ok(Role::AdminManager),
        "FINANCE_MANAGER" => Ok(Role::FinanceManager),
        "EXECUTIVE" => Ok(Role::Executive),
        other => Err(RepositoryError::Decode(format!("unknown role `{other}`"))),
    }
}

pub(crate) fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role_str: String =
        row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let manager_id: Option<i64> =
        row.try_get("manager_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(User {
        id: UserId(id),
        name,
        role: parse_role(&role_str)?,
        manager_id: manager_id.map(UserId),
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, role, manager_id FROM users WHERE id = ?1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_role(&self, role: Role) -> Result<Option<User>, RepositoryError> {
        // Ordered scan keeps the pick deterministic if the one-holder-per-
        // role invariant has been violated.
        let row = sqlx::query(
            "SELECT id, name, role, manager_id FROM users WHERE role = ?1 ORDER BY id LIMIT 1",
        )
        .bind(role_as_str(role))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn load_directory(&self) -> Result<DirectorySnapshot, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, role, manager_id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let users = rows.iter().map(row_to_user).collect::<Result<Vec<_>, _>>()?;
        Ok(DirectorySnapshot::new(users))
    }
}

#[cfg(test)]
mod tests {
    use reqflow_core::domain::user::Role;
    use reqflow_core::routing::RoleDirectory;

    use super::SqlUserRepository;
    use crate::repositories::UserRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn create_and_find_by_id() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let manager = repo.create("Dana Flores", Role::DirectManager, None).await.expect("create");
        let employee = repo
            .create("Ali Tran", Role::Requester, Some(manager.id))
            .await
            .expect("create with manager");

        let found = repo.find_by_id(employee.id).await.expect("find").expect("exists");
        assert_eq!(found.name, "Ali Tran");
        assert_eq!(found.role, Role::Requester);
        assert_eq!(found.manager_id, Some(manager.id));
    }

    #[tokio::test]
    async fn find_by_role_returns_lowest_id_holder() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let first = repo.create("First Holder", Role::Procurement, None).await.expect("create");
        repo.create("Second Holder", Role::Procurement, None).await.expect("create");

        let found = repo.find_by_role(Role::Procurement).await.expect("find").expect("exists");
        assert_eq!(found.id, first.id);

        let none = repo.find_by_role(Role::Executive).await.expect("find");
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn directory_snapshot_covers_all_seeded_roles() {
        let pool = setup().await;
        let repo = SqlUserRepository::new(pool);

        let procurement = repo.create("Pat Quinn", Role::Procurement, None).await.expect("create");
        let finance = repo.create("Finn Mercer", Role::FinanceManager, None).await.expect("create");

        let directory = repo.load_directory().await.expect("snapshot");
        assert_eq!(
            directory.lookup_by_role(Role::Procurement).map(|u| u.id),
            Some(procurement.id)
        );
        assert_eq!(
            directory.lookup_by_role(Role::FinanceManager).map(|u| u.id),
            Some(finance.id)
        );
        assert!(directory.lookup_by_role(Role::Executive).is_none());
    }
}
