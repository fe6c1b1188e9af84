use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical seed org chart: one holder per approval role, requester
/// reporting to the direct manager. Ids are fixed so demos and end-to-end
/// checks can reference them directly.
const SEED_USERS: &[SeedUserContract] = &[
    SeedUserContract {
        id: 1,
        name: "Evelyn Marsh",
        role: "EXECUTIVE",
        manager_id: None,
        label: "seed-executive",
    },
    SeedUserContract {
        id: 2,
        name: "Felix Okonkwo",
        role: "FINANCE_MANAGER",
        manager_id: Some(1),
        label: "seed-finance-manager",
    },
    SeedUserContract {
        id: 3,
        name: "Amara Diallo",
        role: "ADMIN_MANAGER",
        manager_id: Some(1),
        label: "seed-admin-manager",
    },
    SeedUserContract {
        id: 4,
        name: "Priya Raman",
        role: "PROCUREMENT",
        manager_id: Some(3),
        label: "seed-procurement",
    },
    SeedUserContract {
        id: 5,
        name: "Diego Santos",
        role: "DIRECT_MANAGER",
        manager_id: Some(1),
        label: "seed-direct-manager",
    },
    SeedUserContract {
        id: 6,
        name: "Rosa Ibanez",
        role: "REQUESTER",
        manager_id: Some(5),
        label: "seed-requester",
    },
];

/// Seed dataset covering the full approval chain.
pub struct SeedDataset;

impl SeedDataset {
    /// SQL fixture content for the seed org chart.
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_data.sql");

    /// Load the seed dataset. Safe to call repeatedly; rows are replaced,
    /// not duplicated.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let users_seeded = SEED_USERS
            .iter()
            .map(|user| UserSeedInfo { id: user.id, name: user.name, role: user.role })
            .collect::<Vec<_>>();

        Ok(SeedResult { users_seeded })
    }

    /// Verify that the seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for user in SEED_USERS {
            let matches: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users
                 WHERE id = ?1 AND name = ?2 AND role = ?3 AND manager_id IS ?4)",
            )
            .bind(user.id)
            .bind(user.name)
            .bind(user.role)
            .bind(user.manager_id)
            .fetch_one(pool)
            .await?;
            checks.push((user.label, matches == 1));

            // Exactly one seeded holder per role.
            let holders: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM users WHERE role = ?1 AND id <= 6",
            )
            .bind(user.role)
            .fetch_one(pool)
            .await?;
            checks.push((user.role_count_label(), holders == 1));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeded users and everything that hangs off them.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let ids = seed_id_list();
        let mut tx = pool.begin().await?;

        sqlx::query(&format!("DELETE FROM notifications WHERE user_id IN {ids}"))
            .execute(&mut *tx)
            .await?;
        // Items and logs cascade from the request rows.
        sqlx::query(&format!("DELETE FROM requests WHERE requester_id IN {ids}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM users WHERE id IN {ids}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedUserContract {
    id: i64,
    name: &'static str,
    role: &'static str,
    manager_id: Option<i64>,
    label: &'static str,
}

impl SeedUserContract {
    fn role_count_label(&self) -> &'static str {
        match self.role {
            "EXECUTIVE" => "role-count-executive",
            "FINANCE_MANAGER" => "role-count-finance-manager",
            "ADMIN_MANAGER" => "role-count-admin-manager",
            "PROCUREMENT" => "role-count-procurement",
            "DIRECT_MANAGER" => "role-count-direct-manager",
            _ => "role-count-requester",
        }
    }
}

fn seed_id_list() -> String {
    let ids = SEED_USERS.iter().map(|u| u.id.to_string()).collect::<Vec<_>>().join(",");
    format!("({ids})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub users_seeded: Vec<UserSeedInfo>,
}

#[derive(Debug)]
pub struct UserSeedInfo {
    pub id: i64,
    pub name: &'static str,
    pub role: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}
