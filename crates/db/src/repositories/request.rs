use rust_decimal::Decimal;
use sqlx::Row;

use reqflow_core::domain::quote_slate::QuoteSlate;
use reqflow_core::domain::request::{PurchaseRequest, RequestId, RequestItem, RequestStatus};
use reqflow_core::domain::user::UserId;

use super::{parse_datetime, RepositoryError, RequestRepository};
use crate::DbPool;

pub struct SqlRequestRepository {
    pool: DbPool,
}

impl SqlRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn status_as_str(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Draft => "DRAFT",
        RequestStatus::Pending => "PENDING",
        RequestStatus::Approved => "APPROVED",
        RequestStatus::Rejected => "REJECTED",
        RequestStatus::WaitingForQuotes => "WAITING_FOR_QUOTES",
    }
}

pub fn parse_status(raw: &str) -> Result<RequestStatus, RepositoryError> {
    match raw {
        "DRAFT" => Ok(RequestStatus::Draft),
        "PENDING" => Ok(RequestStatus::Pending),
        "APPROVED" => Ok(RequestStatus::Approved),
        "REJECTED" => Ok(RequestStatus::Rejected),
        "WAITING_FOR_QUOTES" => Ok(RequestStatus::WaitingForQuotes),
        other => Err(RepositoryError::Decode(format!("unknown request status `{other}`"))),
    }
}

pub(crate) fn parse_decimal(raw: &str) -> Result<Decimal, RepositoryError> {
    raw.parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("bad decimal `{raw}`: {e}")))
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<RequestItem, RepositoryError> {
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let price_str: Option<String> =
        row.try_get("price").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let price = match price_str {
        Some(raw) => Some(parse_decimal(&raw)?),
        None => None,
    };

    Ok(RequestItem { name, quantity: quantity.max(0) as u32, price })
}

pub(crate) fn row_to_request(
    row: &sqlx::sqlite::SqliteRow,
    items: Vec<RequestItem>,
) -> Result<PurchaseRequest, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester_id: i64 =
        row.try_get("requester_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let title: String = row.try_get("title").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let description: Option<String> =
        row.try_get("description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_amount_str: String =
        row.try_get("total_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_approver_id: Option<i64> =
        row.try_get("current_approver_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quote_data: String =
        row.try_get("quote_data").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let quotes: QuoteSlate = serde_json::from_str(&quote_data)
        .map_err(|e| RepositoryError::Decode(format!("bad quote_data: {e}")))?;

    Ok(PurchaseRequest {
        id: RequestId(id),
        requester_id: UserId(requester_id),
        title,
        description,
        items,
        status: parse_status(&status_str)?,
        current_approver_id: current_approver_id.map(UserId),
        total_amount: parse_decimal(&total_amount_str)?,
        quotes,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

const REQUEST_COLUMNS: &str = "id, requester_id, title, description, total_amount, status,
                               current_approver_id, quote_data, created_at, updated_at";

impl SqlRequestRepository {
    async fn load_items(&self, id: RequestId) -> Result<Vec<RequestItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT name, quantity, price FROM request_items WHERE request_id = ?1 ORDER BY id",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    async fn hydrate(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
    ) -> Result<Vec<PurchaseRequest>, RepositoryError> {
        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let items = self.load_items(RequestId(id)).await?;
            requests.push(row_to_request(row, items)?);
        }
        Ok(requests)
    }
}

#[async_trait::async_trait]
impl RequestRepository for SqlRequestRepository {
    async fn find_by_id(&self, id: RequestId) -> Result<Option<PurchaseRequest>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => {
                let items = self.load_items(id).await?;
                Ok(Some(row_to_request(r, items)?))
            }
            None => Ok(None),
        }
    }

    async fn list_inbox(&self, user: UserId) -> Result<Vec<PurchaseRequest>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests
             WHERE current_approver_id = ?1
             ORDER BY updated_at DESC"
        ))
        .bind(user.0)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn list_archive(&self, user: UserId) -> Result<Vec<PurchaseRequest>, RepositoryError> {
        // Requests the user has acted on but does not own.
        let rows = sqlx::query(
            "SELECT DISTINCT r.id AS id, r.requester_id AS requester_id, r.title AS title,
                    r.description AS description, r.total_amount AS total_amount,
                    r.status AS status, r.current_approver_id AS current_approver_id,
                    r.quote_data AS quote_data, r.created_at AS created_at,
                    r.updated_at AS updated_at
             FROM requests r
             JOIN request_logs l ON l.request_id = r.id
             WHERE l.actor_id = ?1 AND r.requester_id <> ?1
             ORDER BY r.updated_at DESC",
        )
        .bind(user.0)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }
}
