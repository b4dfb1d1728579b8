use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::MySqlPool;

use crate::models::staff::StaffId;
use crate::models::ticket::{
    AmountPaid, FulfillmentState, PaymentState, SessionId, TicketRequest, TicketSubmission,
};
use crate::repositories::{PaymentTransition, TicketRepository};
use crate::utils::error::{AppError, AppResult};

const TICKET_COLUMNS: &str = "session_id, document, payment_status, order_status, amount_currency, \
     amount_paid, pnr, handled_by, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    session_id: String,
    document: Json<TicketSubmission>,
    payment_status: String,
    order_status: String,
    amount_currency: String,
    amount_paid: Decimal,
    pnr: Option<String>,
    handled_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for TicketRequest {
    type Error = AppError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| AppError::DatabaseError(format!("ticket {}: corrupt {}", row.session_id, what));

        let session_id: SessionId = row.session_id.parse().map_err(|_| corrupt("session_id"))?;
        let payment_status: PaymentState = row.payment_status.parse().map_err(|_| corrupt("payment_status"))?;
        let order_status: FulfillmentState = row.order_status.parse().map_err(|_| corrupt("order_status"))?;
        let handled_by = match row.handled_by.as_deref() {
            Some(raw) => Some(raw.parse::<StaffId>().map_err(|_| corrupt("handled_by"))?),
            None => None,
        };

        Ok(TicketRequest {
            session_id,
            submission: row.document.0,
            payment_status,
            order_status,
            amount_paid: AmountPaid {
                currency: row.amount_currency,
                amount: row.amount_paid,
            },
            pnr: row.pnr,
            handled_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub struct MySqlTicketRepository {
    pool: MySqlPool,
}

impl MySqlTicketRepository {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlTicketRepository { pool }
    }
}

#[async_trait]
impl TicketRepository for MySqlTicketRepository {
    async fn insert(&self, ticket: &TicketRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ticket_request (session_id, document, payment_status, order_status,
                amount_currency, amount_paid, pnr, handled_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(ticket.session_id.to_string())
        .bind(Json(&ticket.submission))
        .bind(ticket.payment_status.to_string())
        .bind(ticket.order_status.to_string())
        .bind(&ticket.amount_paid.currency)
        .bind(ticket.amount_paid.amount)
        .bind(&ticket.pnr)
        .bind(ticket.handled_by.map(|id| id.to_string()))
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_session(&self, session_id: &SessionId) -> AppResult<Option<TicketRequest>> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM ticket_request WHERE session_id = ?"
        ))
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TicketRequest::try_from).transpose()
    }

    async fn list(&self, offset: u64, limit: u32) -> AppResult<(Vec<TicketRequest>, u64)> {
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM ticket_request ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ticket_request")
            .fetch_one(&self.pool)
            .await?;

        let tickets = rows
            .into_iter()
            .map(TicketRequest::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        Ok((tickets, total.max(0) as u64))
    }

    async fn mark_paid(&self, session_id: &SessionId, amount: &AmountPaid) -> AppResult<PaymentTransition> {
        // The WHERE clause makes concurrent deliveries race on the row lock; only one sees a changed row
        let result = sqlx::query(
            r#"
            UPDATE ticket_request
            SET payment_status = ?, order_status = ?, amount_currency = ?, amount_paid = ?, updated_at = ?
            WHERE session_id = ? AND payment_status <> ?
            "#,
        )
        .bind(PaymentState::Paid.to_string())
        .bind(FulfillmentState::Pending.to_string())
        .bind(&amount.currency)
        .bind(amount.amount)
        .bind(Utc::now())
        .bind(session_id.to_string())
        .bind(PaymentState::Paid.to_string())
        .execute(&self.pool)
        .await?;

        let applied = result.rows_affected() == 1;
        Ok(match self.find_by_session(session_id).await? {
            Some(ticket) if applied => PaymentTransition::Applied(ticket),
            Some(ticket) => PaymentTransition::AlreadyPaid(ticket),
            None => PaymentTransition::NotFound,
        })
    }

    async fn attach_pnr(&self, session_id: &SessionId, pnr: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE ticket_request SET pnr = ?, updated_at = ? WHERE session_id = ? AND pnr IS NULL",
        )
        .bind(pnr)
        .bind(Utc::now())
        .bind(session_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_fulfillment(
        &self,
        session_id: &SessionId,
        state: FulfillmentState,
        handled_by: &StaffId,
    ) -> AppResult<Option<TicketRequest>> {
        // MySQL reports zero affected rows for a no-op write, so existence is judged by the re-read
        sqlx::query(
            "UPDATE ticket_request SET order_status = ?, handled_by = ?, updated_at = ? WHERE session_id = ?",
        )
        .bind(state.to_string())
        .bind(handled_by.to_string())
        .bind(Utc::now())
        .bind(session_id.to_string())
        .execute(&self.pool)
        .await?;

        self.find_by_session(session_id).await
    }

    async fn delete(&self, session_id: &SessionId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM ticket_request WHERE session_id = ?")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
