use crate::db;
use crate::mailer::Mailer;
use crate::model::OutboxKind;
use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

/// Process at most one due outbox task. Returns whether a task was found.
/// Success deletes the task; failure reschedules it with exponential backoff
/// capped at `max_backoff_secs`.
#[instrument(skip_all)]
pub async fn process_next_task(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    max_backoff_secs: i64,
) -> Result<bool> {
    if let Some((id, kind, ref_id, attempt)) = db::next_due_outbox(pool).await? {
        let Some(kind_enum) = OutboxKind::parse_kind(&kind) else {
            warn!(id, kind, "dropping outbox task of unknown kind");
            db::delete_outbox(pool, id).await?;
            return Ok(true);
        };
        // All per-task work feeds this Result so any failure, including a
        // missing referenced row, lands in the backoff branch instead of
        // bubbling out and leaving the task due with attempt 0.
        let res = match kind_enum {
            OutboxKind::SendContactEmail => {
                match db::fetch_contact_for_outbox(pool, ref_id).await {
                    Ok(contact) => mailer.send_contact_email(&contact).await,
                    Err(err) => Err(err),
                }
            }
        };
        match res {
            Ok(message_id) => {
                db::delete_outbox(pool, id).await?;
                info!(id, kind, ref_id, message_id, "outbox task succeeded");
            }
            Err(err) => {
                warn!(
                    ?err,
                    id, kind, ref_id, attempt, "outbox task failed; backoff"
                );
                db::backoff_outbox_with_cap(pool, id, attempt, max_backoff_secs).await?;
            }
        }
        return Ok(true);
    }
    Ok(false)
}
