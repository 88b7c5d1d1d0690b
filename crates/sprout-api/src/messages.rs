use std::collections::HashMap;

use anyhow::anyhow;
use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use sprout_db::models::MessageRow;
use sprout_db::{now_ts, parse_ts};
use sprout_types::Id;
use sprout_types::api::{
    ConversationDetail, ConversationSummary, MessageWithUser, SendMessageRequest,
};
use sprout_types::models::Message;

use crate::error::{ApiError, ApiResult, bad_request, not_found, run_blocking};
use crate::extract::AuthUser;
use crate::state::AppState;
use crate::users::{fetch_profile, fetch_user};

/// Sender is always the session user — any sender supplied in the body
/// is ignored. Read flag and timestamp are set server-side.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(from): AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<Message>> {
    if req.to_id.is_empty() || req.listing_id.is_empty() || req.content.is_empty() {
        return Err(bad_request(
            "Recipient, listing, and message content are required",
        ));
    }

    let row = run_blocking(move || {
        let recipient = match Id::from_param(&req.to_id) {
            Some(id) => state.db.get_user(id.raw())?,
            None => None,
        };
        let recipient = recipient.ok_or_else(|| not_found("Recipient not found"))?;

        let listing = match Id::from_param(&req.listing_id) {
            Some(id) => state.db.get_listing(id.raw())?,
            None => None,
        };
        let listing = listing.ok_or_else(|| not_found("Listing not found"))?;

        let id = state.db.insert_message(&MessageRow {
            id: None,
            from_id: from.raw(),
            to_id: recipient.id.unwrap_or_default(),
            listing_id: listing.id,
            content: req.content,
            read: false,
            created_at: now_ts(),
        })?;

        state
            .db
            .get_message(id)?
            .ok_or_else(|| ApiError::Internal(anyhow!("message vanished after insert")))
    })
    .await?;
    Ok(Json(row.into_message()))
}

/// All of the caller's messages, enriched. Rows with a vanished
/// participant or listing are dropped rather than failing the page.
pub async fn get_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<MessageWithUser>>> {
    let out = run_blocking(move || {
        let mut out = Vec::new();
        for row in state.db.get_messages_for_user(user.raw())? {
            if let Some(enriched) = enrich_message(&state, row)? {
                out.push(enriched);
            }
        }
        Ok(out)
    })
    .await?;
    Ok(Json(out))
}

/// Viewing a message as its recipient marks it read — a read with a
/// side effect, same as opening a conversation.
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<MessageWithUser>> {
    let enriched = run_blocking(move || {
        let row = match Id::from_param(&id) {
            Some(id) => state.db.get_message(id.raw())?,
            None => None,
        };
        let mut row = row.ok_or_else(|| not_found("Message not found"))?;

        if row.from_id != user.raw() && row.to_id != user.raw() {
            return Err(ApiError::Forbidden);
        }

        if row.to_id == user.raw() && !row.read {
            if let Some(id) = row.id {
                state.db.mark_message_read(id)?;
            }
            row.read = true;
        }

        let msg_id = row.id;
        enrich_message(&state, row)?.ok_or_else(|| {
            ApiError::Internal(anyhow!("message {:?} references missing data", msg_id))
        })
    })
    .await?;
    Ok(Json(enriched))
}

pub async fn get_conversations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let out = run_blocking(move || {
        let messages = state.db.get_messages_for_user(user.raw())?;

        let mut out = Vec::new();
        for thread in summarize_threads(user.raw(), &messages) {
            // Partners that no longer resolve vanish from the list
            let Some(partner) = fetch_profile(&state, thread.partner_id)? else {
                continue;
            };
            out.push(ConversationSummary {
                user_id: partner.id,
                username: partner.username,
                profile_pic: partner.profile_pic,
                last_message: thread.last_message,
                last_activity: thread.last_activity,
                unread: thread.unread,
            });
        }
        Ok(out)
    })
    .await?;

    Ok(Json(out))
}

/// Full thread with one partner, oldest first. Fetching it marks every
/// inbound unread message read, so the summary unread is 0 by
/// construction.
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(partner_id): Path<String>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<ConversationDetail>> {
    let (partner, messages) = run_blocking(move || {
        let partner = match Id::from_param(&partner_id) {
            Some(id) => fetch_user(&state, id)?,
            None => None,
        };
        let partner = partner.ok_or_else(|| not_found("User not found"))?;

        let rows = state.db.get_messages_between(user.raw(), partner.id.raw())?;

        let mut messages = Vec::new();
        for mut row in rows {
            // Listing resolution comes first: messages about vanished
            // listings are dropped without touching their read flag.
            let listing = match row.listing_id {
                Some(id) => state.db.get_listing(id)?,
                None => None,
            };
            let Some(listing) = listing else {
                continue;
            };

            if row.to_id == user.raw() && !row.read {
                if let Some(id) = row.id {
                    state.db.mark_message_read(id)?;
                }
                row.read = true;
            }

            let Some(from_user) = fetch_profile(&state, row.from_id)? else {
                continue;
            };
            let Some(to_user) = fetch_profile(&state, row.to_id)? else {
                continue;
            };
            messages.push(MessageWithUser {
                message: row.into_message(),
                from_user,
                to_user,
                listing: listing.into_listing(),
            });
        }

        Ok((partner, messages))
    })
    .await?;

    Ok(Json(ConversationDetail {
        user_id: partner.id,
        username: partner.username.clone(),
        profile_pic: partner.profile_pic.clone(),
        messages,
        unread: 0,
    }))
}

fn enrich_message(state: &AppState, row: MessageRow) -> ApiResult<Option<MessageWithUser>> {
    let listing = match row.listing_id {
        Some(id) => state.db.get_listing(id)?,
        None => None,
    };
    let Some(listing) = listing else {
        return Ok(None);
    };
    let Some(from_user) = fetch_profile(state, row.from_id)? else {
        return Ok(None);
    };
    let Some(to_user) = fetch_profile(state, row.to_id)? else {
        return Ok(None);
    };

    Ok(Some(MessageWithUser {
        message: row.into_message(),
        from_user,
        to_user,
        listing: listing.into_listing(),
    }))
}

struct PartnerThread {
    partner_id: i64,
    last_message: String,
    last_activity: DateTime<Utc>,
    unread: usize,
}

/// Partition a user's messages by the other participant and reduce each
/// partition to (last message, last activity, unread-inbound count).
/// Ties on created_at keep the first-seen message; output is sorted by
/// last activity, most recent first.
fn summarize_threads(user_id: i64, messages: &[MessageRow]) -> Vec<PartnerThread> {
    let mut partitions: HashMap<i64, Vec<&MessageRow>> = HashMap::new();
    for msg in messages {
        let partner = if msg.from_id == user_id {
            msg.to_id
        } else {
            msg.from_id
        };
        partitions.entry(partner).or_default().push(msg);
    }

    let mut threads = Vec::new();
    for (partner_id, msgs) in partitions {
        let mut last_message = String::new();
        let mut last_activity = DateTime::<Utc>::default();
        let mut unread = 0;

        for msg in msgs {
            let created = parse_ts(&msg.created_at);
            if created > last_activity {
                last_message = msg.content.clone();
                last_activity = created;
            }
            if msg.to_id == user_id && !msg.read {
                unread += 1;
            }
        }

        threads.push(PartnerThread {
            partner_id,
            last_message,
            last_activity,
            unread,
        });
    }

    threads.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    threads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: i64, from: i64, to: i64, content: &str, read: bool, at: &str) -> MessageRow {
        MessageRow {
            id: Some(id),
            from_id: from,
            to_id: to,
            listing_id: None,
            content: content.into(),
            read,
            created_at: at.into(),
        }
    }

    #[test]
    fn groups_by_partner_and_tracks_latest() {
        // A(1) <-> B(2), A(1) <-> C(3)
        let messages = vec![
            msg(1, 1, 2, "hi bo", true, "2026-01-01T10:00:00.000000Z"),
            msg(2, 2, 1, "hey anna", false, "2026-01-01T11:00:00.000000Z"),
            msg(3, 3, 1, "plant still there?", false, "2026-01-01T09:00:00.000000Z"),
        ];

        let threads = summarize_threads(1, &messages);
        assert_eq!(threads.len(), 2);

        // Sorted by last activity, most recent first
        assert_eq!(threads[0].partner_id, 2);
        assert_eq!(threads[0].last_message, "hey anna");
        assert_eq!(threads[0].unread, 1);

        assert_eq!(threads[1].partner_id, 3);
        assert_eq!(threads[1].unread, 1);
    }

    #[test]
    fn unread_counts_only_inbound_unread() {
        let messages = vec![
            msg(1, 1, 2, "sent by me, unread by them", false, "2026-01-01T10:00:00.000000Z"),
            msg(2, 2, 1, "inbound read", true, "2026-01-01T11:00:00.000000Z"),
        ];

        let threads = summarize_threads(1, &messages);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].unread, 0);
        assert_eq!(threads[0].last_message, "inbound read");
    }

    #[test]
    fn tie_on_timestamp_keeps_first_seen() {
        let at = "2026-01-01T10:00:00.000000Z";
        let messages = vec![
            msg(1, 1, 2, "first", true, at),
            msg(2, 2, 1, "second", true, at),
        ];

        let threads = summarize_threads(1, &messages);
        assert_eq!(threads[0].last_message, "first");
    }

    #[test]
    fn no_messages_means_no_threads() {
        assert!(summarize_threads(1, &[]).is_empty());
    }
}
