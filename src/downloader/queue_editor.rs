//! Queue editor — remote/local mutation verbs against the download queue and
//! post-processing list (§4.8 `MoveOffset`/`MoveTop`/`MoveBottom`/`Pause`/`Resume`/
//! `Delete`/`SetPriority`/`PostMove`/`PostPause`/`PostResume`/`PostDelete`/
//! `SetCategory`/`SetName`/`SetDupeKey`).
//!
//! Every verb is idempotent on no-op and, for the reordering verbs, honors an
//! optional "smart order" flag: when set, the supplied ids are processed in
//! their current queue order rather than the order the caller listed them in,
//! so that reordering a scattered selection keeps the selection's relative
//! order stable.

use crate::error::{DatabaseError, Error, Result};
use crate::types::{DownloadId, Priority, Status};

use super::UsenetDownloader;

/// A single queue-editor verb, dispatched under the queue lock by [`UsenetDownloader::edit_queue`].
#[derive(Debug, Clone)]
pub enum QueueEditAction {
    /// Shift each selected id by `n` positions in the queue order (negative = toward the top).
    MoveOffset(i64),
    /// Move the selection to the front of the queue, preserving relative order.
    MoveTop,
    /// Move the selection to the back of the queue, preserving relative order.
    MoveBottom,
    /// Pause the selected downloads without removing them from the queue.
    Pause,
    /// Resume previously paused downloads.
    Resume,
    /// Mark the selected downloads deleted, unlinking immediately if no worker is active.
    Delete,
    /// Assign a new priority; does not reorder automatically.
    SetPriority(Priority),
    /// Reorder within the post-processing list (same offset semantics as `MoveOffset`).
    PostMove(i64),
    /// Pause post-processing for the selected jobs.
    PostPause,
    /// Resume post-processing for the selected jobs.
    PostResume,
    /// Cancel the selected post-processing jobs.
    PostDelete,
    /// Attribute mutation: set category on a single collection.
    SetCategory(Option<String>),
    /// Attribute mutation: rename a single collection.
    SetName(String),
    /// Attribute mutation: set the dupe-key on a single collection.
    SetDupeKey(Option<String>),
}

/// A batch edit request: the ids it applies to, the verb, and the ordering hint.
#[derive(Debug, Clone)]
pub struct QueueEditRequest {
    /// Download ids the action applies to.
    pub ids: Vec<DownloadId>,
    /// The verb to apply.
    pub action: QueueEditAction,
    /// When true, `ids` are reordered to match current queue order before
    /// a position-sensitive verb (`MoveOffset`/`MoveTop`/`MoveBottom`/`PostMove`) runs.
    pub smart_order: bool,
}

impl UsenetDownloader {
    /// Apply a queue-editor verb to a batch of download ids.
    ///
    /// All mutations are idempotent on no-op: pausing an already-paused download,
    /// deleting an already-deleted one, etc. are silently accepted.
    pub async fn edit_queue(&self, request: QueueEditRequest) -> Result<()> {
        match request.action {
            QueueEditAction::MoveOffset(n) => {
                self.reorder_selection(&request.ids, request.smart_order, Status::Queued, |order, selected| {
                    apply_offset(order, selected, n)
                })
                .await
            }
            QueueEditAction::MoveTop => {
                self.reorder_selection(&request.ids, request.smart_order, Status::Queued, apply_move_top)
                    .await
            }
            QueueEditAction::MoveBottom => {
                self.reorder_selection(&request.ids, request.smart_order, Status::Queued, apply_move_bottom)
                    .await
            }
            QueueEditAction::Pause => {
                for id in &request.ids {
                    ignore_already_in_state(self.pause(*id).await)?;
                }
                Ok(())
            }
            QueueEditAction::Resume => {
                for id in &request.ids {
                    ignore_already_in_state(self.resume(*id).await)?;
                }
                Ok(())
            }
            QueueEditAction::Delete => {
                for id in &request.ids {
                    ignore_not_found(self.cancel(*id).await)?;
                }
                Ok(())
            }
            QueueEditAction::SetPriority(priority) => {
                for id in &request.ids {
                    self.set_priority(*id, priority).await?;
                }
                Ok(())
            }
            QueueEditAction::PostMove(n) => {
                self.reorder_selection(
                    &request.ids,
                    request.smart_order,
                    Status::Processing,
                    |order, selected| apply_offset(order, selected, n),
                )
                .await
            }
            QueueEditAction::PostPause => {
                for id in &request.ids {
                    self.db.set_post_paused(*id, true).await?;
                }
                Ok(())
            }
            QueueEditAction::PostResume => {
                for id in &request.ids {
                    self.db.set_post_paused(*id, false).await?;
                }
                Ok(())
            }
            QueueEditAction::PostDelete => {
                for id in &request.ids {
                    ignore_not_found(self.cancel(*id).await)?;
                }
                Ok(())
            }
            QueueEditAction::SetCategory(category) => {
                let id = single_id(&request.ids)?;
                self.db.set_category(id, category.as_deref()).await
            }
            QueueEditAction::SetName(name) => {
                let id = single_id(&request.ids)?;
                self.db.set_name(id, &name).await
            }
            QueueEditAction::SetDupeKey(dupe_key) => {
                let id = single_id(&request.ids)?;
                self.db.set_dupe_key(id, dupe_key.as_deref()).await
            }
        }
    }

    /// Shared reordering path for `MoveOffset`/`MoveTop`/`MoveBottom`/`PostMove`.
    ///
    /// Loads the current ordering of all downloads in `scope_status`, applies
    /// `f` to compute the new ordering, then persists every id's new position.
    async fn reorder_selection(
        &self,
        ids: &[DownloadId],
        smart_order: bool,
        scope_status: Status,
        f: impl FnOnce(Vec<DownloadId>, Vec<DownloadId>) -> Vec<DownloadId>,
    ) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let scoped = self.db.list_downloads_by_status(scope_status.to_i32()).await?;
        let mut order: Vec<DownloadId> = scoped
            .iter()
            .map(|d| DownloadId(d.id))
            .collect();

        let selected: Vec<DownloadId> = if smart_order {
            // Process in current queue order, not caller-supplied order, so a
            // scattered selection keeps its relative order stable.
            order
                .iter()
                .copied()
                .filter(|id| ids.contains(id))
                .collect()
        } else {
            ids.iter().copied().filter(|id| order.contains(id)).collect()
        };

        if selected.is_empty() {
            return Ok(());
        }

        order = f(order, selected);

        for (position, id) in order.into_iter().enumerate() {
            self.db.set_queue_position(id, Some(position as i64)).await?;
        }

        Ok(())
    }
}

/// Returns the single id a single-target verb (SetCategory/SetName/SetDupeKey) applies to.
fn single_id(ids: &[DownloadId]) -> Result<DownloadId> {
    match ids {
        [id] => Ok(*id),
        [] => Err(Error::Other(
            "queue-editor attribute verb requires exactly one id, got none".to_string(),
        )),
        _ => Err(Error::Other(format!(
            "queue-editor attribute verb requires exactly one id, got {}",
            ids.len()
        ))),
    }
}

/// Move every id in `selected` by `offset` positions in `order`, preserving the
/// selection's relative order (stable). Positions are clamped to the list bounds.
fn apply_offset(order: Vec<DownloadId>, selected: Vec<DownloadId>, offset: i64) -> Vec<DownloadId> {
    let n = order.len();
    let original_index: std::collections::HashMap<DownloadId, usize> =
        order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let rest: Vec<DownloadId> = order
        .iter()
        .copied()
        .filter(|id| !selected.contains(id))
        .collect();

    // Insert each selected id back into `rest` at its clamped target index,
    // processing in an order that keeps earlier moves from shifting later ones:
    // ascending original-index when moving down, descending when moving up.
    let mut processing_order = selected.clone();
    if offset < 0 {
        processing_order.reverse();
    }

    let mut result = rest;
    for id in processing_order {
        let current = original_index.get(&id).copied().unwrap_or(0) as i64;
        let target = (current + offset).clamp(0, n as i64 - 1) as usize;
        let insert_at = target.min(result.len());
        result.insert(insert_at, id);
    }

    result
}

/// Move the selection to the front of the queue, preserving its relative order.
fn apply_move_top(order: Vec<DownloadId>, selected: Vec<DownloadId>) -> Vec<DownloadId> {
    let rest: Vec<DownloadId> = order.into_iter().filter(|id| !selected.contains(id)).collect();
    let mut result = selected;
    result.extend(rest);
    result
}

/// Move the selection to the back of the queue, preserving its relative order.
fn apply_move_bottom(order: Vec<DownloadId>, selected: Vec<DownloadId>) -> Vec<DownloadId> {
    let mut result: Vec<DownloadId> = order.into_iter().filter(|id| !selected.contains(id)).collect();
    result.extend(selected);
    result
}

/// Treat `AlreadyInState`/`InvalidState` (already paused/resumed) as a no-op success.
fn ignore_already_in_state(result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(Error::Download(crate::error::DownloadError::InvalidState { .. })) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Treat a missing download as an already-applied delete (idempotent no-op).
fn ignore_not_found(result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(Error::Database(DatabaseError::NotFound(_))) => Ok(()),
        Err(e) => Err(e),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_top_preserves_relative_order_of_selection() {
        let order = vec![
            DownloadId(1),
            DownloadId(2),
            DownloadId(3),
            DownloadId(4),
        ];
        let selected = vec![DownloadId(2), DownloadId(4)];
        let result = apply_move_top(order, selected);
        assert_eq!(
            result,
            vec![DownloadId(2), DownloadId(4), DownloadId(1), DownloadId(3)]
        );
    }

    #[test]
    fn move_bottom_preserves_relative_order_of_selection() {
        let order = vec![
            DownloadId(1),
            DownloadId(2),
            DownloadId(3),
            DownloadId(4),
        ];
        let selected = vec![DownloadId(1), DownloadId(3)];
        let result = apply_move_bottom(order, selected);
        assert_eq!(
            result,
            vec![DownloadId(2), DownloadId(4), DownloadId(1), DownloadId(3)]
        );
    }

    #[test]
    fn offset_plus_then_minus_is_identity() {
        let order = vec![
            DownloadId(1),
            DownloadId(2),
            DownloadId(3),
            DownloadId(4),
            DownloadId(5),
        ];
        let selected = vec![DownloadId(2)];

        let moved = apply_offset(order.clone(), selected.clone(), 2);
        assert_eq!(
            moved,
            vec![
                DownloadId(1),
                DownloadId(3),
                DownloadId(4),
                DownloadId(2),
                DownloadId(5)
            ]
        );

        let back = apply_offset(moved, selected, -2);
        assert_eq!(back, order, "MoveOffset(+n) then MoveOffset(-n) must be the identity");
    }

    #[test]
    fn offset_clamps_at_queue_start() {
        let order = vec![DownloadId(1), DownloadId(2), DownloadId(3)];
        let selected = vec![DownloadId(2)];
        let moved = apply_offset(order, selected, -100);
        assert_eq!(moved, vec![DownloadId(2), DownloadId(1), DownloadId(3)]);
    }

    #[test]
    fn offset_clamps_at_queue_end() {
        let order = vec![DownloadId(1), DownloadId(2), DownloadId(3)];
        let selected = vec![DownloadId(1)];
        let moved = apply_offset(order, selected, 100);
        assert_eq!(moved, vec![DownloadId(2), DownloadId(3), DownloadId(1)]);
    }

    #[test]
    fn single_id_rejects_empty_and_multiple() {
        assert!(single_id(&[]).is_err());
        assert!(single_id(&[DownloadId(1), DownloadId(2)]).is_err());
        assert!(single_id(&[DownloadId(1)]).is_ok());
    }
}
