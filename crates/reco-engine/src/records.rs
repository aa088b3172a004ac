//! Reco mutations and reads.
//!
//! Mutations run inside one metadata transaction. When a file's content is
//! new or changed, the sealed blob is uploaded before the transaction
//! commits, so committed metadata never points at a missing object. Reads
//! require login and strip checksums from listings.

use reco_core::model::{
    is_reco_id, normalize_tags, now, Reco, RecoBox, RecoType, Tag, FIRST_RECO_ID,
};
use reco_core::{RecoError, RecoResult};
use reco_crypto::{seal, sha256_hex};
use reco_store::{BoxChange, BoxTarget, RecoQuery};
use tracing::{debug, info};

use crate::engine::Engine;

/// Outcome of [`Engine::update_reco`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoUpdate {
    Updated(Reco),
    /// Nothing the user can edit differs from the stored reco.
    NoChange,
}

impl Engine {
    /// Store a new reco. File recos need `blob` (the plaintext content) and
    /// configured cloud storage; notes must not carry a blob.
    ///
    /// A non-empty `reco.checksum` must match the blob's SHA-256. If
    /// `reco.box_id` is set the reco joins that box in the same transaction.
    pub async fn insert_reco(&self, reco: Reco, blob: Option<Vec<u8>>) -> RecoResult<Reco> {
        self.insert_with_box(reco, blob, None).await
    }

    /// Store a new reco and put it into `target` (a title creates the box if
    /// needed) within the same transaction. `target` takes precedence over
    /// `reco.box_id`.
    pub async fn insert_reco_into_box(
        &self,
        reco: Reco,
        blob: Option<Vec<u8>>,
        target: BoxTarget,
    ) -> RecoResult<Reco> {
        self.insert_with_box(reco, blob, Some(target)).await
    }

    async fn insert_with_box(
        &self,
        mut reco: Reco,
        blob: Option<Vec<u8>>,
        target: Option<BoxTarget>,
    ) -> RecoResult<Reco> {
        check_id(&reco.id)?;
        if reco.reco_type == RecoType::First {
            return Err(RecoError::InvalidInput(
                "bootstrap records are created with the account".into(),
            ));
        }
        reco.deleted_at.clear();
        reco.tags = normalize_tags(&reco.tags);

        let upload = if reco.is_file() {
            let blob = blob.ok_or_else(|| {
                RecoError::InvalidInput(format!("file reco {} has no content", reco.id))
            })?;
            let (key, storage) = self.ready().await?;
            fill_checksum(&mut reco, &blob)?;
            Some((key, storage, blob))
        } else {
            self.master_key().await?;
            if blob.is_some() {
                return Err(RecoError::InvalidInput("notes carry no file content".into()));
            }
            reco.checksum.clear();
            None
        };

        let id = reco.id.clone();
        let target_box = match (target, reco.box_id.take()) {
            (Some(target), _) => Some(target),
            (None, box_id) => box_id.map(BoxTarget::Id),
        };

        let mut tx = self.store.begin().await;
        tx.save_reco(reco.clone())?;
        tx.add_tags(&id, &reco.tags);
        if let Some(target) = target_box {
            tx.change_box(&id, target)?;
        }
        let saved = tx.one_reco(&id)?.clone();

        if let Some((key, storage, blob)) = &upload {
            storage
                .put_object(&saved.blob_name(), seal(key.as_bytes(), blob)?)
                .await?;
        }
        tx.commit().await?;
        info!(id = %id, kind = ?saved.reco_type, "reco inserted");

        if let Some((_, _, blob)) = upload {
            self.cache_plaintext(&saved, blob).await?;
        }
        Ok(saved)
    }

    /// Replace the user-editable fields of a stored reco with those of `new`.
    ///
    /// Tags are updated by delta, a changed `box_id` moves the reco, and a
    /// new `blob` whose checksum differs is re-uploaded before commit.
    pub async fn update_reco(&self, new: Reco, blob: Option<Vec<u8>>) -> RecoResult<RecoUpdate> {
        check_id(&new.id)?;
        self.master_key().await?;

        let mut tx = self.store.begin().await;
        let old = tx.one_reco(&new.id)?.clone();
        if old.is_deleted() {
            return Err(RecoError::InvalidInput(format!(
                "reco {} is deleted; restore it first",
                old.id
            )));
        }

        let mut merged = Reco {
            id: old.id.clone(),
            reco_type: old.reco_type,
            access_count: old.access_count,
            accessed_at: old.accessed_at.clone(),
            created_at: old.created_at.clone(),
            updated_at: old.updated_at.clone(),
            deleted_at: String::new(),
            checksum: old.checksum.clone(),
            file_size: old.file_size,
            file_type: old.file_type.clone(),
            ..new
        };
        merged.tags = normalize_tags(&merged.tags);
        if merged.is_file() && merged.file_name != old.file_name {
            let name = merged.file_name.clone();
            merged.set_file_name(&name)?;
        }
        match &blob {
            Some(data) if merged.is_file() => {
                merged.checksum = sha256_hex(data);
                merged.file_size = data.len() as u64;
            }
            Some(_) => return Err(RecoError::InvalidInput("notes carry no file content".into())),
            None => {}
        }

        if old.same_content(&merged) {
            debug!(id = %old.id, "update is a no-op");
            return Ok(RecoUpdate::NoChange);
        }

        let content_changed = merged.checksum != old.checksum;
        let storage = if content_changed {
            Some(self.ready().await?)
        } else {
            None
        };

        let target_box = std::mem::replace(&mut merged.box_id, old.box_id.clone());
        merged.touch_updated();

        tx.delete_reco(&old.id)?;
        tx.save_reco(merged.clone())?;
        tx.apply_tag_delta(&old.id, &old.tags, &merged.tags)?;
        if target_box != old.box_id {
            match target_box {
                Some(box_id) => {
                    tx.change_box(&old.id, BoxTarget::Id(box_id))?;
                }
                None => {
                    tx.leave_box(&old.id)?;
                }
            }
        }
        let saved = tx.one_reco(&old.id)?.clone();

        if let (Some((key, storage)), Some(data)) = (&storage, &blob) {
            storage
                .put_object(&saved.blob_name(), seal(key.as_bytes(), data)?)
                .await?;
        }
        tx.commit().await?;
        info!(id = %saved.id, content_changed, "reco updated");

        if let (true, Some(data)) = (content_changed, blob) {
            self.cache_plaintext(&saved, data).await?;
        }
        Ok(RecoUpdate::Updated(saved))
    }

    /// Soft delete: stamps `deleted_at`. The blob, tags and box membership
    /// stay so the reco can be restored.
    pub async fn delete_reco(&self, id: &str) -> RecoResult<()> {
        check_id(id)?;
        self.master_key().await?;

        let mut tx = self.store.begin().await;
        let mut reco = tx.one_reco(id)?.clone();
        if reco.is_deleted() {
            return Ok(());
        }
        reco.deleted_at = now();
        tx.update_reco(reco)?;
        tx.commit().await?;
        info!(id, "reco deleted");
        Ok(())
    }

    /// Undo a soft delete. Fails with `AlreadyExists` if a live reco has
    /// taken over the same checksum meanwhile.
    pub async fn restore_reco(&self, id: &str) -> RecoResult<Reco> {
        check_id(id)?;
        self.master_key().await?;

        let mut tx = self.store.begin().await;
        let mut reco = tx.one_reco(id)?.clone();
        if !reco.is_deleted() {
            return Ok(reco);
        }
        reco.deleted_at.clear();
        reco.touch_updated();
        tx.update_reco(reco.clone())?;
        tx.commit().await?;
        info!(id, "reco restored");
        Ok(reco)
    }

    pub async fn change_box(&self, reco_id: &str, target: BoxTarget) -> RecoResult<BoxChange> {
        check_id(reco_id)?;
        self.master_key().await?;

        let mut tx = self.store.begin().await;
        let change = tx.change_box(reco_id, target)?;
        if change != BoxChange::NoChange {
            tx.commit().await?;
            debug!(reco_id, ?change, "box changed");
        }
        Ok(change)
    }

    pub async fn leave_box(&self, reco_id: &str) -> RecoResult<Option<String>> {
        check_id(reco_id)?;
        self.master_key().await?;

        let mut tx = self.store.begin().await;
        let left = tx.leave_box(reco_id)?;
        if left.is_some() {
            tx.commit().await?;
        }
        Ok(left)
    }

    pub async fn rename_box(&self, box_id: &str, title: &str) -> RecoResult<()> {
        self.master_key().await?;
        let mut tx = self.store.begin().await;
        tx.rename_box(box_id, title)?;
        tx.commit().await
    }

    pub async fn sort_box(&self, box_id: &str, order: &[String]) -> RecoResult<()> {
        self.master_key().await?;
        let mut tx = self.store.begin().await;
        tx.sort_box(box_id, order)?;
        tx.commit().await
    }

    /// Drop tags that no longer reference any reco.
    pub async fn prune_tags(&self) -> RecoResult<usize> {
        self.master_key().await?;
        let mut tx = self.store.begin().await;
        let pruned = tx.prune_empty_tags();
        if pruned > 0 {
            tx.commit().await?;
        }
        Ok(pruned)
    }

    pub async fn get_reco(&self, id: &str) -> RecoResult<Reco> {
        check_id(id)?;
        self.master_key().await?;
        Ok(self.store.read().await.one_reco(id)?.clone())
    }

    /// Like [`Engine::get_reco`] but counts the access.
    pub async fn access_reco(&self, id: &str) -> RecoResult<Reco> {
        check_id(id)?;
        self.master_key().await?;

        let mut tx = self.store.begin().await;
        let mut reco = tx.one_reco(id)?.clone();
        reco.access_count += 1;
        reco.accessed_at = now();
        tx.update_reco(reco.clone())?;
        tx.commit().await?;
        Ok(reco)
    }

    pub async fn list_recos(&self, query: &RecoQuery) -> RecoResult<Vec<Reco>> {
        self.master_key().await?;
        let tables = self.store.read().await;
        Ok(tables.select(query).iter().map(Reco::redacted).collect())
    }

    /// Live recos carrying `tag`, in the order they were tagged.
    pub async fn recos_by_tag(&self, tag: &str) -> RecoResult<Vec<Reco>> {
        self.master_key().await?;
        let tables = self.store.read().await;
        let tag = tables.tag(tag)?;
        Ok(tag
            .reco_ids
            .iter()
            .filter_map(|id| tables.one_reco(id).ok())
            .filter(|r| !r.is_deleted())
            .map(Reco::redacted)
            .collect())
    }

    /// Live recos in a box, in the box's own order.
    pub async fn recos_in_box(&self, box_id: &str) -> RecoResult<Vec<Reco>> {
        self.master_key().await?;
        let tables = self.store.read().await;
        let b = tables.box_by_id(box_id)?;
        Ok(b.reco_ids
            .iter()
            .filter_map(|id| tables.one_reco(id).ok())
            .filter(|r| !r.is_deleted())
            .map(Reco::redacted)
            .collect())
    }

    /// Whether a live reco already holds this content checksum.
    pub async fn checksum_exists(&self, checksum: &str) -> RecoResult<bool> {
        self.master_key().await?;
        Ok(self
            .store
            .read()
            .await
            .reco_by_checksum(checksum.trim())
            .is_some())
    }

    pub async fn list_tags(&self) -> RecoResult<Vec<Tag>> {
        self.master_key().await?;
        Ok(self.store.read().await.all_tags())
    }

    pub async fn list_boxes(&self) -> RecoResult<Vec<RecoBox>> {
        self.master_key().await?;
        Ok(self.store.read().await.all_boxes())
    }
}

fn check_id(id: &str) -> RecoResult<()> {
    if id == FIRST_RECO_ID {
        return Err(RecoError::InvalidInput(
            "the bootstrap record is not a reco".into(),
        ));
    }
    if !is_reco_id(id) {
        return Err(RecoError::InvalidInput(format!("malformed reco id {id:?}")));
    }
    Ok(())
}

fn fill_checksum(reco: &mut Reco, blob: &[u8]) -> RecoResult<()> {
    let actual = sha256_hex(blob);
    let given = reco.checksum.trim();
    if !given.is_empty() && !given.eq_ignore_ascii_case(&actual) {
        return Err(RecoError::InvalidInput(format!(
            "checksum mismatch: given {given}, content has {actual}"
        )));
    }
    reco.checksum = actual;
    reco.file_size = blob.len() as u64;
    Ok(())
}
