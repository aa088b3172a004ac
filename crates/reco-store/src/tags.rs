//! Tag index maintenance.
//!
//! Each [`Tag`] lists the recos carrying it. Updates only touch the tags in
//! the delta between a reco's old and new tag lists.

use reco_core::model::{diff_tags, Tag};
use reco_core::{RecoError, RecoResult};

use crate::store::Tables;

impl Tables {
    /// Reference `reco_id` from each tag, creating missing tags.
    pub fn add_tags(&mut self, reco_id: &str, tags: &[String]) {
        for name in tags {
            match self.tags.get_mut(name) {
                Some(tag) => {
                    tag.add(reco_id);
                }
                None => {
                    self.tags.insert(name.clone(), Tag::new(name, reco_id));
                }
            }
        }
    }

    /// Drop `reco_id` from each tag. A tag that doesn't exist means the index
    /// is out of sync with the reco and fails with `DataIntegrity`.
    pub fn remove_tags(&mut self, reco_id: &str, tags: &[String]) -> RecoResult<()> {
        for name in tags {
            let tag = self.tags.get_mut(name).ok_or_else(|| {
                RecoError::DataIntegrity(format!(
                    "reco {reco_id} references missing tag {name:?}"
                ))
            })?;
            tag.remove(reco_id);
        }
        Ok(())
    }

    /// Apply the difference between `old` and `new` tag lists for a reco.
    pub fn apply_tag_delta(&mut self, reco_id: &str, old: &[String], new: &[String]) -> RecoResult<()> {
        let (to_add, to_remove) = diff_tags(old, new);
        self.add_tags(reco_id, &to_add);
        self.remove_tags(reco_id, &to_remove)
    }

    /// Delete tags no reco references any more. Returns how many went.
    pub fn prune_empty_tags(&mut self) -> usize {
        let before = self.tags.len();
        self.tags.retain(|_, tag| !tag.reco_ids.is_empty());
        before - self.tags.len()
    }
}
