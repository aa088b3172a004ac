//! Box membership maintenance.
//!
//! A reco is in at most one box. Whenever `reco.box_id` is `Some(b)`, box `b`
//! lists the reco and no other box does.

use reco_core::model::{now, RecoBox};
use reco_core::{RecoError, RecoResult};
use tracing::debug;

use crate::store::Tables;

/// Destination of [`Tables::change_box`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxTarget {
    /// An existing box.
    Id(String),
    /// A box by title, created if no box has that title yet.
    Title(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxChange {
    /// The reco was already in the target box.
    NoChange,
    Moved { from: Option<String>, to: String },
}

impl Tables {
    /// Move a reco into `target`, leaving its previous box.
    pub fn change_box(&mut self, reco_id: &str, target: BoxTarget) -> RecoResult<BoxChange> {
        let current = self.member_reco(reco_id)?.box_id.clone();

        let to = match target {
            BoxTarget::Id(id) => self.box_by_id(&id)?.id.clone(),
            BoxTarget::Title(title) => {
                let title = title.trim();
                match self.box_by_title(title) {
                    Ok(b) => b.id.clone(),
                    Err(_) => {
                        let b = RecoBox::new(title)?;
                        let id = b.id.clone();
                        debug!(box_id = %id, title, "created box");
                        self.save_box(b)?;
                        id
                    }
                }
            }
        };

        if current.as_deref() == Some(to.as_str()) {
            return Ok(BoxChange::NoChange);
        }

        if let Some(old) = &current {
            self.detach(reco_id, old)?;
        }
        let stamp = now();
        let b = self.box_mut(&to)?;
        b.add(reco_id);
        b.updated_at = stamp.clone();

        let reco = self.reco_mut(reco_id)?;
        reco.box_id = Some(to.clone());
        reco.updated_at = stamp;

        Ok(BoxChange::Moved { from: current, to })
    }

    /// Take a reco out of its box. Returns the box it left, if any.
    pub fn leave_box(&mut self, reco_id: &str) -> RecoResult<Option<String>> {
        let Some(old) = self.member_reco(reco_id)?.box_id.clone() else {
            return Ok(None);
        };
        self.detach(reco_id, &old)?;
        let reco = self.reco_mut(reco_id)?;
        reco.box_id = None;
        reco.updated_at = now();
        Ok(Some(old))
    }

    pub fn rename_box(&mut self, box_id: &str, title: &str) -> RecoResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(RecoError::InvalidInput("box title is empty".into()));
        }
        let mut b = self.box_by_id(box_id)?.clone();
        if b.title == title {
            return Ok(());
        }
        b.title = title.to_string();
        b.updated_at = now();
        self.update_box(b)
    }

    /// Reorder a box's members. `order` must list exactly the current members.
    pub fn sort_box(&mut self, box_id: &str, order: &[String]) -> RecoResult<()> {
        let b = self.box_mut(box_id)?;
        let mut want: Vec<&String> = order.iter().collect();
        let mut have: Vec<&String> = b.reco_ids.iter().collect();
        want.sort();
        have.sort();
        if want != have {
            return Err(RecoError::InvalidInput(
                "new order must be a permutation of the box's recos".into(),
            ));
        }
        b.reco_ids = order.to_vec();
        b.updated_at = now();
        Ok(())
    }

    fn member_reco(&self, reco_id: &str) -> RecoResult<&reco_core::Reco> {
        let reco = self.one_reco(reco_id)?;
        if reco.is_first() {
            return Err(RecoError::InvalidInput(
                "the bootstrap record cannot be boxed".into(),
            ));
        }
        Ok(reco)
    }

    fn detach(&mut self, reco_id: &str, box_id: &str) -> RecoResult<()> {
        let b = self.box_mut(box_id).map_err(|_| {
            RecoError::DataIntegrity(format!("reco {reco_id} is in missing box {box_id}"))
        })?;
        b.remove(reco_id);
        b.updated_at = now();
        Ok(())
    }
}
