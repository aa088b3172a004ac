use reco_core::model::{Reco, RecoType};

use crate::store::Tables;

/// Sort key for [`RecoQuery`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderBy {
    #[default]
    UpdatedAt,
    CreatedAt,
    AccessedAt,
    AccessCount,
    FileName,
}

/// Filter + ordering over recos. The bootstrap record never matches.
///
/// By default only live recos are returned, oldest update first.
#[derive(Debug, Clone, Default)]
pub struct RecoQuery {
    pub include_deleted: bool,
    pub only_deleted: bool,
    pub reco_type: Option<RecoType>,
    pub tag: Option<String>,
    pub box_id: Option<String>,
    pub order_by: OrderBy,
    pub descending: bool,
    pub limit: Option<usize>,
}

impl RecoQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deleted(mut self) -> Self {
        self.only_deleted = true;
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn of_type(mut self, t: RecoType) -> Self {
        self.reco_type = Some(t);
        self
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn in_box(mut self, box_id: impl Into<String>) -> Self {
        self.box_id = Some(box_id.into());
        self
    }

    pub fn order_by(mut self, key: OrderBy) -> Self {
        self.order_by = key;
        self
    }

    pub fn desc(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn matches(&self, reco: &Reco) -> bool {
        if reco.is_first() {
            return false;
        }
        if self.only_deleted {
            if !reco.is_deleted() {
                return false;
            }
        } else if !self.include_deleted && reco.is_deleted() {
            return false;
        }
        if self.reco_type.is_some_and(|t| t != reco.reco_type) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !reco.tags.contains(tag) {
                return false;
            }
        }
        if let Some(box_id) = &self.box_id {
            if reco.box_id.as_ref() != Some(box_id) {
                return false;
            }
        }
        true
    }
}

impl Tables {
    pub fn select(&self, query: &RecoQuery) -> Vec<Reco> {
        let mut out: Vec<Reco> = self
            .recos
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        match query.order_by {
            OrderBy::UpdatedAt => out.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
            OrderBy::CreatedAt => out.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            OrderBy::AccessedAt => out.sort_by(|a, b| a.accessed_at.cmp(&b.accessed_at)),
            OrderBy::AccessCount => out.sort_by_key(|r| r.access_count),
            OrderBy::FileName => out.sort_by(|a, b| a.file_name.cmp(&b.file_name)),
        }
        if query.descending {
            out.reverse();
        }
        if let Some(n) = query.limit {
            out.truncate(n);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> (Tables, Vec<Reco>) {
        let mut t = Tables::default();
        t.save_reco(Reco::first("wrapped".into())).unwrap();

        let mut recos = Vec::new();
        for (i, name) in ["c.txt", "a.txt", "b.txt"].iter().enumerate() {
            let mut r = Reco::new_file(name).unwrap();
            r.updated_at = format!("2024-01-0{}T00:00:00.000Z", i + 1);
            r.access_count = (3 - i) as u64;
            r.set_tags(if i == 0 { vec!["x"] } else { vec!["y"] });
            t.save_reco(r.clone()).unwrap();
            recos.push(r);
        }
        let mut gone = Reco::new_note("deleted", vec![]).unwrap();
        gone.deleted_at = "2024-02-01T00:00:00.000Z".into();
        t.save_reco(gone.clone()).unwrap();
        recos.push(gone);
        (t, recos)
    }

    fn names(recos: &[Reco]) -> Vec<&str> {
        recos.iter().map(|r| r.file_name.as_str()).collect()
    }

    #[test]
    fn default_query_excludes_deleted_and_bootstrap() {
        let (t, _) = populated();
        let out = t.select(&RecoQuery::new());
        assert_eq!(names(&out), vec!["c.txt", "a.txt", "b.txt"]);
        assert!(out.iter().all(|r| !r.is_first()));
    }

    #[test]
    fn deleted_filters() {
        let (t, recos) = populated();
        let out = t.select(&RecoQuery::new().deleted());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, recos[3].id);
        assert_eq!(t.select(&RecoQuery::new().with_deleted()).len(), 4);
    }

    #[test]
    fn ordering_and_limit() {
        let (t, _) = populated();
        let out = t.select(&RecoQuery::new().order_by(OrderBy::FileName));
        assert_eq!(names(&out), vec!["a.txt", "b.txt", "c.txt"]);

        let out = t.select(&RecoQuery::new().order_by(OrderBy::AccessCount).desc().limit(1));
        assert_eq!(names(&out), vec!["c.txt"]);
    }

    #[test]
    fn tag_and_type_filters() {
        let (t, _) = populated();
        assert_eq!(names(&t.select(&RecoQuery::new().tagged("y"))), vec!["a.txt", "b.txt"]);
        assert!(t.select(&RecoQuery::new().of_type(RecoType::Other)).is_empty());
        assert_eq!(
            t.select(&RecoQuery::new().with_deleted().of_type(RecoType::Other)).len(),
            1
        );
    }
}
