//! Record types shared by the metadata store, the engine, and transports.
//!
//! A [`Reco`] is either a file (content lives encrypted in object storage
//! under [`Reco::blob_name`]) or a note (message + links, no blob). The
//! reserved id [`FIRST_RECO_ID`] holds the account's wrapped master key and
//! is never treated as a normal record.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{RecoError, RecoResult};
use crate::mime;

/// Id of the bootstrap record that marks account existence.
pub const FIRST_RECO_ID: &str = "1";

/// Object name suffix: `object name = reco id + BLOB_EXT`.
pub const BLOB_EXT: &str = ".reco";

/// Thumbnail cache file suffix.
pub const THUMB_EXT: &str = ".small";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoType {
    /// A note: message and links only.
    #[default]
    Other,
    File,
    /// The bootstrap record.
    First,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reco {
    pub id: String,
    #[serde(rename = "type")]
    pub reco_type: RecoType,
    /// Id of the box this reco belongs to, if any.
    #[serde(rename = "box")]
    pub box_id: Option<String>,
    pub message: String,
    pub links: Vec<String>,
    /// Tag names, with set semantics.
    pub tags: Vec<String>,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    /// hex(sha256) of the plaintext content
    pub checksum: String,
    pub access_count: u64,
    pub accessed_at: String,
    pub created_at: String,
    pub updated_at: String,
    /// Soft-delete marker; empty means live.
    pub deleted_at: String,
}

impl Reco {
    /// A new file reco with a fresh id. The file name must not be blank.
    pub fn new_file(file_name: &str) -> RecoResult<Self> {
        let mut reco = Reco {
            id: new_id(),
            reco_type: RecoType::File,
            ..Default::default()
        };
        reco.set_file_name(file_name)?;
        reco.stamp_created();
        Ok(reco)
    }

    /// A new note reco with a fresh id.
    pub fn new_note(message: &str, links: Vec<String>) -> RecoResult<Self> {
        let message = message.trim();
        let links: Vec<String> = links
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if message.is_empty() && links.is_empty() {
            return Err(RecoError::InvalidInput(
                "a note needs a message or at least one link".into(),
            ));
        }
        let mut reco = Reco {
            id: new_id(),
            reco_type: RecoType::Other,
            message: message.to_string(),
            links,
            ..Default::default()
        };
        reco.stamp_created();
        Ok(reco)
    }

    /// The bootstrap record holding the encoded, wrapped master key.
    pub fn first(wrapped_master_key: String) -> Self {
        let mut reco = Reco {
            id: FIRST_RECO_ID.to_string(),
            reco_type: RecoType::First,
            message: wrapped_master_key,
            ..Default::default()
        };
        reco.stamp_created();
        reco
    }

    pub fn is_first(&self) -> bool {
        self.id == FIRST_RECO_ID
    }

    pub fn is_file(&self) -> bool {
        self.reco_type == RecoType::File
    }

    pub fn is_deleted(&self) -> bool {
        !self.deleted_at.is_empty()
    }

    /// Name of this reco's encrypted object in cloud storage.
    pub fn blob_name(&self) -> String {
        blob_name(&self.id)
    }

    /// Set the file name (trimmed) and re-derive the MIME type from it.
    pub fn set_file_name(&mut self, file_name: &str) -> RecoResult<()> {
        let name = file_name.trim();
        if name.is_empty() {
            return Err(RecoError::InvalidInput("file name is empty".into()));
        }
        self.file_name = name.to_string();
        self.file_type = mime::guess_file_type(name).to_string();
        Ok(())
    }

    /// Replace the tag list, normalized to a trimmed, duplicate-free set.
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
    }

    /// True when the user-editable content of both recos is the same.
    /// Tag order is ignored.
    pub fn same_content(&self, other: &Reco) -> bool {
        let (added, removed) = diff_tags(&self.tags, &other.tags);
        self.file_name == other.file_name
            && self.message == other.message
            && self.links == other.links
            && self.checksum == other.checksum
            && self.box_id == other.box_id
            && added.is_empty()
            && removed.is_empty()
    }

    /// Copy for listings: sensitive fields stripped.
    pub fn redacted(&self) -> Reco {
        Reco {
            checksum: String::new(),
            ..self.clone()
        }
    }

    pub fn touch_updated(&mut self) {
        self.updated_at = now();
    }

    fn stamp_created(&mut self) {
        let now = now();
        self.created_at = now.clone();
        self.updated_at = now.clone();
        self.accessed_at = now;
    }
}

/// A named label; `reco_ids` has set semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    pub name: String,
    pub reco_ids: Vec<String>,
}

impl Tag {
    pub fn new(name: &str, reco_id: &str) -> Self {
        Tag {
            name: name.to_string(),
            reco_ids: vec![reco_id.to_string()],
        }
    }

    /// Idempotent: returns false when the id was already present.
    pub fn add(&mut self, reco_id: &str) -> bool {
        add_unique(&mut self.reco_ids, reco_id)
    }

    /// Idempotent: returns false when the id was absent.
    pub fn remove(&mut self, reco_id: &str) -> bool {
        remove_item(&mut self.reco_ids, reco_id)
    }

    pub fn contains(&self, reco_id: &str) -> bool {
        self.reco_ids.iter().any(|id| id == reco_id)
    }
}

/// A named container with exclusive, user-ordered membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoBox {
    pub id: String,
    pub title: String,
    pub reco_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl RecoBox {
    pub fn new(title: &str) -> RecoResult<Self> {
        let title = title.trim();
        if title.is_empty() {
            return Err(RecoError::InvalidInput("box title is empty".into()));
        }
        let now = now();
        Ok(RecoBox {
            id: new_id(),
            title: title.to_string(),
            reco_ids: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn add(&mut self, reco_id: &str) -> bool {
        add_unique(&mut self.reco_ids, reco_id)
    }

    pub fn remove(&mut self, reco_id: &str) -> bool {
        remove_item(&mut self.reco_ids, reco_id)
    }

    pub fn contains(&self, reco_id: &str) -> bool {
        self.reco_ids.iter().any(|id| id == reco_id)
    }
}

/// Object name for a reco id.
pub fn blob_name(reco_id: &str) -> String {
    format!("{reco_id}{BLOB_EXT}")
}

/// New record id: unix seconds scaled by 1e8 plus a random suffix, in base36.
///
/// Ids generated in different seconds sort by creation time; the result is
/// always longer than [`FIRST_RECO_ID`].
pub fn new_id() -> String {
    const SPREAD: u64 = 100_000_000;
    let secs = chrono::Utc::now().timestamp().max(0) as u64;
    let n = rand::thread_rng().gen_range(0..SPREAD);
    to_base36(secs * SPREAD + n)
}

/// Whether `id` has the shape [`new_id`] produces: lowercase base36, longer
/// than [`FIRST_RECO_ID`]. Ids end up in file and object names.
pub fn is_reco_id(id: &str) -> bool {
    id.len() > FIRST_RECO_ID.len()
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".into();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// RFC 3339 UTC timestamp with millisecond precision. Lexicographic order
/// matches chronological order.
pub fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Trimmed, non-empty, first-occurrence-ordered set of tag names.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() {
            add_unique(&mut out, tag);
        }
    }
    out
}

/// Set difference between an old and a new tag list:
/// `(in new but not old, in old but not new)`.
pub fn diff_tags(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let to_add = new
        .iter()
        .filter(|t| !old.contains(t))
        .cloned()
        .collect::<Vec<_>>();
    let to_remove = old
        .iter()
        .filter(|t| !new.contains(t))
        .cloned()
        .collect::<Vec<_>>();
    (normalize_tags(to_add), normalize_tags(to_remove))
}

fn add_unique(list: &mut Vec<String>, item: &str) -> bool {
    if list.iter().any(|x| x == item) {
        return false;
    }
    list.push(item.to_string());
    true
}

fn remove_item(list: &mut Vec<String>, item: &str) -> bool {
    let before = list.len();
    list.retain(|x| x != item);
    list.len() != before
}
