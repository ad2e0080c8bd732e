//! Cached index of the media bucket listing
//!
//! Built once per run from a single prefix listing and shared by every
//! record's file lookup. The pipeline stores each upload at
//! `<prefix><track id>/<filename>`, with derived files (converted formats)
//! beside it in the same track directory.

use crate::store::StoredObject;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Track directory in the bucket with no matching metadata record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanDirectory {
    /// Track id taken from the directory name
    pub track_id: String,
    /// Every key stored under the directory
    pub keys: Vec<String>,
}

/// Lookup structure over one media listing
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    prefix: String,
    objects: Vec<StoredObject>,
    by_key: HashMap<String, usize>,
    by_basename: HashMap<String, Vec<usize>>,
    known_tracks: HashSet<String>,
}

impl FileIndex {
    /// Index a listing taken under `prefix`
    ///
    /// Directory markers (keys ending in `/`) are dropped.
    pub fn new(prefix: impl Into<String>, objects: Vec<StoredObject>) -> Self {
        let objects: Vec<StoredObject> = objects
            .into_iter()
            .filter(|o| !o.key.ends_with('/'))
            .collect();

        let mut by_key = HashMap::with_capacity(objects.len());
        let mut by_basename: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, object) in objects.iter().enumerate() {
            by_key.insert(object.key.clone(), idx);
            by_basename
                .entry(object.basename().to_string())
                .or_default()
                .push(idx);
        }

        Self {
            prefix: prefix.into(),
            objects,
            by_key,
            by_basename,
            known_tracks: HashSet::new(),
        }
    }

    /// Track ids that own their directory; the basename fallback never
    /// matches a file inside another known track's directory
    pub fn with_known_tracks<I, S>(mut self, track_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_tracks = track_ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Locate the stored file for a track
    ///
    /// Prefers the canonical `<prefix><id>/<filename>` key, then any object
    /// with the same basename outside other known tracks' directories.
    pub fn locate(&self, track_id: &str, filename: &str) -> Option<&StoredObject> {
        let canonical = format!("{}{}/{}", self.prefix, track_id, filename);
        if let Some(&idx) = self.by_key.get(&canonical) {
            return Some(&self.objects[idx]);
        }

        self.by_basename
            .get(filename)?
            .iter()
            .map(|&idx| &self.objects[idx])
            .find(|object| match self.track_directory(&object.key) {
                Some(dir) => dir == track_id || !self.known_tracks.contains(dir),
                None => true,
            })
    }

    /// Track directories that no record claims
    ///
    /// A directory is orphaned when its name is not a known track id and
    /// none of its files is the located file of any record.
    pub fn orphans(&self, track_ids: &HashSet<&str>, claimed_keys: &HashSet<String>) -> Vec<OrphanDirectory> {
        let mut directories: BTreeMap<&str, Vec<&StoredObject>> = BTreeMap::new();
        for object in &self.objects {
            if let Some(dir) = self.track_directory(&object.key) {
                directories.entry(dir).or_default().push(object);
            }
        }

        directories
            .into_iter()
            .filter(|(dir, objects)| {
                !track_ids.contains(dir) && !objects.iter().any(|o| claimed_keys.contains(&o.key))
            })
            .map(|(dir, objects)| OrphanDirectory {
                track_id: dir.to_string(),
                keys: objects.iter().map(|o| o.key.clone()).collect(),
            })
            .collect()
    }

    /// First path segment below the prefix, when the key has one
    fn track_directory<'a>(&self, key: &'a str) -> Option<&'a str> {
        let rest = key.strip_prefix(self.prefix.as_str())?;
        let (dir, file) = rest.split_once('/')?;
        if dir.is_empty() || file.is_empty() {
            return None;
        }
        Some(dir)
    }
}
