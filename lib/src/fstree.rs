use std::sync::Arc;
use std::path::Path;
use std::{fs, fmt};

use rustc_hash::FxHashMap;

use crate::error::Result;

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// A snapshot of a directory tree, taken once with a parallel walk.
#[derive(Debug)]
pub struct FsTree {
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub file_name: String,
    pub file_type: fs::FileType,
    pub parent: Option<EntryId>,
    pub depth: usize,
}

impl FsTree {
    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::build_excluding(root, &[] as &[&str])
    }

    /// Walks `root`, skipping hidden entries and any directory whose name is
    /// in `exclude`.
    pub fn build_excluding<P, S>(root: P, exclude: &[S]) -> Result<Self>
        where P: AsRef<Path>, S: AsRef<str>
    {
        let root = root.as_ref();
        let exclude: Vec<String> = exclude.iter().map(|s| s.as_ref().to_string()).collect();
        let walker = jwalk::WalkDir::new(root)
            .follow_links(true)
            .skip_hidden(true)
            .process_read_dir(move |_, _, _, entries| {
                entries.retain(|entry| match entry {
                    Ok(e) if e.file_type.is_dir() => {
                        let name = e.file_name.to_string_lossy();
                        !exclude.iter().any(|x| *x == name)
                    }
                    _ => true,
                })
            });

        let mut tree = FsTree { entries: vec![], map: FxHashMap::default() };
        for entry in walker {
            match entry {
                Ok(entry) => { tree.insert(entry); }
                Err(e) => tracing::warn!("skipping unreadable entry: {e}"),
            }
        }

        if tree.entries.is_empty() {
            return err! {
                "file system tree discovery yielded zero files",
                "search root" => root.display(),
            }
        }

        Ok(tree)
    }

    pub fn root(&self) -> &Entry {
        &self.entries[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Regular files, in walk order.
    pub fn files(&self) -> impl Iterator<Item = &Entry> {
        self.iter().filter(|e| e.file_type.is_file())
    }

    /// The entry at `path`, relative to the root.
    pub fn get<P: AsRef<Path>>(&self, path: P) -> Option<&Entry> {
        let full_path = self.root().path.join(path.as_ref());
        self.map.get(&*full_path).map(|&id| &self[id])
    }

    fn insert(&mut self, entry: jwalk::DirEntry<((), ())>) -> EntryId {
        let entry = Entry {
            id: EntryId(self.entries.len()),
            path: Arc::from(entry.path().into_boxed_path()),
            file_type: entry.file_type,
            file_name: entry.file_name.to_string_lossy().into_owned(),
            parent: self.map.get(&*entry.parent_path).cloned(),
            depth: entry.depth,
        };

        let id = entry.id;
        self.map.insert(entry.path.clone(), id);
        self.entries.push(entry);
        id
    }
}

impl Entry {
    /// The complete extension, if any.
    pub fn file_ext(&self) -> Option<&str> {
        self.file_name.rsplit_once('.').map(|(_, right)| right)
    }

    /// Path relative to the root of the tree.
    pub fn relative_path(&self) -> &Path {
        let mut components = self.path.components();
        for _ in 0..(self.path.components().count() - self.depth) {
            components.next();
        }

        components.as_path()
    }
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
