use std::io;
use std::path::{Component, Path, PathBuf};

pub trait PathExt: AsRef<Path> {
    /// Appends `path` to `self`, treating `path` as relative even when it is
    /// rooted: root and prefix components of `path` are dropped.
    fn join_relative<P: AsRef<Path>>(&self, path: P) -> PathBuf;

    /// Folds `.` and `..` components without touching the file system. `..`
    /// never climbs above the root of an absolute path.
    fn fold_dots(&self) -> PathBuf;

    /// Makes `self` absolute against the current directory, then normalizes.
    fn expand(&self) -> io::Result<PathBuf>;
}

impl PathExt for Path {
    fn join_relative<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let mut joined = self.to_path_buf();
        path.as_ref()
            .components()
            .filter(|c| matches!(c, Component::Normal(_) | Component::ParentDir))
            .for_each(|c| joined.push(c));

        joined
    }

    fn fold_dots(&self) -> PathBuf {
        let mut normal = PathBuf::new();
        for component in self.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => match normal.components().next_back() {
                    Some(Component::Normal(_)) => { normal.pop(); }
                    Some(Component::RootDir | Component::Prefix(_)) => {}
                    _ => normal.push(component),
                },
                _ => normal.push(component),
            }
        }

        normal
    }

    fn expand(&self) -> io::Result<PathBuf> {
        let absolute = match self.is_absolute() {
            true => self.to_path_buf(),
            false => std::env::current_dir()?.join(self),
        };

        Ok(absolute.fold_dots())
    }
}
