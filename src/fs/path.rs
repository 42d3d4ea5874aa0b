use crate::{
    disk::BlockDevice,
    fs::{
        error::{FileSystemError, Result},
        inode_table::Inode,
        FileSystem,
    },
};

pub const PATH_SEPARATOR: char = '/';

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split(PATH_SEPARATOR).filter(|c| !c.is_empty())
}

impl<D: BlockDevice> FileSystem<D> {
    /// 从根目录出发逐级解析路径，只读磁盘上的目录块。
    /// 空路径和 "/" 都是根目录。
    pub fn find_subdirectories(&self, path: &str) -> Result<(Inode, u32)> {
        let (mut current, mut current_num) = self.root()?;
        for component in components(path) {
            (current, current_num) = self
                .lookup(component, &current)?
                .ok_or_else(|| FileSystemError::NotFound(format!("{} (in {})", component, path)))?;
        }
        Ok((current, current_num))
    }

    /// 把路径拆成父目录和最后一个分量，父目录必须存在
    pub fn resolve_parent<'p>(&self, path: &'p str) -> Result<(Inode, u32, &'p str)> {
        let trimmed = path.trim_end_matches(PATH_SEPARATOR);
        let (dir_path, name) = match trimmed.rfind(PATH_SEPARATOR) {
            Some(pos) => (&trimmed[..pos], &trimmed[pos + 1..]),
            None => ("", trimmed),
        };
        if name.is_empty() {
            return Err(FileSystemError::InvalidOperand(format!(
                "path '{}' has no final component",
                path
            )));
        }
        let (parent, parent_num) = self.find_subdirectories(dir_path)?;
        if !parent.is_directory {
            return Err(FileSystemError::InvalidOperand(format!(
                "'{}' is not a directory",
                dir_path
            )));
        }
        Ok((parent, parent_num, name))
    }
}

#[cfg(test)]
mod tests {
    use crate::fs::{config::ROOT_INODE_ID, error::ErrorKind, FileSystem, OpenMode};

    #[test]
    fn root_paths() {
        let fs = FileSystem::initialize_filesystem().unwrap();
        assert_eq!(fs.find_subdirectories("").unwrap().1, ROOT_INODE_ID);
        assert_eq!(fs.find_subdirectories("/").unwrap().1, ROOT_INODE_ID);
        assert_eq!(fs.find_subdirectories("//.").unwrap().1, ROOT_INODE_ID);
    }

    #[test]
    fn nested_resolution_and_dot_dot() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, _) = fs.root().unwrap();
        let (a, a_num) = fs.make_directory("a", &root).unwrap();
        let (b, b_num) = fs.make_directory("b", &a).unwrap();
        let (_, f_num) = fs.open(OpenMode::Create, "f", &b).unwrap();

        assert_eq!(fs.find_subdirectories("/a/b").unwrap().1, b_num);
        assert_eq!(fs.find_subdirectories("a/b/").unwrap().1, b_num);
        assert_eq!(fs.find_subdirectories("/a/b/f").unwrap().1, f_num);
        assert_eq!(fs.find_subdirectories("/a/b/..").unwrap().1, a_num);
        assert_eq!(fs.find_subdirectories("/a/./b/../..").unwrap().1, ROOT_INODE_ID);
    }

    #[test]
    fn missing_component_is_recoverable() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, _) = fs.root().unwrap();
        fs.make_directory("a", &root).unwrap();
        let err = fs.find_subdirectories("/a/missing/x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        // 实例仍然可用
        assert!(fs.find_subdirectories("/a").is_ok());
    }

    #[test]
    fn file_used_as_directory() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, _) = fs.root().unwrap();
        fs.open(OpenMode::Create, "plain", &root).unwrap();
        let err = fs.find_subdirectories("/plain/x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperand);
    }

    #[test]
    fn resolve_parent_splits_path() {
        let mut fs = FileSystem::initialize_filesystem().unwrap();
        let (root, root_num) = fs.root().unwrap();
        let (_, d_num) = fs.make_directory("d", &root).unwrap();

        let (_, parent_num, name) = fs.resolve_parent("/d/new.txt").unwrap();
        assert_eq!((parent_num, name), (d_num, "new.txt"));
        let (_, parent_num, name) = fs.resolve_parent("top").unwrap();
        assert_eq!((parent_num, name), (root_num, "top"));
        assert!(fs.resolve_parent("/").is_err());
        assert_eq!(
            fs.resolve_parent("/nope/x").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
