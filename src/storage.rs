//! 本地存储封装模块
//!
//! 与浏览器 LocalStorage 相同的键值接口，宿主可以注入自己的实现。

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// 键值存储接口
pub trait TokenStore {
    /// 获取存储的字符串值
    ///
    /// # 返回
    /// - `Some(String)` 如果键存在且有值
    /// - `None` 如果键不存在或发生错误
    fn get(&self, key: &str) -> Option<String>;

    /// 设置存储值，返回操作是否成功
    fn set(&self, key: &str, value: &str) -> bool;

    /// 删除存储的键值对，返回操作是否成功
    fn delete(&self, key: &str) -> bool;
}

// =========================================================
// 内存存储
// =========================================================

/// 进程内存储，进程退出即丢失
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.items.borrow_mut().remove(key);
        true
    }
}

// =========================================================
// 文件存储
// =========================================================

/// JSON 文件存储
///
/// 整个文件是一个 `{ key: value }` 对象，每次写入都会重写文件。
/// 文件不存在或内容损坏时视为空。
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HashMap<String, String> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt storage file");
            HashMap::new()
        })
    }

    fn save(&self, items: &HashMap<String, String>) -> bool {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && fs::create_dir_all(parent).is_err() {
                return false;
            }
        }
        let Ok(raw) = serde_json::to_string_pretty(items) else {
            return false;
        };
        match fs::write(&self.path, raw) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to write storage file");
                false
            }
        }
    }
}

impl TokenStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: &str) -> bool {
        let mut items = self.load();
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn delete(&self, key: &str) -> bool {
        let mut items = self.load();
        if items.remove(key).is_none() {
            return true;
        }
        self.save(&items)
    }
}
