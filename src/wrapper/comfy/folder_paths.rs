//! 文件夹路径
//!
//! 对应 ComfyUI/folder_paths.py, 仅保留本节点包读取的目录。
//! 文件名列表带全局缓存, 目录 mtime 变化时失效重扫。

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
    sync::{OnceLock, RwLock},
};

use lazy_static::lazy_static;
use log::{error, warn};

use crate::{
    core::utils::directory::{filter_files_extensions, get_mtime, recursive_search},
    error::Error,
};

// 支持的模型文件扩展名
lazy_static! {
    static ref SUPPORTED_PT_EXTENSIONS: HashSet<&'static str> = {
        let mut set = HashSet::new();
        set.insert(".ckpt");
        set.insert(".pt");
        set.insert(".pt2");
        set.insert(".bin");
        set.insert(".pth");
        set.insert(".safetensors");
        set.insert(".pkl");
        set.insert(".sft");
        set
    };
}

// 全局文件名列表缓存, 按文件夹名称索引
static FILE_LIST_CACHE: OnceLock<RwLock<BTreeMap<String, CachedFileList>>> = OnceLock::new();

fn cache() -> &'static RwLock<BTreeMap<String, CachedFileList>> {
    FILE_LIST_CACHE.get_or_init(|| RwLock::new(BTreeMap::new()))
}

/// 一次目录扫描的结果
#[derive(Debug, Clone)]
struct CachedFileList {
    /// 相对于模型目录的文件名列表
    files: Vec<String>,
    /// 扫描时记录的各目录修改时间
    dir_mtimes: BTreeMap<String, f64>,
}

impl CachedFileList {
    /// 扫描过的目录 mtime 是否已变化
    fn is_stale(&self) -> bool {
        for (dir, cached_mtime) in &self.dir_mtimes {
            let current_mtime = match get_mtime(dir) {
                Ok(v) => v,
                Err(e) => {
                    error!("error: {e}");
                    return true;
                }
            };
            if (current_mtime - cached_mtime).abs() > f64::EPSILON {
                return true;
            }
        }
        false
    }
}

/// 文件夹路径配置结构体
#[allow(clippy::type_complexity)]
#[derive(Debug)]
pub struct FolderPaths {
    /// 基础路径
    base_path: PathBuf,
    /// folders, extensions
    /// 文件夹名称和路径映射
    folder_names_and_paths: BTreeMap<&'static str, (Vec<PathBuf>, HashSet<&'static str>)>,
}

impl Default for FolderPaths {
    /// 创建一个默认的 FolderPaths 实例
    ///
    /// ComfyUI 扩展进程的工作目录即宿主根目录
    fn default() -> Self {
        let base_path = std::env::current_dir().expect("Failed to get current directory");
        Self::from_base_directory(&base_path)
    }
}

impl FolderPaths {
    /// 以指定目录为宿主根目录创建实例
    pub fn from_base_directory(base_directory: &Path) -> Self {
        let base_path = base_directory.to_path_buf();
        let models_dir = base_path.join("models");
        let folder_names_and_paths = Self::init_folder_names_and_paths(&models_dir);

        Self {
            base_path,
            folder_names_and_paths,
        }
    }

    fn init_folder_names_and_paths(
        models_dir: &Path,
    ) -> BTreeMap<&'static str, (Vec<PathBuf>, HashSet<&'static str>)> {
        let mut folder_names_and_paths = BTreeMap::new();

        // 文本编码器, "clip" 为旧名称
        folder_names_and_paths.insert(
            "text_encoders",
            (
                vec![models_dir.join("text_encoders"), models_dir.join("clip")],
                SUPPORTED_PT_EXTENSIONS.clone(),
            ),
        );

        folder_names_and_paths.insert(
            "embeddings",
            (
                vec![models_dir.join("embeddings")],
                SUPPORTED_PT_EXTENSIONS.clone(),
            ),
        );

        folder_names_and_paths
    }

    /// 获取基础路径
    pub fn base_path(&self) -> PathBuf {
        self.base_path.clone()
    }

    /// 获取文件夹路径映射
    pub fn folder_names_and_paths(
        &self,
    ) -> &BTreeMap<&'static str, (Vec<PathBuf>, HashSet<&'static str>)> {
        &self.folder_names_and_paths
    }
}

impl FolderPaths {
    /// 旧文件夹名称映射
    pub fn map_legacy(folder_name: &str) -> &str {
        match folder_name {
            "unet" => "diffusion_models",
            "clip" => "text_encoders",
            _ => folder_name,
        }
    }

    /// 获取文件夹路径列表
    pub fn get_folder_paths(&self, folder_name: &str) -> Result<Vec<PathBuf>, Error> {
        let folder_name = Self::map_legacy(folder_name);

        let (file_paths, _) = self
            .folder_names_and_paths
            .get(folder_name)
            .ok_or_else(|| Error::InvalidDirectory(format!("folder {folder_name} not found")))?;

        Ok(file_paths.clone())
    }

    /// 获取完整文件路径
    pub fn get_full_path(
        &self,
        folder_name: &str,
        filename: &str,
    ) -> Result<Option<PathBuf>, Error> {
        let folder_name = Self::map_legacy(folder_name);

        // 获取基础路径列表
        let (file_paths, _) = self
            .folder_names_and_paths
            .get(folder_name)
            .ok_or_else(|| Error::InvalidDirectory(format!("folder {folder_name} not found")))?;

        // 规范化文件名路径
        let normalized_filename = Path::new("/")
            .join(filename)
            .strip_prefix("/")
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|_| PathBuf::from(filename));

        // 在基础路径中查找文件
        for file_path in file_paths {
            let full_path = self.base_path.join(file_path).join(&normalized_filename);

            // 检查文件是否存在
            if let Ok(metadata) = fs::symlink_metadata(&full_path) {
                if metadata.is_file() {
                    return Ok(Some(full_path));
                } else if metadata.file_type().is_symlink() {
                    // 检查符号链接是否有效
                    if fs::metadata(&full_path).is_err() {
                        warn!(
                            "WARNING path {} exists but doesn't link anywhere, skipping.",
                            full_path.display()
                        );
                    }
                }
            }
        }

        Ok(None)
    }

    /// 获取完整文件路径, 文件不存在时报错
    pub fn get_full_path_or_raise(
        &self,
        folder_name: &str,
        filename: &str,
    ) -> Result<PathBuf, Error> {
        self.get_full_path(folder_name, filename)?
            .ok_or_else(|| Error::ModelFileNotFound(format!("{folder_name}/{filename}")))
    }

    /// 获取文件名列表
    pub fn get_filename_list(&self, folder_name: &str) -> Vec<String> {
        let folder_name = Self::map_legacy(folder_name);

        if let Some(entry) = self.cached_filename_list(folder_name) {
            return entry.files;
        }

        // 重新扫描并更新缓存
        let entry = self.scan_filename_list(folder_name);
        let files = entry.files.clone();
        match cache().write() {
            Ok(mut guard) => {
                guard.insert(folder_name.to_string(), entry);
            }
            Err(e) => error!("Failed to update file list cache: {e}"),
        }

        files
    }

    /// 从缓存中获取文件列表
    fn cached_filename_list(&self, folder_name: &str) -> Option<CachedFileList> {
        let entry = cache().read().ok()?.get(folder_name).cloned()?;

        // 检查目录修改时间是否变化
        if entry.is_stale() {
            return None;
        }

        // 检查是否有缓存之后新注册的目录
        if let Some((dir_paths, _)) = self.folder_names_and_paths.get(folder_name) {
            for dir_path in dir_paths {
                // 判断是否为目录
                if !dir_path.is_dir() {
                    continue;
                }
                // 检查目录是否发生变化
                if !entry
                    .dir_mtimes
                    .contains_key(&dir_path.to_string_lossy().to_string())
                {
                    return None;
                }
            }
        }

        Some(entry)
    }

    /// 扫描文件夹下的模型文件
    fn scan_filename_list(&self, folder_name: &str) -> CachedFileList {
        let mut output_list = HashSet::new();
        let mut dir_mtimes = BTreeMap::new();

        if let Some((dir_paths, extensions)) = self.folder_names_and_paths.get(folder_name) {
            for dir_path in dir_paths {
                let (files, dirs) =
                    recursive_search(dir_path.to_string_lossy().as_ref(), &[".git"]);
                dir_mtimes.extend(dirs);

                let extensions_vec: Vec<String> = extensions
                    .iter()
                    .map(|s| s.to_string())
                    .filter(|ext| !ext.is_empty())
                    .collect();
                let filtered = filter_files_extensions(&files, &extensions_vec);
                output_list.extend(filtered);
            }
        }

        let mut sorted_list: Vec<String> = output_list.into_iter().collect();
        sorted_list.sort_unstable();

        CachedFileList {
            files: sorted_list,
            dir_mtimes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn test_map_legacy() {
        assert_eq!(FolderPaths::map_legacy("clip"), "text_encoders");
        assert_eq!(FolderPaths::map_legacy("unet"), "diffusion_models");
        assert_eq!(FolderPaths::map_legacy("embeddings"), "embeddings");
    }

    #[test]
    #[ignore]
    fn test_folder_paths_initialization() {
        let folder_paths = FolderPaths::default();
        assert!(folder_paths.base_path().exists());
        assert!(folder_paths
            .folder_names_and_paths()
            .contains_key("text_encoders"));
    }

    /// 缓存生命周期: 扫描 -> 命中 -> 目录变化后失效重扫
    ///
    /// 全局缓存按文件夹名称索引, 涉及 text_encoders 键的断言集中在
    /// 本用例, 避免测试并发下互相覆盖
    #[test]
    fn test_filename_list_cache_lifecycle() -> anyhow::Result<()> {
        let base = std::env::temp_dir().join(format!("sd3kit_models_{}", std::process::id()));
        let encoders_dir = base.join("models").join("text_encoders");
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(&encoders_dir)?;

        let folder_paths = FolderPaths::from_base_directory(&base);

        // 首次扫描
        fs::write(encoders_dir.join("clip_l.safetensors"), b"l")?;
        let listed = folder_paths.get_filename_list("clip");
        assert_eq!(listed, vec!["clip_l.safetensors".to_string()]);

        // 命中缓存: 注入标记条目, 目录未变化时直接返回而不重扫
        {
            let mut dir_mtimes = BTreeMap::new();
            let dir_key = encoders_dir.to_string_lossy().to_string();
            dir_mtimes.insert(dir_key.clone(), get_mtime(&dir_key)?);
            let marker = CachedFileList {
                files: vec!["cached_marker".to_string()],
                dir_mtimes,
            };
            cache()
                .write()
                .unwrap()
                .insert("text_encoders".to_string(), marker);
        }
        assert_eq!(
            folder_paths.get_filename_list("clip"),
            vec!["cached_marker".to_string()]
        );

        // 新增文件改变目录 mtime, 缓存失效并重扫
        thread::sleep(Duration::from_millis(5));
        fs::write(encoders_dir.join("clip_g.safetensors"), b"g")?;
        let relisted = folder_paths.get_filename_list("clip");
        assert_eq!(
            relisted,
            vec![
                "clip_g.safetensors".to_string(),
                "clip_l.safetensors".to_string(),
            ]
        );

        fs::remove_dir_all(&base)?;
        Ok(())
    }
}
