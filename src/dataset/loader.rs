//! Flower Dataset Loader
//!
//! Scans a directory tree whose immediate subdirectories name the classes and
//! collects every image file inside them. Images are not decoded here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::{FlowerError, Result};

/// File extensions accepted as images (lowercase)
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

/// A single image sample with its label and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Class label index
    pub label: usize,
    /// Class name (the subdirectory name, e.g. "roses")
    pub class_name: String,
    /// Unique sample ID, stable for a given directory tree
    pub id: usize,
}

/// Flower dataset backed by files on disk
#[derive(Debug, Clone)]
pub struct FlowerDataset {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples, ordered by class then path
    pub samples: Vec<ImageSample>,
    /// Class names indexed by label
    pub class_names: Vec<String>,
}

impl FlowerDataset {
    /// Scan a dataset directory.
    ///
    /// Every subdirectory of the root (symlinks followed) is a class. Images
    /// are collected recursively below each class directory.
    ///
    /// The directory should be structured as:
    /// ```text
    /// images/
    /// ├── daisy/
    /// │   ├── 100080576_f52e8ee070_n.jpg
    /// │   └── ...
    /// ├── roses/
    /// │   └── ...
    /// └── ...
    /// ```
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading flower dataset from: {:?}", root_dir);

        if !root_dir.is_dir() {
            return Err(FlowerError::PathNotFound(root_dir));
        }

        let mut class_names: Vec<String> = Vec::new();
        for entry in std::fs::read_dir(&root_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| {
                    FlowerError::Dataset(format!(
                        "Class directory name is not valid UTF-8: {:?}",
                        path
                    ))
                })?;
            class_names.push(name.to_string());
        }
        class_names.sort();

        info!("Found {} classes", class_names.len());

        let mut samples = Vec::new();
        for (label, class_name) in class_names.iter().enumerate() {
            let mut paths: Vec<PathBuf> = WalkDir::new(root_dir.join(class_name))
                .min_depth(1)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_image_file(p))
                .collect();
            paths.sort();

            debug!("Class '{}' (label {}): {} images", class_name, label, paths.len());

            for path in paths {
                let id = samples.len();
                samples.push(ImageSample {
                    path,
                    label,
                    class_name: class_name.clone(),
                    id,
                });
            }
        }

        if samples.is_empty() {
            return Err(FlowerError::EmptyDataset(root_dir));
        }

        info!("Loaded {} total samples", samples.len());

        Ok(Self {
            root_dir,
            samples,
            class_names,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Get statistics about the dataset
    pub fn get_stats(&self) -> DatasetStats {
        let mut class_counts = vec![0usize; self.num_classes()];
        for sample in &self.samples {
            class_counts[sample.label] += 1;
        }

        DatasetStats {
            total_samples: self.samples.len(),
            num_classes: self.num_classes(),
            class_counts,
            class_names: self.class_names.clone(),
        }
    }
}

/// Whether a path has one of the accepted image extensions
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Count `<root>/<class>/*.jpg` files.
///
/// Only the `.jpg` extension is counted; this is the "image_count" diagnostic
/// printed before loading.
pub fn count_images<P: AsRef<Path>>(root_dir: P) -> usize {
    WalkDir::new(root_dir)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("jpg"))
        .count()
}

/// Statistics about the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub num_classes: usize,
    pub class_counts: Vec<usize>,
    pub class_names: Vec<String>,
}

impl DatasetStats {
    /// Print statistics to console
    pub fn print(&self) {
        println!("\n📊 Dataset Statistics:");
        println!("  Total samples: {}", self.total_samples);
        println!("  Number of classes: {}", self.num_classes);
        println!("\n  Samples per class:");

        for (idx, (name, count)) in self.class_names.iter().zip(&self.class_counts).enumerate() {
            let bar_len = (*count as f32 / self.total_samples.max(1) as f32 * 40.0) as usize;
            println!("    {:3}. {:20} {:5} {}", idx, name, count, "█".repeat(bar_len));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"not really an image").unwrap();
    }

    #[test]
    fn test_classes_are_sorted_and_indexed() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("tulips/a.jpg"));
        touch(&dir.path().join("daisy/b.jpg"));
        touch(&dir.path().join("roses/c.JPG"));
        touch(&dir.path().join("roses/notes.txt"));

        let dataset = FlowerDataset::new(dir.path()).unwrap();

        assert_eq!(dataset.class_names, vec!["daisy", "roses", "tulips"]);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.samples[1].class_name, "roses");
        assert_eq!(dataset.samples[2].label, 2);
        assert_eq!(dataset.get_stats().class_counts, vec![1, 1, 1]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = FlowerDataset::new(dir.path().join("nope"));
        assert!(matches!(result, Err(FlowerError::PathNotFound(_))));
    }

    #[test]
    fn test_directory_without_images() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("daisy")).unwrap();
        touch(&dir.path().join("daisy/readme.md"));

        let result = FlowerDataset::new(dir.path());
        assert!(matches!(result, Err(FlowerError::EmptyDataset(_))));
    }

    #[test]
    fn test_nested_images_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("roses/a.jpg"));
        touch(&dir.path().join("roses/batch2/b.jpg"));
        touch(&dir.path().join("roses/batch2/deeper/c.png"));

        let dataset = FlowerDataset::new(dir.path()).unwrap();

        assert_eq!(dataset.num_classes(), 1);
        assert_eq!(dataset.len(), 3);
        assert!(dataset.samples.iter().all(|s| s.label == 0));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_classes_and_images_are_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("images");
        touch(&root.join("roses/a.jpg"));
        touch(&root.join("roses/batch2/b.jpg"));

        let outside = dir.path().join("outside");
        touch(&outside.join("c.jpg"));
        touch(&outside.join("tulip_dir/t.jpg"));
        symlink(outside.join("c.jpg"), root.join("roses/c.jpg")).unwrap();
        symlink(outside.join("tulip_dir"), root.join("tulips")).unwrap();

        let dataset = FlowerDataset::new(&root).unwrap();

        assert_eq!(dataset.class_names, vec!["roses", "tulips"]);
        assert_eq!(dataset.len(), 4);
        assert_eq!(dataset.get_stats().class_counts, vec![3, 1]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_class_name_is_an_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("daisy/a.jpg"));
        let bad = dir.path().join(OsStr::from_bytes(b"ros\xffes"));
        touch(&bad.join("b.jpg"));

        let result = FlowerDataset::new(dir.path());
        assert!(matches!(result, Err(FlowerError::Dataset(_))));
    }

    #[test]
    fn test_count_images_only_counts_jpg_one_level_down() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("daisy/a.jpg"));
        touch(&dir.path().join("daisy/b.png"));
        touch(&dir.path().join("roses/c.jpg"));
        touch(&dir.path().join("stray.jpg"));

        assert_eq!(count_images(dir.path()), 2);
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("x/rose.JPEG")));
        assert!(is_image_file(Path::new("x/rose.png")));
        assert!(!is_image_file(Path::new("x/rose.txt")));
        assert!(!is_image_file(Path::new("x/rose")));
    }
}
