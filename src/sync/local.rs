//! Local directory scanning. Only image files count; the comparison set
//! holds bare filenames because the service has no notion of local subfolders.

use std::collections::HashSet;
use std::io;
use std::path::Path;

const IMAGE_EXTENSIONS: [&str; 10] = [
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "heic", "heif",
];

/// Collects the names of all image files under `root`, recursively. A
/// missing root yields an empty set.
pub fn scan_local_filenames(root: &Path) -> io::Result<HashSet<String>> {
    let mut names = HashSet::new();
    if !root.is_dir() {
        return Ok(names);
    }
    walk(root, &mut names)?;
    Ok(names)
}

fn walk(dir: &Path, names: &mut HashSet<String>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, names)?;
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // Dotfiles are sidecar junk, not photos.
        if name.starts_with('.') {
            continue;
        }
        if is_image_name(name) {
            names.insert(name.to_string());
        }
    }
    Ok(())
}

fn is_image_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}
