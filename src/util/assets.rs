use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use minijinja::Environment;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Content fingerprints for everything under the static directory, taken once
/// at startup so templates can emit cache-busting URLs.
#[derive(Debug, Clone, Default)]
pub struct AssetManifest {
    fingerprints: HashMap<String, String>,
}

impl AssetManifest {
    pub fn scan(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let mut fingerprints = HashMap::new();
        let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("cannot read static directory {}: {}", dir.display(), err);
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(contents) = fs::read(&path) else {
                    continue;
                };
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                let key = relative.to_string_lossy().replace('\\', "/");
                fingerprints.insert(key, fingerprint(&contents));
            }
        }

        debug!("fingerprinted {} static assets", fingerprints.len());
        Self { fingerprints }
    }

    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        match self.fingerprints.get(path) {
            Some(hash) => format!("/static/{path}?v={hash}"),
            None => format!("/static/{path}"),
        }
    }

    pub fn register(self, env: &mut Environment<'_>) {
        env.add_function("asset", move |path: String| self.url(&path));
    }
}

fn fingerprint(contents: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(contents));
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_assets_fall_back_to_plain_path() {
        let manifest = AssetManifest::default();
        assert_eq!(manifest.url("app.css"), "/static/app.css");
    }

    #[test]
    fn fingerprint_changes_with_contents() {
        assert_ne!(fingerprint(b"body {}"), fingerprint(b"body { margin: 0 }"));
        assert_eq!(fingerprint(b"body {}").len(), 16);
    }

    #[test]
    fn known_assets_carry_their_fingerprint() {
        let mut manifest = AssetManifest::default();
        manifest.fingerprints.insert("app.css".into(), "abc123".into());
        assert_eq!(manifest.url("/app.css"), "/static/app.css?v=abc123");
    }
}
