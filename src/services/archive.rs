use anyhow::Result;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// VlanArchive keeps a local, timestamped copy of every retrieved VLAN table
pub struct VlanArchive {
    dir: PathBuf,
}

impl VlanArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `<dir>/<name>_<YYYYmmdd_HHMMSS>.vlans` and return its path
    pub async fn save(&self, name: &str, vlans: &str) -> Result<PathBuf> {
        // Ensure archive directory exists
        tokio::fs::create_dir_all(&self.dir).await?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let safe_name = name.replace(&['/', '\\'][..], "_");
        let file_path = self.dir.join(format!("{}_{}.vlans", safe_name, timestamp));

        tokio::fs::write(&file_path, vlans).await?;
        tracing::debug!("Archived VLANs for {} to {}", name, file_path.display());
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = VlanArchive::new(dir.path().join("vlans"));

        let path = archive.save("core/sw1", "1 default active\n").await.unwrap();
        let file_name = path.file_name().unwrap().to_str().unwrap().to_string();

        assert!(file_name.starts_with("core_sw1_"));
        assert!(file_name.ends_with(".vlans"));
        // core_sw1_ + YYYYmmdd_HHMMSS + .vlans
        assert_eq!(file_name.len(), "core_sw1_".len() + 15 + ".vlans".len());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1 default active\n");
        assert_eq!(path.parent().unwrap(), archive.dir());
    }
}
