use serde::Deserialize;

#[derive(Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionManifestEntry>
}

impl VersionManifest {
    pub fn find(&self, version_id: &str) -> Option<&VersionManifestEntry> {
        self.versions.iter().find(|v| v.id == version_id)
    }
}

#[derive(Deserialize)]
pub struct VersionManifestEntry {
    pub id: String,
    #[serde(rename(deserialize = "type"))]
    pub release_type: Option<String>,
    pub url: String,
    pub sha1: Option<String>
}
