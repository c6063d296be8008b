use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Deserialize, Serialize)]
pub struct AssetManifest {
    pub map_to_resources: Option<bool>,
    pub objects: HashMap<String, AssetObject>,
    #[serde(rename(deserialize = "virtual", serialize = "virtual"))]
    pub is_virtual: Option<bool>
}

#[derive(Deserialize, Serialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64
}

impl AssetObject {
    /// Object path relative to the assets `objects` directory, `<hash[0:2]>/<hash>`
    pub fn object_dir(&self) -> &str {
        // first 2 chars of hash is used for directory of objects
        self.hash.get(0..2).unwrap_or(&self.hash)
    }
}
