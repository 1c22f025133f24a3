use sha2::{Digest, Sha256};

use crate::probe::Probe;
use crate::report::model::{ArtifactHash, ArtifactInfo};

/// Fingerprint one inspected artifact.
///
/// The identity depends only on file bytes. Filesystem metadata
/// (timestamps, permissions) is ignored so identical trees produce
/// identical reports. Absent or unreadable artifacts are recorded as
/// not present.
pub fn fingerprint(probe: &Probe, rel: &str) -> ArtifactInfo {
    match probe.read_bytes(rel) {
        Ok(bytes) => {
            let digest = Sha256::digest(&bytes);
            ArtifactInfo {
                path: rel.to_string(),
                present: true,
                size_bytes: Some(bytes.len() as u64),
                hash: Some(ArtifactHash {
                    algorithm: "sha256".to_string(),
                    value: hex::encode(digest),
                }),
            }
        }
        Err(_) => ArtifactInfo {
            path: rel.to_string(),
            present: false,
            size_bytes: None,
            hash: None,
        },
    }
}

/// Fingerprint every path in order.
pub fn fingerprint_all(probe: &Probe, paths: &[String]) -> Vec<ArtifactInfo> {
    paths.iter().map(|p| fingerprint(probe, p)).collect()
}
