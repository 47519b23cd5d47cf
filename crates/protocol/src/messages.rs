use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// A file stored by the remote drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl UploadedFile {
    /// Returns the first parent folder, if the remote reported any.
    pub fn parent_folder_id(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// Uploads a whole file in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WholeUploadRequest {
    pub file_name: String,
    /// Base64 file content.
    pub content_to_upload: String,
}

/// Sends one chunk of a resumable upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadRequest {
    pub file_name: String,
    /// Base64 chunk content.
    pub chunk_to_upload: String,
    /// `None` on the first chunk; the remote issues the handle.
    #[serde(default)]
    pub resumable_session_id: Option<String>,
    pub start_byte: u64,
    pub total_bytes: u64,
}

/// Remote answer to a chunk upload.
///
/// `resumable_latest_byte` is the remote's count of bytes it has accepted.
/// `file` is only present once the remote assembled the final object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkUploadResponse {
    #[serde(default)]
    pub resumable_latest_byte: u64,
    #[serde(default)]
    pub resumable_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<UploadedFile>,
}

// ---------------------------------------------------------------------------
// Download
// ---------------------------------------------------------------------------

/// Requests an inclusive byte range of a stored file version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeDownloadRequest {
    pub file_version_id: String,
    pub start_byte: u64,
    pub end_byte: u64,
}

impl RangeDownloadRequest {
    /// Number of bytes the remote must return for this range.
    pub fn expected_len(&self) -> u64 {
        self.end_byte - self.start_byte + 1
    }
}

// ---------------------------------------------------------------------------
// Config relay
// ---------------------------------------------------------------------------

/// A short-lived relay payload keyed by a generated id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRecord {
    pub config_id: String,
    pub payload_json: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_response_without_file() {
        let json = r#"{"resumableLatestByte":2097152,"resumableSessionId":"sess-1"}"#;
        let resp: ChunkUploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.resumable_latest_byte, 2_097_152);
        assert_eq!(resp.resumable_session_id.as_deref(), Some("sess-1"));
        assert!(resp.file.is_none());
    }

    #[test]
    fn chunk_response_with_file() {
        let json = r#"{
            "resumableLatestByte": 10,
            "resumableSessionId": "sess-1",
            "file": {"id": "f1", "parents": ["root", "other"]}
        }"#;
        let resp: ChunkUploadResponse = serde_json::from_str(json).unwrap();
        let file = resp.file.unwrap();
        assert_eq!(file.id, "f1");
        assert_eq!(file.parent_folder_id(), Some("root"));
    }

    #[test]
    fn parent_folder_missing() {
        let file: UploadedFile = serde_json::from_str(r#"{"id":"f1"}"#).unwrap();
        assert_eq!(file.parent_folder_id(), None);
    }

    #[test]
    fn first_chunk_request_serializes_null_session() {
        let req = ChunkUploadRequest {
            file_name: "a.bin".into(),
            chunk_to_upload: "AAAA".into(),
            resumable_session_id: None,
            start_byte: 0,
            total_bytes: 3,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["resumableSessionId"], serde_json::Value::Null);
        assert_eq!(json["startByte"], 0);
        assert_eq!(json["chunkToUpload"], "AAAA");
    }

    #[test]
    fn range_expected_len_is_inclusive() {
        let req = RangeDownloadRequest {
            file_version_id: "v1".into(),
            start_byte: 4,
            end_byte: 7,
        };
        assert_eq!(req.expected_len(), 4);
    }
}
