fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use cloudfiles_protocol::messages::{
        ChunkUploadRequest, ChunkUploadResponse, ConfigRecord, RangeDownloadRequest,
        UploadedFile, WholeUploadRequest,
    };
    use cloudfiles_protocol::{RemoteFault, codec, normalize_fault_message};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes JSON numbers so that `65` and `65.0` compare equal.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    serde_json::json!(f)
                } else {
                    v.clone()
                }
            }
            serde_json::Value::Object(map) => {
                let normalized: serde_json::Map<String, serde_json::Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect();
                serde_json::Value::Object(normalized)
            }
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent, number-normalized comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  remote: {fixture}\n  local:  {reserialized}"
        );
        parsed
    }

    // --- Upload ---

    #[test]
    fn fixture_whole_upload_request() {
        let req = roundtrip_test::<WholeUploadRequest>("whole_upload_request.json");
        assert_eq!(codec::decode(&req.content_to_upload).unwrap(), b"%PDF-1.4\n");
    }

    #[test]
    fn fixture_first_chunk_has_null_session() {
        let req = roundtrip_test::<ChunkUploadRequest>("chunk_upload_request_first.json");
        assert!(req.resumable_session_id.is_none());
        assert_eq!(req.start_byte, 0);
    }

    #[test]
    fn fixture_next_chunk_carries_session() {
        let req = roundtrip_test::<ChunkUploadRequest>("chunk_upload_request_next.json");
        assert_eq!(req.start_byte, 2 * 1024 * 1024);
        assert!(req.resumable_session_id.is_some());
    }

    #[test]
    fn fixture_chunk_upload_response() {
        let resp = roundtrip_test::<ChunkUploadResponse>("chunk_upload_response.json");
        assert!(resp.file.is_none());
    }

    #[test]
    fn fixture_chunk_upload_response_final() {
        let resp = roundtrip_test::<ChunkUploadResponse>("chunk_upload_response_final.json");
        let file = resp.file.unwrap();
        assert_eq!(file.parent_folder_id(), Some("0FolderXyz"));
    }

    #[test]
    fn fixture_uploaded_file() {
        roundtrip_test::<UploadedFile>("uploaded_file.json");
    }

    // --- Download ---

    #[test]
    fn fixture_range_download_request() {
        let req = roundtrip_test::<RangeDownloadRequest>("range_download_request.json");
        assert_eq!(req.expected_len(), 2 * 1024 * 1024);
    }

    // --- Relay and faults ---

    #[test]
    fn fixture_config_record() {
        let record = roundtrip_test::<ConfigRecord>("config_record.json");
        let payload: serde_json::Value = serde_json::from_str(&record.payload_json).unwrap();
        assert_eq!(payload["mode"], "edit");
    }

    #[test]
    fn fixture_remote_fault() {
        let fault = roundtrip_test::<RemoteFault>("remote_fault.json");
        assert_eq!(fault.describe(), "Drive storage quota exceeded");
    }

    #[test]
    fn fixture_remote_fault_messages_normalize() {
        let cases = load_fixture("remote_faults.json");
        for case in cases.as_array().unwrap() {
            let expected = case["expected"].as_str().unwrap();
            assert_eq!(
                normalize_fault_message(&case["input"]),
                expected,
                "input: {}",
                case["input"]
            );
        }
    }
}
