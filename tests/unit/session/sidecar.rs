use super::*;

fn sidecar(id: &str, cost: u64) -> Sidecar {
    Sidecar {
        kind: ArtifactKind::Carousel,
        preview_id: id.to_string(),
        mode: Mode::Carousel,
        ratio: Ratio::Square,
        frames: 2,
        cost,
        files: vec![format!("{id}.webp"), format!("{id}_f1.webp")],
        created_ms: 1,
        encode_status: None,
        render_context: serde_json::from_str(
            r#"{"mode":"carousel","ratio":"1x1","images":["a.jpg",{"url":"b.jpg"}]}"#,
        )
        .unwrap(),
    }
}

fn record(id: &str, at: u64) -> CommitRecord {
    CommitRecord {
        post_id: id.to_string(),
        preview_id: id.replace("post_", "prev_"),
        kind: ArtifactKind::Image,
        committed_url: format!("/static/generated/{id}.jpg"),
        cost: 1,
        account: "acme".to_string(),
        committed_ms: at,
        files: vec![format!("{id}.jpg")],
    }
}

#[test]
fn sidecar_wire_shape() {
    let dir = tempfile::tempdir().unwrap();
    let s = sidecar("prev_10", 2);
    let path = s.write(dir.path()).unwrap();
    assert!(path.ends_with("prev_10.meta.json"));

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["type"], "carousel");
    assert_eq!(raw["frames"], 2);
    assert_eq!(raw["cost"], 2);
    assert_eq!(raw["ratio"], "1:1");
    assert_eq!(raw["render_context"]["ratio"], "1x1");
    assert_eq!(raw["render_context"]["images"][1]["url"], "b.jpg");
    assert!(raw.get("encode_status").is_none());

    let back = Sidecar::read(dir.path(), "prev_10").unwrap().unwrap();
    assert_eq!(back, s);
    assert_eq!(back.primary(), Some("prev_10.webp"));
}

#[test]
fn missing_records_read_as_none() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Sidecar::read(dir.path(), "prev_1").unwrap().is_none());
    assert!(CommitRecord::read(dir.path(), "post_1").unwrap().is_none());
}

#[test]
fn corrupt_sidecar_is_a_serde_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(meta_path(dir.path(), "prev_1"), b"{not json").unwrap();
    assert!(matches!(
        Sidecar::read(dir.path(), "prev_1"),
        Err(AutopostError::Serde(_))
    ));
}

#[test]
fn commit_records_list_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    record("post_1", 100).write(dir.path()).unwrap();
    record("post_3", 300).write(dir.path()).unwrap();
    record("post_2", 200).write(dir.path()).unwrap();
    sidecar("prev_9", 1).write(dir.path()).unwrap();
    std::fs::write(meta_path(dir.path(), "post_bad"), b"[]").unwrap();

    let ids: Vec<String> = CommitRecord::list(dir.path())
        .unwrap()
        .into_iter()
        .map(|r| r.post_id)
        .collect();
    assert_eq!(ids, vec!["post_3", "post_2", "post_1"]);
}

#[test]
fn listing_a_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(CommitRecord::list(&dir.path().join("nope")).unwrap().is_empty());
}
