use super::*;

fn loader_for(root: &Path) -> ImageLoader {
    let cfg = EngineConfig {
        static_root: root.to_path_buf(),
        ..EngineConfig::default()
    };
    ImageLoader::new(&cfg).unwrap()
}

fn write_png(path: &Path, w: u32, h: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(w, h, image::Rgba([1, 2, 3, 255]))
        .save(path)
        .unwrap();
}

#[test]
fn loads_static_paths_with_and_without_prefix() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("uploads/a.png"), 5, 4);
    let loader = loader_for(dir.path());

    for r in ["/static/uploads/a.png", "static/uploads/a.png", "uploads/a.png", "/uploads/a.png"] {
        let img = loader.load(r).unwrap();
        assert_eq!(img.image.dimensions(), (5, 4), "{r}");
        assert_eq!(img.reference, r);
    }
}

#[test]
fn missing_local_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let loader = loader_for(dir.path());
    assert!(matches!(
        loader.load("uploads/missing.jpg"),
        Err(AutopostError::NotFound(_))
    ));
}

#[test]
fn parent_traversal_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let loader = loader_for(dir.path());
    assert!(loader.resolve_local("../etc/passwd").is_err());
    assert!(normalize_rel_path("a/../../b").is_err());
    assert_eq!(normalize_rel_path("./a//b.png").unwrap(), "a/b.png");
}

#[test]
fn corrupt_local_file_is_image_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("uploads/bad.jpg");
    std::fs::create_dir_all(p.parent().unwrap()).unwrap();
    std::fs::write(&p, b"not a jpeg").unwrap();
    let loader = loader_for(dir.path());
    assert!(matches!(
        loader.load("uploads/bad.jpg"),
        Err(AutopostError::ImageLoad { .. })
    ));
}

#[test]
fn remote_detection() {
    assert!(is_remote("https://cdn.example/a.jpg"));
    assert!(is_remote("HTTP://cdn.example/a.jpg"));
    assert!(!is_remote("/static/uploads/a.jpg"));
}

#[test]
fn extension_inference() {
    assert_eq!(
        extension_from_url("https://cdn.example/p/IMG.JPEG?w=200#x"),
        Some("jpg")
    );
    assert_eq!(extension_from_url("https://cdn.example/p/photo"), None);
    assert_eq!(extension_from_url("https://cdn.example"), None);
    assert_eq!(
        extension_from_content_type("image/webp; charset=binary"),
        Some("webp")
    );
    assert_eq!(extension_from_content_type("text/html"), None);
}
