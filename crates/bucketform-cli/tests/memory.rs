use bucketform_cli::commands::{self, Context, Options};

fn options(dir: &tempfile::TempDir, memory: bool) -> Options {
    let spec = dir.path().join("bucket.json");
    std::fs::write(&spec, r#"{ "bucket": "renamed-bucket", "acl": "private" }"#).unwrap();

    Options {
        spec: Some(spec),
        state: dir.path().join(".bucketform/state.json"),
        region: Some("us-west-1".into()),
        profile: None,
        endpoint_url: None,
        memory,
    }
}

#[tokio::test]
async fn memory_run_leaves_real_state_file_alone() {
    let dir = tempfile::tempdir().unwrap();
    let real_state = dir.path().join(".bucketform/state.json");
    std::fs::create_dir_all(real_state.parent().unwrap()).unwrap();
    let recorded = r#"{ "bucket": "real-bucket", "status": "in_sync" }"#;
    std::fs::write(&real_state, recorded).unwrap();

    let ctx = Context::build(options(&dir, true)).await.unwrap();
    assert_ne!(ctx.state_path(), real_state.as_path());

    commands::apply(&ctx, false).await.unwrap();

    assert!(ctx.state_path().exists());
    assert_eq!(std::fs::read_to_string(&real_state).unwrap(), recorded);
}

#[tokio::test]
async fn memory_state_goes_away_with_the_run() {
    let dir = tempfile::tempdir().unwrap();

    let ctx = Context::build(options(&dir, true)).await.unwrap();
    commands::apply(&ctx, false).await.unwrap();
    let scratch = ctx.state_path().to_path_buf();
    assert!(scratch.exists());

    drop(ctx);
    assert!(!scratch.exists());
}
