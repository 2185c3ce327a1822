use img_miner::config::{parse_config, Config};
use img_miner::generator::GeneratorKind;
use img_miner::miner::{Miner, StopReason};
use img_miner::state::{AttemptRecord, MinerState, ProgressState};
use img_miner::storage;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration mining `base` into `save_dir`
fn create_test_config(base: &str, save_dir: &Path, generator: &str) -> Config {
    parse_config(&format!(
        r#"
[miner]
base-address = "{}"
threads = 3
batch-size = 3
checkpoint-every = 3
images-limit = 3

[generator]
{}

[http]
user-agent = "TestBot/1.0"
retries-total = 2
backoff-factor-ms = 0
timeout-secs = 10

[output]
save-dir = "{}"
"#,
        base,
        generator,
        save_dir.display()
    ))
    .expect("Failed to build test config")
}

fn sequential() -> &'static str {
    "strategy = \"sequential\"\nid-length = 3"
}

fn screenshot_page(src: &str) -> String {
    format!(
        r#"<html><head><title>Screenshot</title></head><body>
        <img class="no-click screenshot-image" src="{}" alt="" />
        </body></html>"#,
        src
    )
}

/// Mounts a page for every identifier plus the image it points at
async fn mount_working_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/a[a-z0-9]{2}$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(screenshot_page(&format!("{}/img/shot.png", server.uri())))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/shot.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG fake".to_vec()))
        .mount(server)
        .await;
}

fn load_record(save_dir: &Path, batch_id: u64, index: usize) -> AttemptRecord {
    let path = storage::batch_dir(save_dir, batch_id).join(storage::metadata_file_name(index));
    AttemptRecord::load(&path).expect("Failed to load record")
}

#[tokio::test]
async fn test_batch_all_successful() {
    let server = MockServer::start().await;
    mount_working_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), sequential());

    let mut miner = Miner::new(&config, false).expect("Failed to create miner");
    let outcome = miner.run(CancellationToken::new()).await.expect("Mining failed");

    assert_eq!(outcome.reason, StopReason::LimitReached);
    assert_eq!(outcome.progress.n_processed, 3);
    assert_eq!(outcome.progress.n_successful, 3);

    for index in 0..3 {
        let record = load_record(dir.path(), 0, index);
        assert!(record.success_download, "record {} failed", index);
        assert_eq!(record.index_download, index);

        let local = record.local_p.expect("local path missing");
        assert_eq!(std::fs::read(&local).unwrap(), b"\x89PNG fake");
        assert_eq!(
            record.url_hosting,
            Some(format!("{}/img/shot.png", server.uri()))
        );
    }

    let record = load_record(dir.path(), 0, 1);
    assert_eq!(record.url_primary, format!("{}/aab", server.uri()));

    let saved = ProgressState::load(&storage::progress_path(dir.path()))
        .unwrap()
        .expect("No checkpoint written");
    assert_eq!(saved.n_processed, 3);
    assert_eq!(saved.n_successful, 3);
    assert_eq!(saved.batch_id, 1);
    assert_eq!(saved.generator_type, GeneratorKind::Sequential);
    assert_eq!(saved.random_seed, None);
}

#[tokio::test]
async fn test_exhausted_retries_only_fail_that_item() {
    let server = MockServer::start().await;

    // Mounted first so it takes precedence over the catch-all page mock
    Mock::given(method("GET"))
        .and(path("/aab"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;
    mount_working_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), dir.path(), sequential());

    let mut miner = Miner::new(&config, false).expect("Failed to create miner");
    let outcome = miner.run(CancellationToken::new()).await.expect("Mining failed");

    assert_eq!(outcome.progress.n_processed, 3);
    assert_eq!(outcome.progress.n_successful, 2);

    let failed = load_record(dir.path(), 0, 1);
    assert!(!failed.success_download);
    assert_eq!(failed.url_hosting, None);
    assert_eq!(failed.local_p, None);
    assert_eq!(failed.url_primary, format!("{}/aab", server.uri()));

    for index in [0, 2] {
        let record = load_record(dir.path(), 0, index);
        assert!(record.success_download);
        assert!(record.local_p.is_some());
    }
}

#[tokio::test]
async fn test_restart_resumes_after_checkpoint() {
    let server = MockServer::start().await;

    // Offset 501 over "a" + two symbols: 501 = 13 * 36 + 33 -> "an7"
    Mock::given(method("GET"))
        .and(path("/an7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(screenshot_page(&format!("{}/img/an7.jpg", server.uri()))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/an7.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path(), sequential());
    config.miner.batch_size = 1;
    config.miner.images_limit = 501;

    let checkpoint = ProgressState {
        batch_id: 500,
        n_processed: 500,
        n_successful: 40,
        generator_type: GeneratorKind::Sequential,
        random_seed: None,
    };
    checkpoint
        .save(&storage::progress_path(dir.path()))
        .unwrap();

    let mut miner = Miner::new(&config, false).expect("Failed to create miner");
    let outcome = miner.run(CancellationToken::new()).await.expect("Mining failed");

    assert_eq!(outcome.progress.n_processed, 501);
    assert_eq!(outcome.progress.n_successful, 41);
    assert_eq!(outcome.progress.batch_id, 501);

    let record = load_record(dir.path(), 500, 0);
    assert_eq!(record.url_primary, format!("{}/an7", server.uri()));
    assert_eq!(
        record.local_p,
        Some(storage::batch_dir(dir.path(), 500).join("0000.jpg"))
    );
}

#[tokio::test]
async fn test_random_run_resumes_deterministically() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let random = "strategy = \"random\"\nseed = 2024\nid-length = 6";

    // Reference run: 9 identifiers in one go
    let reference_dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), reference_dir.path(), random);
    config.miner.images_limit = 9;
    Miner::new(&config, false)
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();

    let reference: Vec<String> = (0..3u64)
        .flat_map(|batch| (0..3).map(move |index| (batch, index)))
        .map(|(batch, index)| load_record(reference_dir.path(), batch, index).url_primary)
        .collect();

    // Interrupted run: stop after 3, then resume
    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path(), random);
    config.miner.images_limit = 3;
    Miner::new(&config, false)
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();

    config.miner.images_limit = 6;
    let outcome = Miner::new(&config, false)
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.progress.n_processed, 6);
    assert_eq!(outcome.progress.random_seed, Some(2024));

    let first: Vec<String> = (0..3)
        .map(|index| load_record(dir.path(), 0, index).url_primary)
        .collect();
    let resumed: Vec<String> = (0..3)
        .map(|index| load_record(dir.path(), 1, index).url_primary)
        .collect();

    assert_eq!(first, reference[0..3]);
    // The resumed generator starts at offset n_processed + 1
    assert_eq!(resumed, reference[4..7]);
}

#[tokio::test]
async fn test_shutdown_during_batch_checkpoints_without_draining() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path(), sequential());
    config.miner.images_limit = 1000;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let mut miner = Miner::new(&config, false).expect("Failed to create miner");
    let outcome = miner.run(token).await.expect("Mining failed");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.reason, StopReason::Signal);
    assert_eq!(outcome.state, MinerState::Stopped);
    assert_eq!(miner.state(), MinerState::Stopped);

    // The interrupted batch is not counted
    assert_eq!(outcome.progress.n_processed, 0);
    assert_eq!(outcome.progress.batch_id, 0);

    let saved = ProgressState::load(&storage::progress_path(dir.path()))
        .unwrap()
        .expect("No checkpoint written on shutdown");
    assert_eq!(saved.n_processed, 0);
}

#[tokio::test]
async fn test_every_item_gets_a_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/a[a-z0-9]{2}$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>removed</html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server.uri(), dir.path(), sequential());
    config.miner.threads = 2;
    config.miner.batch_size = 7;
    config.miner.images_limit = 14;

    let outcome = Miner::new(&config, false)
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.progress.n_processed, 14);
    assert_eq!(outcome.progress.n_successful, 0);

    for batch in 0..2 {
        for index in 0..7 {
            let record = load_record(dir.path(), batch, index);
            assert_eq!(record.index_download, index);
            assert!(!record.success_download);
            assert_eq!(record.url_hosting, None);
        }
        let extra = storage::batch_dir(dir.path(), batch).join(storage::metadata_file_name(7));
        assert!(!extra.exists());
    }
}
