use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use fileio_bridge::error::{BackendResult, StorageError, codes};
use fileio_bridge::protocol::{Command, Envelope, HostMessage, InboundMessage, RequestId};
use fileio_bridge::service::{FileService, Outbound, ServiceOptions};
use fileio_bridge::session::serve_host;
use fileio_bridge::storage::{
    Backend, FileHandle, FileRef, LocalBackend, MemoryBackend, OpenMode, Outcome,
};
use tempfile::TempDir;

fn path(p: &str) -> FileRef {
    FileRef::parse(p).unwrap()
}

fn message(id: u64, parts: &[&str]) -> InboundMessage {
    InboundMessage {
        id: Some(RequestId(id)),
        parts: parts.iter().map(|s| s.to_string()).collect(),
    }
}

fn start(backend: impl Backend + 'static, options: ServiceOptions) -> (FileService, Outbound) {
    FileService::start(Box::new(backend), options).unwrap()
}

/// Shuts the service down and returns everything it published.
async fn finish(service: FileService, mut outbound: Outbound) -> Vec<Envelope> {
    tokio::task::spawn_blocking(move || service.shutdown())
        .await
        .unwrap();
    let mut published = Vec::new();
    while let Some(envelope) = outbound.recv().await {
        published.push(envelope);
    }
    published
}

fn replies(published: &[Envelope]) -> HashMap<RequestId, Vec<HostMessage>> {
    let mut by_id: HashMap<RequestId, Vec<HostMessage>> = HashMap::new();
    for envelope in published {
        if let Some(id) = envelope.id {
            by_id.entry(id).or_default().push(envelope.message.clone());
        }
    }
    by_id
}

/// Wraps the memory store and stalls every file open.
struct SlowBackend {
    inner: MemoryBackend,
    delay: Duration,
}

impl Backend for SlowBackend {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn open(&mut self, capacity: u64) -> BackendResult<()> {
        self.inner.open(capacity)
    }

    fn open_file(
        &mut self,
        path: &FileRef,
        mode: OpenMode,
    ) -> BackendResult<Box<dyn FileHandle + '_>> {
        thread::sleep(self.delay);
        self.inner.open_file(path, mode)
    }

    fn delete(&mut self, path: &FileRef) -> BackendResult<()> {
        self.inner.delete(path)
    }

    fn read_dir(&mut self, path: &FileRef) -> BackendResult<Vec<String>> {
        self.inner.read_dir(path)
    }

    fn make_dir(&mut self, path: &FileRef) -> BackendResult<()> {
        self.inner.make_dir(path)
    }

    fn rename(&mut self, from: &FileRef, to: &FileRef) -> BackendResult<()> {
        self.inner.rename(from, to)
    }
}

#[tokio::test]
async fn test_ready_is_first_message() {
    let (service, mut outbound) = start(MemoryBackend::new(), ServiceOptions::default());

    let first = outbound.recv().await.unwrap();
    assert_eq!(first.id, None);
    assert_eq!(first.message, HostMessage::Ready);

    service.shutdown();
}

#[tokio::test]
async fn test_save_load_round_trip_with_short_transfers() {
    let backend = MemoryBackend::new().with_chunk_limit(7);
    let (service, outbound) = start(backend, ServiceOptions::default());

    let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    let saved = service
        .execute(Command::Save {
            path: path("/blob.bin"),
            contents: payload.clone(),
        })
        .await;
    assert_eq!(saved, Ok(Outcome::Saved { bytes: 5000 }));

    let loaded = service.execute(Command::Load(path("/blob.bin"))).await;
    assert_eq!(loaded, Ok(Outcome::Loaded(payload)));

    finish(service, outbound).await;
}

#[tokio::test]
async fn test_empty_save_truncates() {
    let (service, outbound) = start(MemoryBackend::new(), ServiceOptions::default());

    service
        .execute(Command::Save {
            path: path("/note"),
            contents: b"some text".to_vec(),
        })
        .await
        .unwrap();
    service
        .execute(Command::Save {
            path: path("/note"),
            contents: Vec::new(),
        })
        .await
        .unwrap();

    let loaded = service.execute(Command::Load(path("/note"))).await;
    assert_eq!(loaded, Ok(Outcome::Loaded(Vec::new())));

    finish(service, outbound).await;
}

#[tokio::test]
async fn test_missing_paths() {
    let (service, outbound) = start(MemoryBackend::new(), ServiceOptions::default());

    let loaded = service.execute(Command::Load(path("/never-saved"))).await;
    assert_eq!(loaded, Err(StorageError::NotFound("/never-saved".into())));

    let deleted = service.execute(Command::Delete(path("/never-saved"))).await;
    assert_eq!(deleted, Ok(Outcome::NothingToDelete));

    finish(service, outbound).await;
}

#[tokio::test]
async fn test_listing_skips_hidden_names() {
    let options = ServiceOptions {
        sorted_listing: true,
        ..ServiceOptions::default()
    };
    let (service, outbound) = start(MemoryBackend::new(), options);

    for name in ["/zeta", "/.hidden", "/alpha"] {
        service
            .execute(Command::Save {
                path: path(name),
                contents: b"x".to_vec(),
            })
            .await
            .unwrap();
    }
    service.execute(Command::MakeDir(path("/mid"))).await.unwrap();

    let listed = service.execute(Command::List(path("/"))).await;
    assert_eq!(
        listed,
        Ok(Outcome::Listed(vec![
            "alpha".to_string(),
            "mid".to_string(),
            "zeta".to_string()
        ]))
    );

    let empty = service.execute(Command::List(path("/mid"))).await;
    assert_eq!(empty, Ok(Outcome::Listed(Vec::new())));

    finish(service, outbound).await;
}

#[tokio::test]
async fn test_rename_moves_contents() {
    let (service, outbound) = start(MemoryBackend::new(), ServiceOptions::default());

    service
        .execute(Command::Save {
            path: path("/draft"),
            contents: b"final words".to_vec(),
        })
        .await
        .unwrap();
    let renamed = service
        .execute(Command::Rename {
            from: path("/draft"),
            to: path("/final"),
        })
        .await;
    assert_eq!(renamed, Ok(Outcome::Renamed));

    assert_eq!(
        service.execute(Command::Load(path("/final"))).await,
        Ok(Outcome::Loaded(b"final words".to_vec()))
    );
    assert!(matches!(
        service.execute(Command::Load(path("/draft"))).await,
        Err(StorageError::NotFound(_))
    ));

    finish(service, outbound).await;
}

#[tokio::test]
async fn test_each_message_gets_exactly_one_reply() {
    let (service, outbound) = start(MemoryBackend::new(), ServiceOptions::default());

    service.post_message(message(1, &["save", "/a", "one"]));
    service.post_message(message(2, &["load", "/a"]));
    service.post_message(message(3, &["list", "/"]));
    service.post_message(message(4, &["delete", "/missing"]));
    service.post_message(message(5, &["load", "relative"]));
    service.post_message(message(6, &["chmod", "/a"]));
    service.post_message(message(7, &["makedir", "/dir"]));
    service.post_message(message(8, &["rename", "/a", "/dir/a"]));

    let published = finish(service, outbound).await;
    let ready: Vec<_> = published
        .iter()
        .filter(|e| e.message == HostMessage::Ready)
        .collect();
    assert_eq!(ready.len(), 1);

    let by_id = replies(&published);
    assert_eq!(by_id.len(), 8);
    for (id, messages) in &by_id {
        assert_eq!(messages.len(), 1, "request {id} got {messages:?}");
    }

    assert_eq!(
        by_id[&RequestId(1)][0],
        HostMessage::Stat("Save success".into())
    );
    assert_eq!(by_id[&RequestId(2)][0], HostMessage::Disp(b"one".to_vec()));
    assert_eq!(by_id[&RequestId(3)][0], HostMessage::List(vec!["a".into()]));
    assert_eq!(
        by_id[&RequestId(4)][0],
        HostMessage::Stat("File/Directory not found".into())
    );
    assert_eq!(
        by_id[&RequestId(5)][0],
        HostMessage::Err("File name must begin with /".into())
    );
    assert!(matches!(by_id[&RequestId(6)][0], HostMessage::Err(_)));
    assert_eq!(
        by_id[&RequestId(7)][0],
        HostMessage::Stat("Make directory success".into())
    );
    assert_eq!(
        by_id[&RequestId(8)][0],
        HostMessage::Stat("Rename success".into())
    );
}

#[tokio::test]
async fn test_host_and_allocated_ids_never_collide() {
    let (service, outbound) = start(MemoryBackend::new(), ServiceOptions::default());
    let unnumbered = |parts: &[&str]| InboundMessage {
        id: None,
        parts: parts.iter().map(|s| s.to_string()).collect(),
    };

    let listed = service.post_message(message(1, &["list", "/"]));
    let missing = service.post_message(unnumbered(&["load", "/missing"]));
    let saved = service.post_message(message(5, &["save", "/x", "data"]));
    let relisted = service.post_message(unnumbered(&["list", "/"]));

    assert_eq!(listed, RequestId(1));
    assert_eq!(missing, RequestId(2));
    assert_eq!(saved, RequestId(5));
    assert_eq!(relisted, RequestId(6));

    let by_id = replies(&finish(service, outbound).await);
    assert_eq!(by_id.len(), 4);
    assert_eq!(by_id[&listed], vec![HostMessage::List(Vec::new())]);
    assert_eq!(
        by_id[&missing],
        vec![HostMessage::Err(
            "File not found: /missing -- Error #: -20".into()
        )]
    );
    assert_eq!(by_id[&saved], vec![HostMessage::Stat("Save success".into())]);
    assert_eq!(by_id[&relisted], vec![HostMessage::List(vec!["x".into()])]);
}

#[test]
fn test_blocking_callers_outside_runtime() {
    let (service, _outbound) = start(MemoryBackend::new(), ServiceOptions::default());

    let saved = service.execute_blocking(Command::Save {
        path: path("/plain"),
        contents: b"no runtime".to_vec(),
    });
    assert_eq!(saved, Ok(Outcome::Saved { bytes: 10 }));
    assert_eq!(
        service.execute_blocking(Command::Load(path("/plain"))),
        Ok(Outcome::Loaded(b"no runtime".to_vec()))
    );

    service.shutdown();
}

#[tokio::test]
async fn test_failed_open_rejects_every_command() {
    let backend = MemoryBackend::new().failing_open(codes::NO_ACCESS);
    let (service, mut outbound) = start(backend, ServiceOptions::default());

    let first = outbound.recv().await.unwrap();
    assert_eq!(first.id, None);
    assert_eq!(
        first.message,
        HostMessage::Err("Failed to open file system -- Error #: -7".into())
    );

    for command in [
        Command::Load(path("/a")),
        Command::Save {
            path: path("/a"),
            contents: b"x".to_vec(),
        },
        Command::List(path("/")),
        Command::MakeDir(path("/d")),
    ] {
        assert_eq!(service.execute(command).await, Err(StorageError::NotOpen));
    }

    let rest = finish(service, outbound).await;
    assert!(rest.iter().all(|e| e.message != HostMessage::Ready));
}

#[tokio::test]
async fn test_deadline_produces_single_error() {
    let backend = SlowBackend {
        inner: MemoryBackend::new(),
        delay: Duration::from_millis(400),
    };
    let options = ServiceOptions {
        operation_timeout: Some(Duration::from_millis(50)),
        ..ServiceOptions::default()
    };
    let (service, outbound) = start(backend, options);

    service.post_message(message(11, &["save", "/slow", "data"]));

    let published = finish(service, outbound).await;
    let by_id = replies(&published);
    let messages = &by_id[&RequestId(11)];
    assert_eq!(messages.len(), 1);
    match &messages[0] {
        HostMessage::Err(text) => assert!(text.ends_with("-- Error #: -30"), "{text}"),
        other => panic!("expected ERR, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_saves_do_not_interleave() {
    let backend = MemoryBackend::new().with_chunk_limit(13);
    let (service, outbound) = start(backend, ServiceOptions::default());

    let first = vec![b'a'; 20_000];
    let second = vec![b'b'; 20_000];
    let (saved_first, saved_second) = tokio::join!(
        service.execute(Command::Save {
            path: path("/first"),
            contents: first.clone(),
        }),
        service.execute(Command::Save {
            path: path("/second"),
            contents: second.clone(),
        }),
    );
    saved_first.unwrap();
    saved_second.unwrap();

    assert_eq!(
        service.execute(Command::Load(path("/first"))).await,
        Ok(Outcome::Loaded(first))
    );
    assert_eq!(
        service.execute(Command::Load(path("/second"))).await,
        Ok(Outcome::Loaded(second))
    );

    finish(service, outbound).await;
}

#[tokio::test]
async fn test_local_backend_round_trip() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("store");
    let (service, outbound) = start(LocalBackend::new(&root), ServiceOptions::default());

    service.execute(Command::MakeDir(path("/docs"))).await.unwrap();
    service
        .execute(Command::Save {
            path: path("/docs/readme.txt"),
            contents: b"local contents".to_vec(),
        })
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(root.join("docs").join("readme.txt")).unwrap(),
        b"local contents"
    );
    assert_eq!(
        service.execute(Command::List(path("/docs"))).await,
        Ok(Outcome::Listed(vec!["readme.txt".to_string()]))
    );
    assert_eq!(
        service.execute(Command::Delete(path("/docs/readme.txt"))).await,
        Ok(Outcome::Deleted)
    );

    finish(service, outbound).await;
}

#[tokio::test]
async fn test_host_session_over_json_lines() {
    let (service, outbound) = start(MemoryBackend::new(), ServiceOptions::default());
    let input = concat!(
        r#"["makedir", "/box"]"#,
        "\n",
        r#"{"id": 40, "message": ["save", "/box/item", "payload"]}"#,
        "\n",
    );

    let output = serve_host(service, outbound, input.as_bytes(), Vec::new(), 4096)
        .await
        .unwrap();
    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], r#"{"message":["READY"]}"#);
    assert!(lines.contains(&r#"{"id":40,"message":["STAT","Save success"]}"#));
    assert!(
        lines
            .iter()
            .any(|line| line.contains("Make directory success"))
    );
}
