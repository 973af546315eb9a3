use std::io::{self, Write};
use std::net::{Shutdown, TcpListener as StdTcpListener, TcpStream as StdTcpStream};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use trigger_watch::{
    ByteSource, CancellationToken, Descriptor, Error, Received, Trigger, Watcher, WatcherExit,
    WatcherState,
};

const TIMEOUT: Duration = Duration::from_secs(10);

/// Returns the client side and the shared descriptor of the accepted side.
fn connected_pair() -> (StdTcpStream, StdTcpStream, Arc<Descriptor>) {
    let listener = StdTcpListener::bind("127.0.0.1:0").expect("bind listener");
    let addr = listener.local_addr().expect("local addr");

    let client = StdTcpStream::connect(addr).expect("connect");
    let (server, _peer) = listener.accept().expect("accept");
    let descriptor = Descriptor::duplicate(server.as_raw_fd()).expect("duplicate");

    (client, server, Arc::new(descriptor))
}

fn collect_bytes(receiver: &Receiver<Received>, expected: usize) -> Vec<Received> {
    let deadline = Instant::now() + TIMEOUT;
    let mut chunks = Vec::new();
    let mut total = 0;

    while total < expected {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let received = receiver
            .recv_timeout(remaining)
            .expect("watcher reported in time");
        total += received.bytes.len();
        chunks.push(received);
    }

    chunks
}

/// A source sharing the real descriptor whose reads always fail.
struct FailingSource {
    inner: Arc<Descriptor>,
}

impl ByteSource for FailingSource {
    fn descriptor(&self) -> RawFd {
        self.inner.descriptor()
    }

    fn read_into(&self, _buffer: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::from_raw_os_error(libc::EIO))
    }
}

fn pipe() -> (Arc<Descriptor>, RawFd) {
    let mut fds = [0i32; 2];
    let res = unsafe { libc::pipe(fds.as_mut_ptr()) };
    assert_eq!(res, 0, "pipe() failed");

    let reader = Descriptor::duplicate(fds[0]).expect("duplicate read end");
    unsafe {
        libc::close(fds[0]);
    }

    (Arc::new(reader), fds[1])
}

fn assert_stops_on_writer_close(trigger: Trigger) {
    let (reader, writer) = pipe();
    let (sink, _receiver) = mpsc::channel();
    let cancel = CancellationToken::new().expect("token");

    let handle = Watcher::new(trigger, reader, sink, cancel.clone())
        .spawn()
        .expect("spawn");

    // A pipe reports a closed writer as EPOLLHUP without EPOLLIN.
    unsafe {
        libc::close(writer);
    }

    let deadline = Instant::now() + TIMEOUT;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }

    let finished = handle.is_finished();
    cancel.cancel();

    assert!(finished, "{trigger} watcher kept waiting after writer close");
    assert_eq!(handle.join().expect("watcher"), WatcherExit::PeerClosed);
}

#[test]
fn level_watcher_stops_on_hangup_without_data() {
    assert_stops_on_writer_close(Trigger::Level);
}

#[test]
fn edge_watcher_stops_on_hangup_without_data() {
    assert_stops_on_writer_close(Trigger::Edge);
}

#[test]
fn new_watcher_starts_created() {
    let (_client, _server, descriptor) = connected_pair();
    let (sink, _receiver) = mpsc::channel();
    let cancel = CancellationToken::new().expect("token");

    let watcher = Watcher::new(Trigger::Edge, descriptor, sink, cancel);

    assert_eq!(watcher.state(), WatcherState::Created);
    assert_eq!(watcher.trigger(), Trigger::Edge);
}

#[test]
fn edge_watcher_drains_a_large_send_without_a_second_write() {
    let (mut client, _server, descriptor) = connected_pair();
    let (sink, receiver) = mpsc::channel();
    let cancel = CancellationToken::new().expect("token");

    let handle = Watcher::new(Trigger::Edge, descriptor, sink, cancel.clone())
        .spawn()
        .expect("spawn");

    let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
    client.write_all(&payload).expect("write");

    let chunks = collect_bytes(&receiver, payload.len());

    assert!(chunks.iter().all(|chunk| chunk.trigger == Trigger::Edge));
    assert!(chunks.iter().all(|chunk| chunk.bytes.len() <= 1024));
    let received: Vec<u8> = chunks.into_iter().flat_map(|chunk| chunk.bytes).collect();
    assert_eq!(received, payload);

    cancel.cancel();
    assert_eq!(handle.join().expect("edge watcher"), WatcherExit::Cancelled);
}

#[test]
fn level_watcher_reports_every_byte() {
    let (mut client, _server, descriptor) = connected_pair();
    let (sink, receiver) = mpsc::channel();
    let cancel = CancellationToken::new().expect("token");

    let handle = Watcher::new(Trigger::Level, descriptor, sink, cancel.clone())
        .max_events(1)
        .spawn()
        .expect("spawn");

    let payload = vec![b'z'; 3000];
    client.write_all(&payload).expect("write");

    let chunks = collect_bytes(&receiver, payload.len());
    assert!(chunks.iter().all(|chunk| chunk.trigger == Trigger::Level));
    assert_eq!(chunks.iter().map(|chunk| chunk.bytes.len()).sum::<usize>(), 3000);

    cancel.cancel();
    assert_eq!(handle.join().expect("level watcher"), WatcherExit::Cancelled);
}

#[test]
fn edge_read_failure_leaves_level_watcher_running() {
    let (mut client, _server, descriptor) = connected_pair();
    let (sink, receiver) = mpsc::channel();
    let cancel = CancellationToken::new().expect("token");

    let failing = Arc::new(FailingSource {
        inner: Arc::clone(&descriptor),
    });
    let edge = Watcher::new(Trigger::Edge, failing, sink.clone(), cancel.clone())
        .spawn()
        .expect("spawn edge");
    let level = Watcher::new(Trigger::Level, descriptor, sink, cancel.clone())
        .spawn()
        .expect("spawn level");

    // Keep poking until the edge watcher has woken up and failed.
    let deadline = Instant::now() + TIMEOUT;
    while !edge.is_finished() {
        assert!(Instant::now() < deadline, "edge watcher never failed");
        client.write_all(b".").expect("write");
        thread::sleep(Duration::from_millis(20));
    }

    match edge.join() {
        Err(Error::Read(err)) => assert_eq!(err.raw_os_error(), Some(libc::EIO)),
        other => panic!("expected read error, got {other:?}"),
    }

    client.write_all(b"still here").expect("write");

    let deadline = Instant::now() + TIMEOUT;
    let mut text = String::new();
    while !text.contains("still here") {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let received = receiver.recv_timeout(remaining).expect("level kept reporting");
        assert_eq!(received.trigger, Trigger::Level);
        text.push_str(&received.text());
    }

    cancel.cancel();
    assert_eq!(level.join().expect("level watcher"), WatcherExit::Cancelled);
}

#[test]
fn two_watchers_never_duplicate_bytes() {
    let (mut client, _server, descriptor) = connected_pair();
    let (sink, receiver) = mpsc::channel();
    let cancel = CancellationToken::new().expect("token");

    let edge = Watcher::new(Trigger::Edge, Arc::clone(&descriptor), sink.clone(), cancel.clone())
        .spawn()
        .expect("spawn edge");
    let level = Watcher::new(Trigger::Level, descriptor, sink, cancel)
        .spawn()
        .expect("spawn level");

    let payload: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 251) as u8).collect();
    for part in payload.chunks(4096) {
        client.write_all(part).expect("write");
    }
    client.shutdown(Shutdown::Write).expect("shutdown");

    let mut received = Vec::new();
    loop {
        match receiver.recv_timeout(TIMEOUT) {
            Ok(chunk) => received.push(chunk),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => panic!("watchers did not stop after peer close"),
        }
    }

    assert_eq!(edge.join().expect("edge watcher"), WatcherExit::PeerClosed);
    assert_eq!(level.join().expect("level watcher"), WatcherExit::PeerClosed);

    let mut seen = [0usize; 256];
    for chunk in &received {
        for &byte in &chunk.bytes {
            seen[byte as usize] += 1;
        }
    }

    let mut expected = [0usize; 256];
    for &byte in &payload {
        expected[byte as usize] += 1;
    }

    assert_eq!(seen, expected);
}

#[test]
fn cancellation_wakes_blocked_watchers() {
    let (_client, _server, descriptor) = connected_pair();
    let (sink, _receiver) = mpsc::channel();
    let cancel = CancellationToken::new().expect("token");

    let edge = Watcher::new(Trigger::Edge, Arc::clone(&descriptor), sink.clone(), cancel.clone())
        .spawn()
        .expect("spawn edge");
    let level = Watcher::new(Trigger::Level, descriptor, sink, cancel.clone())
        .spawn()
        .expect("spawn level");

    thread::sleep(Duration::from_millis(50));
    assert!(!edge.is_finished());
    assert!(!level.is_finished());

    cancel.cancel();
    cancel.cancel();

    assert_eq!(edge.join().expect("edge watcher"), WatcherExit::Cancelled);
    assert_eq!(level.join().expect("level watcher"), WatcherExit::Cancelled);
    assert!(cancel.is_cancelled());
}

#[test]
fn already_cancelled_watcher_returns_immediately() {
    let (_client, _server, descriptor) = connected_pair();
    let (sink, _receiver) = mpsc::channel();
    let cancel = CancellationToken::new().expect("token");
    cancel.cancel();

    let exit = Watcher::new(Trigger::Level, descriptor, sink, cancel)
        .run()
        .expect("run");

    assert_eq!(exit, WatcherExit::Cancelled);
}

#[test]
fn watcher_stops_when_nobody_listens() {
    let (mut client, _server, descriptor) = connected_pair();
    let (sink, receiver) = mpsc::channel();
    let cancel = CancellationToken::new().expect("token");
    drop(receiver);

    let handle = Watcher::new(Trigger::Edge, descriptor, sink, cancel)
        .spawn()
        .expect("spawn");

    client.write_all(b"unheard").expect("write");

    assert_eq!(handle.join().expect("edge watcher"), WatcherExit::Cancelled);
}

#[test]
fn received_line_names_the_mode() {
    let received = Received {
        trigger: Trigger::Level,
        bytes: b"hi".to_vec(),
    };

    assert_eq!(received.to_string(), "Level Triggered Mode: Received: hi");
}
