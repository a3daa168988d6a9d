use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    time::sleep,
};

use comms::{CommsErr, GradientCodec, RecvWindow, RetryPolicy, RingReceiver, RingSender, edge};

/// Reserves an ephemeral port and releases it so the test can bind it itself.
fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

fn fast_retry(max_attempts: usize) -> RetryPolicy {
    RetryPolicy {
        max_attempts: NonZeroUsize::new(max_attempts).unwrap(),
        retry_delay: Duration::from_millis(50),
        connect_timeout: Duration::from_secs(1),
    }
}

fn short_window(accept_millis: u64) -> RecvWindow {
    RecvWindow {
        accept_timeout: Duration::from_millis(accept_millis),
        read_timeout: Duration::from_secs(2),
    }
}

#[tokio::test]
async fn recv_is_absent_when_no_sender_connects() {
    let mut rx = RingReceiver::new(free_addr(), short_window(200));

    let started = Instant::now();
    let received = rx.recv().await.unwrap();

    assert!(received.is_none());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn send_gives_up_after_retry_budget() {
    let mut tx = RingSender::new(free_addr(), fast_retry(3));

    let started = Instant::now();
    let err = tx.send(&[1.0, 2.0]).await.unwrap_err();

    assert!(matches!(err, CommsErr::Exhausted { attempts: 3 }));
    // Worst case is attempts * (connect_timeout + retry_delay).
    assert!(started.elapsed() < Duration::from_millis(3500));
}

#[tokio::test]
async fn gradient_crosses_the_edge() {
    let listen = free_addr();
    let (mut rx, mut tx) = edge(listen, listen, fast_retry(20), short_window(3000));

    // Values exactly representable in half precision.
    let gradient = [0.5_f32, -1.25, 3.0, 0.0];

    let recv_task = tokio::spawn(async move { rx.recv().await });
    sleep(Duration::from_millis(50)).await;
    tx.send(&gradient).await.unwrap();

    let received = recv_task.await.unwrap().unwrap();
    assert_eq!(received.as_deref(), Some(&gradient[..]));
}

#[tokio::test]
async fn send_retries_until_the_listener_appears() {
    let listen = free_addr();

    // Sender starts first; the receiver binds only after a delay, the same
    // race an unsynchronized node startup produces.
    let mut tx = RingSender::new(listen, fast_retry(30));
    let send_task = tokio::spawn(async move { tx.send(&[4.0, -8.0]).await });

    sleep(Duration::from_millis(300)).await;
    let mut rx = RingReceiver::new(listen, short_window(3000));
    let received = rx.recv().await.unwrap();

    send_task.await.unwrap().unwrap();
    assert_eq!(received, Some(vec![4.0, -8.0]));
}

#[tokio::test]
async fn strict_receiver_rejects_saturated_elements() {
    let listen = free_addr();
    let mut rx =
        RingReceiver::new(listen, short_window(3000)).with_codec(GradientCodec::strict());

    let recv_task = tokio::spawn(async move { rx.recv().await });
    sleep(Duration::from_millis(50)).await;

    // 1e20 overflows half precision and saturates to Inf on the wire.
    let mut tx = RingSender::new(listen, fast_retry(20));
    tx.send(&[1.0, 1e20]).await.unwrap();

    let err = recv_task.await.unwrap().unwrap_err();
    assert!(matches!(err, CommsErr::NonFinite { index: 1 }));
}

#[tokio::test]
async fn empty_inbound_stream_is_malformed() {
    let listen = free_addr();
    let mut rx = RingReceiver::new(listen, short_window(3000));

    let recv_task = tokio::spawn(async move { rx.recv().await });
    sleep(Duration::from_millis(50)).await;

    let mut stream = TcpStream::connect(listen).await.unwrap();
    stream.shutdown().await.unwrap();

    let err = recv_task.await.unwrap().unwrap_err();
    assert!(matches!(err, CommsErr::MalformedPayload { len: 0 }));
}

#[tokio::test]
async fn odd_inbound_payload_is_malformed() {
    let listen = free_addr();
    let mut rx = RingReceiver::new(listen, short_window(3000));

    let recv_task = tokio::spawn(async move { rx.recv().await });
    sleep(Duration::from_millis(50)).await;

    let mut stream = TcpStream::connect(listen).await.unwrap();
    stream.write_all(&[0xde, 0xad, 0xbe]).await.unwrap();
    stream.shutdown().await.unwrap();

    let err = recv_task.await.unwrap().unwrap_err();
    assert!(matches!(err, CommsErr::MalformedPayload { len: 3 }));
}

#[tokio::test]
async fn unclosed_peer_hits_the_read_deadline() {
    let listen = free_addr();
    let mut rx = RingReceiver::new(
        listen,
        RecvWindow {
            accept_timeout: Duration::from_secs(3),
            read_timeout: Duration::from_millis(300),
        },
    );

    let recv_task = tokio::spawn(async move { rx.recv().await });
    sleep(Duration::from_millis(50)).await;

    // Connect and write half a message, then hold the stream open.
    let mut stream = TcpStream::connect(listen).await.unwrap();
    stream.write_all(&[1, 2, 3, 4]).await.unwrap();

    let err = recv_task.await.unwrap().unwrap_err();
    assert!(matches!(err, CommsErr::Stalled { .. }));
    drop(stream);
}
