use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use gametux_link::{PeerAddress, SignalingClient, SignalingConfig, SignalingServer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

fn loopback_config() -> SignalingConfig {
    SignalingConfig::default()
        .port(0)
        .bind_addr(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn client_for(addr: SocketAddr) -> SignalingClient {
    SignalingClient::with_config(PeerAddress::from(addr), loopback_config())
}

#[test_log::test(tokio::test)]
async fn test_offer_round_trip() {
    let server = SignalingServer::new(loopback_config());
    let addr = server
        .start(|line, responder| {
            if line == "OFFER:abc" {
                responder.respond("ANSWER:xyz");
            }
        })
        .await
        .unwrap();

    let response = timeout(Duration::from_secs(5), client_for(addr).send("OFFER:abc"))
        .await
        .expect("request timed out");
    assert_eq!(response.as_deref(), Some("ANSWER:xyz"));

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_close_without_response_is_absence() {
    let server = SignalingServer::new(loopback_config());
    let addr = server.start(|_, _responder| {}).await.unwrap();

    let response = timeout(Duration::from_secs(5), client_for(addr).send("OFFER:abc"))
        .await
        .expect("server should close promptly");
    assert_eq!(response, None);

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_silent_client_does_not_block_others() {
    let server = SignalingServer::new(loopback_config());
    let addr = server
        .start(|_, responder| responder.respond("OK"))
        .await
        .unwrap();

    // Connect and never send a line.
    let _stalled = TcpStream::connect(addr).await.unwrap();

    for _ in 0..3 {
        let response = timeout(Duration::from_secs(2), client_for(addr).send("ICE:c"))
            .await
            .expect("other clients are served");
        assert_eq!(response.as_deref(), Some("OK"));
    }

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_server_closes_after_responding() {
    let server = SignalingServer::new(loopback_config());
    let addr = server
        .start(|_, responder| responder.respond("OK"))
        .await
        .unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"ICE:c\n").await.unwrap();

    let mut received = Vec::new();
    timeout(Duration::from_secs(2), stream.read_to_end(&mut received))
        .await
        .expect("server should close the connection")
        .unwrap();
    assert_eq!(received, b"OK\n");

    server.stop().await;
}

#[test_log::test(tokio::test)]
async fn test_stop_refuses_new_connections() {
    let server = SignalingServer::new(loopback_config());
    let addr = server
        .start(|_, responder| responder.respond("OK"))
        .await
        .unwrap();
    server.stop().await;

    assert!(TcpStream::connect(addr).await.is_err());
    assert_eq!(client_for(addr).send("ICE:c").await, None);
}
