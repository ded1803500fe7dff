use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use warden_control_plane::{encode_record, ControlPlaneClient, ControlPlaneServer};
use warden_core::{
    ConfigInbox, ControlPlaneSettings, ReceivedBatch, SensorKind, WorkerConfig,
};

fn loopback_settings() -> ControlPlaneSettings {
    ControlPlaneSettings {
        port: 0,
        bind_address: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        receive_timeout_ms: 500,
        connect_timeout_ms: 500,
    }
}

async fn next_batch(server: &mut ControlPlaneServer) -> ReceivedBatch {
    for _ in 0..300 {
        server.poll_accept();
        if let Some(batch) = server.drain_batches().pop() {
            return batch;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no batch arrived");
}

#[tokio::test]
async fn test_client_batch_reaches_server() {
    let mut server = ControlPlaneServer::bind(&loopback_settings()).await.unwrap();
    let port = server.local_addr().port();

    let configs = vec![
        WorkerConfig::new(SensorKind::Ntc, 0x48, "ntc.txt", true, 2),
        WorkerConfig::new(SensorKind::Scc, 0x61, "co2.txt", false, 5),
    ];
    let client = ControlPlaneClient::new(&loopback_settings());
    let sent = client
        .send(&format!("127.0.0.1:{port}"), &configs)
        .await
        .unwrap();
    assert_eq!(sent, 2);

    let batch = next_batch(&mut server).await;
    assert_eq!(batch.configs, configs);
    assert_eq!(batch.rejected, 0);
    assert!(batch.peer.ip().is_loopback());
    assert!(server.drain_batches().is_empty());
}

#[tokio::test]
async fn test_poll_accept_without_clients_returns_immediately() {
    let mut server = ControlPlaneServer::bind(&loopback_settings()).await.unwrap();
    let started = std::time::Instant::now();
    assert!(server.poll_accept().is_none());
    assert!(server.drain_batches().is_empty());
    assert!(started.elapsed() < Duration::from_millis(50));
}

#[tokio::test]
async fn test_garbage_records_are_counted_as_rejected() {
    let mut server = ControlPlaneServer::bind(&loopback_settings()).await.unwrap();
    let addr = server.local_addr();

    let good = WorkerConfig::new(SensorKind::Ntc, 0x48, "ntc.txt", false, 1);
    let mut payload = vec![1, 0, 3, 2, 0, 0];
    payload.extend(encode_record(&good).unwrap());

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(&payload).await.unwrap();
    stream.shutdown().await.unwrap();

    let batch = next_batch(&mut server).await;
    assert_eq!(batch.configs, vec![good]);
    assert_eq!(batch.rejected, 1);
}

#[tokio::test]
async fn test_silent_sender_is_cut_off_by_receive_timeout() {
    let mut server = ControlPlaneServer::bind(&loopback_settings()).await.unwrap();
    let addr = server.local_addr();

    let good = WorkerConfig::new(SensorKind::Scc, 0x10, "co2.txt", false, 1);
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(&encode_record(&good).unwrap()).await.unwrap();

    let batch = next_batch(&mut server).await;
    assert_eq!(batch.configs, vec![good]);
    drop(stream);
}
