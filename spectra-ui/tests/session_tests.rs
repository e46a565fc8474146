//! End-to-end session tests against a mock Socket.IO server

mod helpers;

use std::time::Duration;

use serde_json::{json, Value};
use spectra_common::cookies::{CookieJar, LAST_DIRECTORY};
use spectra_common::packet::EngineIoVersion;
use spectra_ui::view::downloader::ActiveView;
use spectra_ui::view::{
    AnalyzerCommand, AnalyzerView, DownloaderCommand, DownloaderView, StatusClass,
    DISCONNECTED_ALERT,
};
use spectra_ui::{run_session, Channel, ChannelEvent, Presenter, SessionEnd};
use tokio::sync::mpsc;
use tokio::time::timeout;

use helpers::{MockServer, RecordingPresenter, Reply};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn analyzer_script(event: &str, payload: &Value) -> Reply {
    match event {
        "change_path" => Reply::none().emit(
            "directory_info",
            json!({
                "invalid": false,
                "path": payload,
                "directory": [
                    {"is_file": false, "name": "..", "path": "/"},
                    {"is_file": true, "name": "a.fits", "path": "/data/a.fits",
                     "size": "8.80 kB", "modified": "19:51:59 01. 02. 2017", "selected": true}
                ]
            }),
        ),
        "analyze_file" => Reply::none()
            .emit(
                "file_analyzed",
                json!({
                    "invalid": false,
                    "file_name": "a.fits",
                    "spectrum_img": "AAAA",
                    "cwt_img": "BBBB",
                    "transformation_img": "CCCC",
                    "freq0": 0,
                    "wSize": 0,
                    "scales": 12
                }),
            )
            .then_close(),
        _ => Reply::none(),
    }
}

#[tokio::test]
async fn test_analyzer_session_end_to_end() {
    let server = MockServer::builder(analyzer_script).start().await;
    let config = server.config(EngineIoVersion::V4);

    let channel = Channel::connect(&config, "/analyzer", None)
        .await
        .expect("connect failed");
    assert_eq!(channel.handshake().sid, "mock-sid");

    let (tx, rx) = mpsc::channel(4);
    tx.send(AnalyzerCommand::FollowPath("/data".to_string()))
        .await
        .unwrap();

    let (view, presenter, end) = timeout(
        TEST_TIMEOUT,
        run_session(AnalyzerView::new(), channel, rx, RecordingPresenter::default()),
    )
    .await
    .expect("session timed out");

    assert!(matches!(end, SessionEnd::Disconnected(_)));
    assert_eq!(view.path_field, "/data");
    assert_eq!(view.listing.len(), 2);
    assert!(view.analysis_visible);
    assert_eq!(view.scales, Some(12));
    assert_eq!(view.freq0.max, 11);
    assert_eq!(presenter.alerts, vec![DISCONNECTED_ALERT.to_string()]);
    assert!(presenter.presented >= 3);

    let received = server.received();
    assert!(received.contains(&"40/analyzer,".to_string()));
    assert!(received.contains(&r#"42/analyzer,["change_path","/data"]"#.to_string()));
    let analyze: Vec<&String> = received
        .iter()
        .filter(|frame| frame.starts_with(r#"42/analyzer,["analyze_file""#))
        .collect();
    assert_eq!(analyze, vec![r#"42/analyzer,["analyze_file","/data/a.fits"]"#]);
    drop(tx);
}

#[tokio::test]
async fn test_session_ends_when_input_closes() {
    let server = MockServer::builder(|_, _| Reply::none()).start().await;
    let config = server.config(EngineIoVersion::V4);
    let channel = Channel::connect(&config, "/analyzer", None).await.unwrap();

    let (tx, rx) = mpsc::channel::<AnalyzerCommand>(1);
    drop(tx);
    let (_, presenter, end) = timeout(
        TEST_TIMEOUT,
        run_session(AnalyzerView::new(), channel, rx, RecordingPresenter::default()),
    )
    .await
    .unwrap();

    assert_eq!(end, SessionEnd::InputClosed);
    assert!(presenter.alerts.is_empty());
}

#[tokio::test]
async fn test_rejected_command_is_alerted() {
    let server = MockServer::builder(|_, _| Reply::none()).start().await;
    let config = server.config(EngineIoVersion::V4);
    let channel = Channel::connect(&config, "/analyzer", None).await.unwrap();

    let (tx, rx) = mpsc::channel(2);
    tx.send(AnalyzerCommand::SetFreq0(3)).await.unwrap();
    drop(tx);
    let (view, presenter, _) = timeout(
        TEST_TIMEOUT,
        run_session(AnalyzerView::new(), channel, rx, RecordingPresenter::default()),
    )
    .await
    .unwrap();

    assert_eq!(presenter.alerts.len(), 1);
    assert_eq!(view.freq0.value, 0);
    assert!(!server
        .received()
        .iter()
        .any(|frame| frame.contains("slider_changed")));
}

/// Presenter that starts the download once the VOTABLE is parsed
struct DownloadDriver {
    commands: mpsc::Sender<DownloaderCommand>,
    started: bool,
    alerts: Vec<String>,
}

impl Presenter<DownloaderView> for DownloadDriver {
    fn present(&mut self, view: &DownloaderView) {
        if !self.started && view.votable_selected && view.parse_success {
            self.started = true;
            let _ = self.commands.try_send(DownloaderCommand::Download);
        }
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

fn downloader_script(event: &str, _payload: &Value) -> Reply {
    match event {
        "votable_url" => Reply::none().emit(
            "votable_parsed",
            json!({
                "success": true,
                "link_known": true,
                "link": "http://archive.example/ssap",
                "record_count": 2,
                "query_status": "OK",
                "spectra": [[0, "spec-a"], [1, "spec-b"]],
                "datalink_available": false
            }),
        ),
        "download_spectra" => Reply::none()
            .emit(
                "spectrum_downloaded",
                json!({
                    "file_name": "spec-a.fits",
                    "url": "http://archive.example/a",
                    "success": true
                }),
            )
            .emit(
                "spectrum_downloaded",
                json!({
                    "file_name": "spec-b.fits",
                    "url": "http://archive.example/b",
                    "success": true
                }),
            )
            .emit("spectra_downloaded", json!(true))
            .then_close(),
        _ => Reply::none(),
    }
}

#[tokio::test]
async fn test_downloader_session_end_to_end() {
    let server = MockServer::builder(downloader_script).start().await;
    let config = server.config(EngineIoVersion::V4);

    let mut cookies = CookieJar::in_memory();
    cookies.set(LAST_DIRECTORY, "/tmp/out").unwrap();
    let header = cookies.header_value();
    let channel = Channel::connect(&config, "/downloader", header.as_deref())
        .await
        .expect("connect failed");

    let (tx, rx) = mpsc::channel(4);
    tx.send(DownloaderCommand::ProcessUrl(
        "http://archive.example/ssap".to_string(),
    ))
    .await
    .unwrap();
    let driver = DownloadDriver {
        commands: tx,
        started: false,
        alerts: Vec::new(),
    };

    let (view, driver, end) = timeout(
        TEST_TIMEOUT,
        run_session(DownloaderView::new(cookies), channel, rx, driver),
    )
    .await
    .expect("session timed out");

    assert!(matches!(end, SessionEnd::Disconnected(_)));
    assert!(driver.started);
    assert_eq!(driver.alerts, vec![DISCONNECTED_ALERT.to_string()]);
    assert_eq!(view.active_view, ActiveView::Download);
    assert_eq!(view.download_log.len(), 2);
    assert_eq!(
        view.download_status.as_ref().map(|status| status.class),
        Some(StatusClass::Success)
    );
    assert!(!view.download_progress_visible);

    assert_eq!(server.cookies(), vec!["last-directory=%2Ftmp%2Fout".to_string()]);
    let received = server.received();
    assert!(received.contains(
        &r#"42/downloader,["votable_url","http://archive.example/ssap"]"#.to_string()
    ));
    let download = received
        .iter()
        .find(|frame| frame.starts_with(r#"42/downloader,["download_spectra""#))
        .expect("no download request");
    let args: Value = serde_json::from_str(download.trim_start_matches("42/downloader,")).unwrap();
    assert_eq!(
        args,
        json!(["download_spectra", {
            "spectra": ["0"],
            "use-datalink": false,
            "directory": "/tmp/out"
        }])
    );
}

#[tokio::test]
async fn test_refused_namespace() {
    let server = MockServer::builder(|_, _| Reply::none())
        .refuse("Not authorized")
        .start()
        .await;
    let config = server.config(EngineIoVersion::V4);

    let error = Channel::connect(&config, "/downloader", None)
        .await
        .err()
        .expect("connect should fail");
    assert!(error.to_string().contains("Not authorized"));
}

#[tokio::test]
async fn test_v4_client_answers_server_ping() {
    let server = MockServer::builder(|_, _| Reply::none())
        .server_pings()
        .start()
        .await;
    let config = server.config(EngineIoVersion::V4);
    let _channel = Channel::connect(&config, "/analyzer", None).await.unwrap();

    assert!(
        server
            .wait_for(|frame| frame == "3", Duration::from_secs(5))
            .await
    );
}

#[tokio::test]
async fn test_v3_client_sends_heartbeat() {
    let server = MockServer::builder(|_, _| Reply::none())
        .ping_interval(50)
        .start()
        .await;
    let config = server.config(EngineIoVersion::V3);
    let _channel = Channel::connect(&config, "/analyzer", None).await.unwrap();

    assert!(
        server
            .wait_for(|frame| frame == "2", Duration::from_secs(5))
            .await
    );
}

fn initial_listing() -> Value {
    json!({
        "invalid": false,
        "path": "/home/user",
        "directory": [
            {"is_file": false, "name": "..", "path": "/home"},
            {"is_file": true, "name": "b.fits", "path": "/home/user/b.fits",
             "size": "1.20 kB", "modified": "08:00:00 03. 04. 2018", "selected": true}
        ]
    })
}

#[tokio::test]
async fn test_event_sent_before_namespace_ack_is_delivered_first() {
    let server = MockServer::builder(|_, _| Reply::none())
        .emit_on_connect("directory_info", initial_listing())
        .start()
        .await;
    let config = server.config(EngineIoVersion::V4);
    let mut channel = Channel::connect(&config, "/analyzer", None).await.unwrap();

    let first = timeout(Duration::from_secs(2), channel.next_event())
        .await
        .expect("no event after connect");
    assert_eq!(
        first,
        ChannelEvent::Message {
            event: "directory_info".to_string(),
            payload: initial_listing(),
        }
    );
}

#[tokio::test]
async fn test_analyzer_shows_listing_pushed_on_connect() {
    let server = MockServer::builder(|event, _| match event {
        "analyze_file" => Reply::none()
            .emit(
                "file_analyzed",
                json!({"invalid": false, "file_name": "b.fits", "scales": 8}),
            )
            .then_close(),
        _ => Reply::none(),
    })
    .emit_on_connect("directory_info", initial_listing())
    .start()
    .await;
    let config = server.config(EngineIoVersion::V4);
    let channel = Channel::connect(&config, "/analyzer", None).await.unwrap();

    let (tx, rx) = mpsc::channel::<AnalyzerCommand>(1);
    let (view, _, end) = timeout(
        TEST_TIMEOUT,
        run_session(AnalyzerView::new(), channel, rx, RecordingPresenter::default()),
    )
    .await
    .expect("session timed out");

    assert!(matches!(end, SessionEnd::Disconnected(_)));
    assert_eq!(view.path_field, "/home/user");
    assert_eq!(view.listing.len(), 2);
    assert_eq!(view.spectrum_name, "b.fits");
    assert!(server
        .received()
        .contains(&r#"42/analyzer,["analyze_file","/home/user/b.fits"]"#.to_string()));
    drop(tx);
}
