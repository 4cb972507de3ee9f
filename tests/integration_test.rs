// Integration tests for secure-watch
// These tests drive the public API end to end: configuration, scheduler,
// camera stream, model websocket, notification hook and control API.

use parking_lot::Mutex;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use secure_watch::camera::{FrameSlot, FrameSource};
use secure_watch::config::{Config, Deployment};
use secure_watch::control::{self, ControlPlane};
use secure_watch::detection::{BoundingBox, Detection, DetectionClient, ModelClients, WebSocketClient};
use secure_watch::error::{InferenceError, NotifyError};
use secure_watch::notify::{HttpNotifier, NotificationController, Notifier};
use secure_watch::rules::Notify;
use secure_watch::scheduler::{CameraFeed, Scheduler, StepReport};
use secure_watch::shutdown::Shutdown;

fn config(model_url: &str, camera_url: &str, hook_url: &str, advance_skip: bool) -> String {
    serde_json::json!({
        "modelList": { "yolo": { "url": model_url } },
        "cameraList": [
            {
                "name": "front",
                "url": camera_url,
                "username": "viewer",
                "password": "pw",
                "polygonDict": {
                    "yard": [ {"x": 0, "y": 0}, {"x": 400, "y": 0}, {"x": 400, "y": 400}, {"x": 0, "y": 400} ]
                },
                "notifyList": [{
                    "name": "person-in-yard",
                    "url": hook_url,
                    "username": "",
                    "password": "",
                    "method": "POST",
                    "params": { "camera": "front" },
                    "zoneList": [{
                        "name": "yard",
                        "includeList": [{
                            "name": "person",
                            "models": [[{
                                "name": "yolo", "category": "person", "confidence": 0.5,
                                "minWidth": 10, "maxWidth": 200, "minHeight": 10, "maxHeight": 300,
                                "advanceSkip": advance_skip,
                                "namedPolygon": "yard"
                            }]]
                        }]
                    }]
                }]
            },
            { "name": "back", "url": camera_url, "username": "", "password": "", "notifyList": [] }
        ]
    })
    .to_string()
}

/// Model stand-in answering every frame with one person
struct StaticModel {
    calls: Arc<Mutex<usize>>,
}

impl DetectionClient for StaticModel {
    fn detect(&mut self, _image: &[u8]) -> Result<Vec<Detection>, InferenceError> {
        *self.calls.lock() += 1;
        Ok(vec![Detection::new("person", 0.8, BoundingBox::new(200.0, 200.0, 50.0, 120.0))])
    }

    fn model(&self) -> &str {
        "yolo"
    }
}

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<String>>>);

impl Notifier for Collect {
    fn fire(&self, camera: &str, rule: &Notify) -> Result<(), NotifyError> {
        self.0.lock().push(format!("{}/{}", camera, rule.name));
        Ok(())
    }
}

fn scheduler(deployment: &Deployment, notifier: Collect) -> (Scheduler, Vec<FrameSlot>, Arc<Mutex<usize>>) {
    let calls = Arc::new(Mutex::new(0));
    let mut clients = ModelClients::new();
    clients.insert(Box::new(StaticModel {
        calls: Arc::clone(&calls),
    }));

    let mut slots = Vec::new();
    let feeds = deployment
        .cameras
        .iter()
        .map(|camera| {
            let slot = FrameSlot::new();
            let feed = CameraFeed::new(Arc::clone(camera), slot.reader());
            slots.push(slot);
            feed
        })
        .collect();

    let controller = NotificationController::new(Box::new(notifier));
    (Scheduler::new(feeds, clients, controller), slots, calls)
}

#[test]
fn test_config_driven_round() {
    let doc = config("ws://unused", "http://unused", "http://unused", false);
    let deployment = Config::from_json(&doc).unwrap().build().unwrap();
    let notifier = Collect::default();
    let (mut scheduler, slots, calls) = scheduler(&deployment, notifier.clone());

    slots[0].publish(b"\xFF\xD8frame\xFF\xD9".to_vec());

    assert!(matches!(scheduler.step().unwrap(), StepReport::Evaluated { camera: 0, .. }));
    assert_eq!(scheduler.cursor(), 1);
    assert_eq!(*notifier.0.lock(), vec!["front/person-in-yard".to_string()]);
    assert_eq!(*calls.lock(), 1);

    // Nothing new anywhere: one sleep after a full round
    assert_eq!(scheduler.step().unwrap(), StepReport::Skipped { camera: 1 });
    assert_eq!(scheduler.step().unwrap(), StepReport::Skipped { camera: 0 });
    assert_eq!(scheduler.step().unwrap(), StepReport::Idle);
}

#[test]
fn test_advance_skip_from_config() {
    let doc = config("ws://unused", "http://unused", "http://unused", true);
    let deployment = Config::from_json(&doc).unwrap().build().unwrap();
    let (mut scheduler, slots, _calls) = scheduler(&deployment, Collect::default());

    slots[0].publish(b"one".to_vec());
    scheduler.step().unwrap();
    assert_eq!(scheduler.cursor(), 0);

    slots[0].publish(b"two".to_vec());
    scheduler.step().unwrap();
    assert_eq!(scheduler.cursor(), 1);
}

#[test]
fn test_disabled_camera_skips_inference() {
    let doc = config("ws://unused", "http://unused", "http://unused", false);
    let deployment = Config::from_json(&doc).unwrap().build().unwrap();
    let notifier = Collect::default();
    let (mut scheduler, slots, calls) = scheduler(&deployment, notifier.clone());

    let plane = ControlPlane::new(deployment.cameras.clone());
    plane.set_camera_enabled("front", "disable").unwrap();
    slots[0].publish(b"frame".to_vec());

    assert_eq!(scheduler.step().unwrap(), StepReport::Skipped { camera: 0 });
    assert_eq!(*calls.lock(), 0);
    assert!(notifier.0.lock().is_empty());
}

/// Websocket model service replying with one person per frame
fn spawn_model_service() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut socket = tungstenite::accept(stream).unwrap();
        while let Ok(message) = socket.read() {
            if message.is_binary() {
                let reply = r#"[["person", 0.92, [200, 200, 50, 120]], ["car", 0.9, [50, 50, 100, 60]]]"#;
                if socket.send(tungstenite::Message::Text(reply.to_string())).is_err() {
                    break;
                }
            }
        }
    });

    format!("ws://{}", addr)
}

/// MJPEG camera sending a single frame, then holding the connection
fn spawn_camera() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request);
            let _ = stream.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary=f\r\n\r\n\
                  --f\r\nContent-Type: image/jpeg\r\n\r\n\xFF\xD8jpeg-bytes\xFF\xD9\r\n",
            );
            thread::sleep(Duration::from_secs(2));
        }
    });

    format!("http://{}/video", addr)
}

/// Notification endpoint forwarding each request line to the test
fn spawn_hook() -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            // Headers and form body may arrive in separate reads
            let _ = stream.set_read_timeout(Some(Duration::from_millis(200)));
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while let Ok(n) = stream.read(&mut buf) {
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            if tx.send(String::from_utf8_lossy(&request).to_string()).is_err() {
                break;
            }
        }
    });

    (format!("http://{}/hook", addr), rx)
}

#[test]
fn test_full_pipeline() {
    let model_url = spawn_model_service();
    let camera_url = spawn_camera();
    let (hook_url, hooks) = spawn_hook();

    let doc = config(&model_url, &camera_url, &hook_url, false);
    let deployment = Config::from_json(&doc).unwrap().build().unwrap();
    deployment.camera("back").unwrap().set_enabled(false);

    let mut clients = ModelClients::new();
    clients.insert(Box::new(
        WebSocketClient::connect("yolo", &deployment.models["yolo"], Duration::from_secs(5)).unwrap(),
    ));

    let shutdown = Shutdown::new();
    let mut feeds = Vec::new();
    for camera in &deployment.cameras {
        let slot = FrameSlot::new();
        feeds.push(CameraFeed::new(Arc::clone(camera), slot.reader()));
        FrameSource::new(Arc::clone(camera), slot, shutdown.listener())
            .with_retry_delay(Duration::from_millis(100))
            .spawn()
            .unwrap();
    }

    let listener = shutdown.listener();
    let scheduler = thread::spawn(move || {
        let controller = NotificationController::new(Box::new(HttpNotifier::new(Duration::from_secs(5))));
        Scheduler::new(feeds, clients, controller).run(&listener)
    });

    let request = hooks.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(request.starts_with("POST /hook"));
    assert!(request.contains("camera=front"));

    let front = deployment.camera("front").unwrap();
    assert!(front.flags().triggered);
    assert!(front.rule("person-in-yard").unwrap().flags().last_fired.is_some());

    shutdown.trigger();
    assert!(scheduler.join().unwrap().is_ok());
}

#[test]
fn test_control_api_over_http() {
    let doc = config("ws://unused", "http://unused", "http://unused", false);
    let deployment = Config::from_json(&doc).unwrap().build().unwrap();

    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let shutdown = Shutdown::new();
    let plane = Arc::new(ControlPlane::new(deployment.cameras.clone()));
    let server = control::spawn(plane, addr, shutdown.clone()).unwrap();

    let base = format!("http://{}", addr);
    let answer = ureq::post(&format!("{}/notify/disable/front/person-in-yard", base))
        .call()
        .unwrap()
        .into_string()
        .unwrap();
    assert_eq!(answer, "Ok");
    assert!(!deployment.cameras[0].rules[0].is_enabled());

    let answer = ureq::post(&format!("{}/cam/disable/garage", base))
        .call()
        .unwrap()
        .into_string()
        .unwrap();
    assert_eq!(answer, "Nok");

    let report: serde_json::Value = ureq::post(&format!("{}/enabled", base)).call().unwrap().into_json().unwrap();
    assert_eq!(report["front"]["notifications"]["person-in-yard"], false);
    assert_eq!(report["back"]["enabled"], true);

    shutdown.trigger();
    server.join().unwrap();
}
