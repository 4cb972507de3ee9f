/// Notification actions
///
/// What happens when a rule fires. The HTTP notifier is the production one;
/// the dry-run notifier only logs, for offline checks.
use std::time::Duration;

use crate::error::NotifyError;
use crate::rules::{HttpMethod, Notify};
use crate::utils::basic_auth_header;

/// Default request timeout for notification endpoints
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Delivers a fired rule to its target
pub trait Notifier: Send {
    fn fire(&self, camera: &str, rule: &Notify) -> Result<(), NotifyError>;
}

pub struct HttpNotifier {
    agent: ureq::Agent,
}

impl HttpNotifier {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for HttpNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Notifier for HttpNotifier {
    fn fire(&self, camera: &str, rule: &Notify) -> Result<(), NotifyError> {
        let action = &rule.action;
        tracing::info!(
            "Camera {}: firing {} ({:?} {})",
            camera,
            rule.name,
            action.method,
            action.url
        );

        let mut request = match action.method {
            HttpMethod::Get => self.agent.get(&action.url),
            HttpMethod::Post => self.agent.post(&action.url),
        };
        if !action.username.is_empty() {
            request = request.set(
                "Authorization",
                &basic_auth_header(&action.username, &action.password),
            );
        }

        let result = match action.method {
            HttpMethod::Get => action
                .params
                .iter()
                .fold(request, |req, (key, value)| req.query(key, value))
                .call(),
            HttpMethod::Post => {
                let form: Vec<(&str, &str)> = action
                    .params
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                request.send_form(&form)
            }
        };

        match result {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, _)) => Err(NotifyError::BadStatus {
                url: action.url.clone(),
                status,
            }),
            Err(e) => Err(NotifyError::RequestFailed {
                url: action.url.clone(),
                source: Box::new(e),
            }),
        }
    }
}

/// Logs instead of sending
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunNotifier;

impl Notifier for DryRunNotifier {
    fn fire(&self, camera: &str, rule: &Notify) -> Result<(), NotifyError> {
        tracing::info!(
            "[dry run] Camera {}: would fire {} ({:?} {})",
            camera,
            rule.name,
            rule.action.method,
            rule.action.url
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::NotifyAction;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Answers one request with `status`, handing back the raw request text
    fn capture_request(status: &'static str) -> (String, mpsc::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                while let Ok(n) = stream.read(&mut buf) {
                    if n == 0 {
                        break;
                    }
                    raw.extend_from_slice(&buf[..n]);
                }
                let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status);
                let _ = stream.write_all(response.as_bytes());
                let _ = tx.send(String::from_utf8_lossy(&raw).to_string());
            }
        });

        (format!("http://{}/hook", addr), rx)
    }

    fn rule(url: String, method: HttpMethod) -> Notify {
        let action = NotifyAction {
            url,
            username: "admin".to_string(),
            password: "secret".to_string(),
            method,
            params: vec![("event".to_string(), "person at gate".to_string())],
        };
        Notify::new("gate", Vec::new(), action, true)
    }

    #[test]
    fn test_post_sends_form_and_auth() {
        let (url, rx) = capture_request("200 OK");
        HttpNotifier::default().fire("front", &rule(url, HttpMethod::Post)).unwrap();

        let request = rx.recv().unwrap();
        assert!(request.starts_with("POST /hook"));
        assert!(request.contains("Authorization: Basic YWRtaW46c2VjcmV0"));
        assert!(request.contains("event=person+at+gate"));
    }

    #[test]
    fn test_get_sends_query() {
        let (url, rx) = capture_request("200 OK");
        HttpNotifier::default().fire("front", &rule(url, HttpMethod::Get)).unwrap();

        let request = rx.recv().unwrap();
        assert!(request.starts_with("GET /hook?event=person"));
    }

    #[test]
    fn test_error_status() {
        let (url, _rx) = capture_request("500 Internal Server Error");
        let err = HttpNotifier::default()
            .fire("front", &rule(url, HttpMethod::Post))
            .unwrap_err();

        assert!(matches!(err, NotifyError::BadStatus { status: 500, .. }));
    }

    #[test]
    fn test_unreachable_endpoint() {
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{}/hook", port);

        let err = HttpNotifier::new(Duration::from_secs(1))
            .fire("front", &rule(url, HttpMethod::Get))
            .unwrap_err();
        assert!(matches!(err, NotifyError::RequestFailed { .. }));
    }

    #[test]
    fn test_dry_run_never_fails() {
        assert!(DryRunNotifier.fire("front", &rule("http://unused".to_string(), HttpMethod::Post)).is_ok());
    }
}
