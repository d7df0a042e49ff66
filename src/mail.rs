use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::Rng;

/// Outbound mail seam. Real delivery belongs to whatever relay the deployment
/// wires in; the server only needs fire-and-forget semantics.
pub trait MailTransport: Send + Sync {
    fn deliver(&self, to: &str, subject: &str, body: &str);
}

/// Default transport: writes the mail to the log instead of an SMTP relay.
struct LogTransport;

impl MailTransport for LogTransport {
    fn deliver(&self, to: &str, subject: &str, body: &str) {
        tracing::info!(to, subject, body, "outbound mail");
    }
}

#[derive(Clone)]
pub struct Mailer {
    transport: Arc<dyn MailTransport>,
}

impl Mailer {
    pub fn log() -> Self {
        Self {
            transport: Arc::new(LogTransport),
        }
    }

    pub fn with_transport(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    pub fn send(&self, to: &str, subject: &str, body: &str) {
        self.transport.deliver(to, subject, body);
    }
}

/// Pending verification codes keyed by email. Lives in process memory for the
/// lifetime of the server; a repeat registration attempt reissues the code.
#[derive(Clone, Default)]
pub struct VerificationCodes {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl VerificationCodes {
    /// Generate and store a fresh 6-digit code for `email`.
    pub fn issue(&self, email: &str) -> String {
        let mut rng = rand::rng();
        let code: String = (0..6)
            .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
            .collect();
        self.inner
            .lock()
            .unwrap()
            .insert(email.to_owned(), code.clone());
        code
    }

    pub fn get(&self, email: &str) -> Option<String> {
        self.inner.lock().unwrap().get(email).cloned()
    }
}
