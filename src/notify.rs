use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Error,
}

/// Transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub text: String,
}

/// Cloneable handle background tasks use to report outcomes to the user.
#[derive(Debug, Clone)]
pub struct Toaster {
    tx: mpsc::UnboundedSender<Toast>,
}

pub fn toast_channel() -> (Toaster, mpsc::UnboundedReceiver<Toast>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Toaster { tx }, rx)
}

impl Toaster {
    pub fn info(&self, text: impl Into<String>) {
        self.push(ToastLevel::Info, text.into());
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(ToastLevel::Error, text.into());
    }

    fn push(&self, level: ToastLevel, text: String) {
        if self.tx.send(Toast { level, text }).is_err() {
            trace!("toast dropped; nobody is listening");
        }
    }
}
