use tracing::warn;

/// Somewhere copied text can go
pub trait Clipboard {
    /// Returns `false` when the text could not be copied.
    fn copy(&mut self, text: &str) -> bool;
}

/// The system clipboard, opened lazily on first use
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&mut self, text: &str) -> bool {
        if self.inner.is_none() {
            match arboard::Clipboard::new() {
                Ok(clipboard) => self.inner = Some(clipboard),
                Err(err) => {
                    warn!(error = %err, "system clipboard unavailable");
                    return false;
                }
            }
        }

        let Some(clipboard) = self.inner.as_mut() else {
            return false;
        };
        match clipboard.set_text(text.to_string()) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "failed to copy to clipboard");
                false
            }
        }
    }
}
