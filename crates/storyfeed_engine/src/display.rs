use std::io::Write;

/// Output surface that story text is appended to.
///
/// Display is a synchronous side effect and is assumed to succeed; failures
/// are not modeled.
pub trait StoryDisplay: Send + Sync {
    /// Append one story to the surface.
    fn append(&self, text: &str);

    /// Append a whole run in one call; batch delivery uses this.
    fn append_all(&self, texts: &[String]) {
        for text in texts {
            self.append(text);
        }
    }
}

/// Appends stories to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutDisplay;

impl StoryDisplay for StdoutDisplay {
    fn append(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}
