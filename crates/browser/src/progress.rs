//! Throttled download progress reporting.

use std::{sync::Arc, time::Duration};

use tracing::info;

/// Where progress messages go. The CLI installs a terminal sink; everything
/// else gets the logging sink.
pub trait StatusSink: Send + Sync {
    fn set_status(&self, message: &str);
    /// Show a message that should disappear after `duration`.
    fn set_status_timed(&self, message: &str, duration: Duration);
    fn clear(&self);
}

/// Sink that forwards status messages to the log.
#[derive(Debug, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn set_status(&self, message: &str) {
        info!("{message}");
    }

    fn set_status_timed(&self, message: &str, _duration: Duration) {
        info!("{message}");
    }

    fn clear(&self) {}
}

/// Percent-quantized progress reporter for a single download.
///
/// Only whole-percent changes are forwarded to the sink, so a byte-granular
/// download loop cannot flood it. Dropping an incomplete reporter clears the
/// sink; a completed one leaves its final message up briefly.
pub struct DownloadProgress {
    label: String,
    sink: Arc<dyn StatusSink>,
    last_percent: Option<u32>,
    completed: bool,
}

const COMPLETE_MESSAGE_DURATION: Duration = Duration::from_millis(5000);

impl DownloadProgress {
    pub fn new(label: impl Into<String>, sink: Arc<dyn StatusSink>) -> Self {
        let label = label.into();
        sink.set_status(&format!("Installing {label} ..."));
        Self {
            label,
            sink,
            last_percent: None,
            completed: false,
        }
    }

    /// Report downloaded bytes. With an unknown total no percentage can be
    /// computed and the initial message stays up.
    pub fn report(&mut self, downloaded: u64, total: Option<u64>) {
        let Some(total) = total.filter(|t| *t > 0) else {
            return;
        };
        let percent = ((downloaded.min(total) as f64 / total as f64) * 100.0).floor() as u32;
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);
        self.sink
            .set_status(&format!("Installing {} ... {percent}%", self.label));
    }

    /// Mark the download finished and show a short-lived completion message.
    pub fn complete(&mut self) {
        self.completed = true;
        self.sink.set_status_timed(
            &format!("Installed {}", self.label),
            COMPLETE_MESSAGE_DURATION,
        );
    }
}

impl Drop for DownloadProgress {
    fn drop(&mut self) {
        if !self.completed {
            self.sink.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        messages: Mutex<Vec<String>>,
        cleared: Mutex<bool>,
    }

    impl StatusSink for RecordingSink {
        fn set_status(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }

        fn set_status_timed(&self, message: &str, _duration: Duration) {
            self.messages.lock().unwrap().push(message.to_string());
        }

        fn clear(&self) {
            *self.cleared.lock().unwrap() = true;
        }
    }

    #[test]
    fn quantizes_and_dedupes_percentages() {
        let sink = Arc::new(RecordingSink::default());
        let mut progress = DownloadProgress::new("chrome 140.0.7339.82", sink.clone());

        // Sub-percent increments collapse into one message per whole percent.
        progress.report(100, Some(100_000));
        progress.report(150, Some(100_000));
        progress.report(999, Some(100_000));
        progress.report(1_000, Some(100_000));
        progress.report(50_000, Some(100_000));
        progress.report(100_000, Some(100_000));

        let messages = sink.messages.lock().unwrap();
        assert_eq!(
            *messages,
            vec![
                "Installing chrome 140.0.7339.82 ...".to_string(),
                "Installing chrome 140.0.7339.82 ... 0%".to_string(),
                "Installing chrome 140.0.7339.82 ... 1%".to_string(),
                "Installing chrome 140.0.7339.82 ... 50%".to_string(),
                "Installing chrome 140.0.7339.82 ... 100%".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_total_reports_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let mut progress = DownloadProgress::new("chromium 722234", sink.clone());
        progress.report(4096, None);
        progress.report(8192, Some(0));
        assert_eq!(sink.messages.lock().unwrap().len(), 1);
    }

    #[test]
    fn incomplete_drop_clears_sink() {
        let sink = Arc::new(RecordingSink::default());
        {
            let mut progress = DownloadProgress::new("chrome beta", sink.clone());
            progress.report(1, Some(10));
        }
        assert!(*sink.cleared.lock().unwrap());
    }

    #[test]
    fn complete_leaves_message_up() {
        let sink = Arc::new(RecordingSink::default());
        {
            let mut progress = DownloadProgress::new("chrome beta", sink.clone());
            progress.report(10, Some(10));
            progress.complete();
        }
        assert!(!*sink.cleared.lock().unwrap());
        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.last().map(String::as_str), Some("Installed chrome beta"));
    }
}
