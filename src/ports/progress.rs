use std::fmt;
use tokio::sync::{broadcast, mpsc};

/// Coarse status notifications emitted at stage boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started { total: usize },
    Processing { position: usize, total: usize },
    SegmentSkipped {
        position: usize,
        segment_id: i64,
        reason: String,
    },
    Encoding { position: usize, total: usize },
    Concatenating { clips: usize },
    Finalizing,
    Completed { clips: usize, skipped: usize },
}

impl ProgressEvent {
    /// Rough completion estimate, `None` for events that do not move the bar.
    pub fn percent(&self) -> Option<u8> {
        let within = |position: usize, total: usize, from: usize, span: usize| {
            let total = total.max(1);
            (from + span * position.min(total) / total) as u8
        };
        match self {
            ProgressEvent::Started { .. } => Some(0),
            ProgressEvent::Processing { position, total } => {
                Some(within(*position, *total, 5, 35))
            }
            ProgressEvent::SegmentSkipped { .. } => None,
            ProgressEvent::Encoding { position, total } => Some(within(*position, *total, 40, 45)),
            ProgressEvent::Concatenating { .. } => Some(90),
            ProgressEvent::Finalizing => Some(95),
            ProgressEvent::Completed { .. } => Some(100),
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Started { total } => {
                write!(f, "Starting video generation ({} segments)...", total)
            }
            ProgressEvent::Processing { position, total } => {
                write!(f, "Processing segment {}/{}...", position + 1, total)
            }
            ProgressEvent::SegmentSkipped {
                position, reason, ..
            } => write!(f, "Skipping segment {}: {}", position + 1, reason),
            ProgressEvent::Encoding { position, total } => {
                write!(f, "Encoding segment {}/{}...", position + 1, total)
            }
            ProgressEvent::Concatenating { clips } => {
                write!(f, "Concatenating {} video segments...", clips)
            }
            ProgressEvent::Finalizing => write!(f, "Finalizing video..."),
            ProgressEvent::Completed { clips, skipped } if *skipped > 0 => write!(
                f,
                "Video ready ({} segments, {} skipped)",
                clips, skipped
            ),
            ProgressEvent::Completed { clips, .. } => {
                write!(f, "Video ready ({} segments)", clips)
            }
        }
    }
}

/// Fire-and-forget progress observer. Must not block.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn notify(&self, event: &ProgressEvent) {
        self(event)
    }
}

impl ProgressSink for broadcast::Sender<ProgressEvent> {
    fn notify(&self, event: &ProgressEvent) {
        // No subscribers is fine.
        let _ = self.send(event.clone());
    }
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn notify(&self, event: &ProgressEvent) {
        let _ = self.send(event.clone());
    }
}
