//! Latest-wins preview worker.
//!
//! The GUI requests a replacement preview on every edit; only the newest
//! request matters. Each submission bumps a shared epoch and queues a job;
//! the worker drops any job whose epoch is no longer current, both before
//! and after the (potentially slow) rewrite, so a superseded preview never
//! overwrites a newer one.

use lexishift_core::{LowercaseNormalizer, Replacer, VocabDataset, VocabPool};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutcome {
    Completed {
        epoch: u64,
        text: String,
        /// Character spans of replacements within the rewritten text.
        spans: Vec<(usize, usize)>,
    },
    /// A newer request superseded this one before it finished.
    ConcurrencyLost { epoch: u64 },
}

struct PreviewJob {
    epoch: u64,
    text: String,
    reply: mpsc::Sender<PreviewOutcome>,
}

pub struct PreviewService {
    epoch: Arc<AtomicU64>,
    tx: Option<mpsc::Sender<PreviewJob>>,
    handle: Option<JoinHandle<()>>,
}

impl PreviewService {
    /// Compile the dataset on a worker thread and start serving previews.
    pub fn spawn(dataset: VocabDataset) -> Self {
        let epoch = Arc::new(AtomicU64::new(0));
        let latest = Arc::clone(&epoch);
        let (tx, rx) = mpsc::channel::<PreviewJob>();

        let handle = thread::spawn(move || {
            let pool = VocabPool::compile(&dataset, LowercaseNormalizer);
            let replacer = Replacer::new(&pool);
            for job in rx {
                if job.epoch != latest.load(Ordering::SeqCst) {
                    debug!(epoch = job.epoch, "dropping stale preview before rewrite");
                    let _ = job.reply.send(PreviewOutcome::ConcurrencyLost { epoch: job.epoch });
                    continue;
                }
                let (text, spans) = replacer.replace_with_spans(&job.text);
                // a newer submission may have landed during the rewrite
                let outcome = if job.epoch != latest.load(Ordering::SeqCst) {
                    PreviewOutcome::ConcurrencyLost { epoch: job.epoch }
                } else {
                    PreviewOutcome::Completed {
                        epoch: job.epoch,
                        text,
                        spans: spans
                            .iter()
                            .map(|s| (s.start_char, s.end_char))
                            .collect(),
                    }
                };
                let _ = job.reply.send(outcome);
            }
        });

        Self {
            epoch,
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    /// Queue a preview; the returned receiver yields exactly one outcome.
    pub fn submit<T: Into<String>>(&self, text: T) -> mpsc::Receiver<PreviewOutcome> {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let (reply, receiver) = mpsc::channel();
        if let Some(tx) = &self.tx {
            let _ = tx.send(PreviewJob {
                epoch,
                text: text.into(),
                reply,
            });
        }
        receiver
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }
}

impl Drop for PreviewService {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexishift_core::VocabRule;

    fn dataset() -> VocabDataset {
        VocabDataset::new(vec![VocabRule::new("cat", "neko")])
    }

    #[test]
    fn sequential_previews_complete() {
        let service = PreviewService::spawn(dataset());
        let first = service.submit("the cat sat").recv().unwrap();
        match first {
            PreviewOutcome::Completed { text, spans, .. } => {
                assert_eq!(text, "the neko sat");
                assert_eq!(spans, vec![(4, 8)]);
            }
            PreviewOutcome::ConcurrencyLost { .. } => panic!("sole request lost"),
        }

        let second = service.submit("no matches here").recv().unwrap();
        match second {
            PreviewOutcome::Completed { text, spans, .. } => {
                assert_eq!(text, "no matches here");
                assert!(spans.is_empty());
            }
            PreviewOutcome::ConcurrencyLost { .. } => panic!("sole request lost"),
        }
    }

    #[test]
    fn newest_request_always_wins() {
        let service = PreviewService::spawn(dataset());
        let stale = service.submit("cat one");
        let fresh = service.submit("cat two");

        // the superseding request must complete
        match fresh.recv().unwrap() {
            PreviewOutcome::Completed { text, .. } => assert_eq!(text, "neko two"),
            PreviewOutcome::ConcurrencyLost { .. } => panic!("newest request lost"),
        }
        // the first either finished before the second arrived or was
        // dropped; it must never report the second's epoch
        match stale.recv().unwrap() {
            PreviewOutcome::Completed { epoch, .. } => assert_eq!(epoch, 1),
            PreviewOutcome::ConcurrencyLost { epoch } => assert_eq!(epoch, 1),
        }
    }

    #[test]
    fn epoch_advances_per_submission() {
        let service = PreviewService::spawn(dataset());
        assert_eq!(service.current_epoch(), 0);
        let _ = service.submit("a");
        let _ = service.submit("b");
        assert_eq!(service.current_epoch(), 2);
    }
}
