//! Off-thread classification requests.
//!
//! Inference runs on the tokio blocking pool so the caller's thread stays
//! responsive. Each request produces exactly one outcome: a ticket resolves
//! once, and a callback is invoked once.

use crate::error::{Error, Result};
use crate::imaging::PixelImage;
use crate::inference::{BirdClassifier, Classification};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

/// Handle to one pending classification.
#[must_use = "a ticket does nothing unless waited on"]
pub struct ClassificationTicket<T = Classification> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> ClassificationTicket<T> {
    /// Wait for the result from async code.
    ///
    /// # Errors
    /// The classification error, or [`Error::TaskFailed`] if the worker
    /// ended without reporting.
    pub async fn wait(self) -> Result<T> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(worker_lost()),
        }
    }

    /// Wait for the result from a plain thread.
    ///
    /// Must not be called from inside the runtime.
    ///
    /// # Errors
    /// Same as [`Self::wait`].
    pub fn blocking_wait(self) -> Result<T> {
        match self.rx.blocking_recv() {
            Ok(result) => result,
            Err(_) => Err(worker_lost()),
        }
    }
}

fn worker_lost() -> Error {
    Error::TaskFailed {
        reason: "classification worker ended without a result".to_string(),
    }
}

/// Runs classifications for a shared classifier on a tokio runtime.
#[derive(Clone)]
pub struct ClassificationService {
    classifier: Arc<BirdClassifier>,
    handle: Handle,
}

impl ClassificationService {
    /// Create a service that schedules work on `handle`.
    pub fn new(classifier: Arc<BirdClassifier>, handle: Handle) -> Self {
        Self { classifier, handle }
    }

    /// Create a service on the runtime of the calling context.
    ///
    /// # Errors
    /// Returns [`Error::Internal`] when called outside a tokio runtime.
    pub fn current(classifier: Arc<BirdClassifier>) -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| Error::Internal {
            message: format!("no tokio runtime: {e}"),
        })?;
        Ok(Self::new(classifier, handle))
    }

    /// Shared classifier.
    #[must_use]
    pub fn classifier(&self) -> &BirdClassifier {
        &self.classifier
    }

    /// Schedule classification of one image.
    pub fn submit(&self, image: Option<PixelImage>) -> ClassificationTicket {
        self.spawn(move |classifier| classifier.classify_image(image.as_ref()))
    }

    /// Schedule a top-`k` classification of one image.
    pub fn submit_ranked(
        &self,
        image: Option<PixelImage>,
        k: usize,
    ) -> ClassificationTicket<Vec<Classification>> {
        self.spawn(move |classifier| classifier.classify_ranked(image.as_ref(), k))
    }

    /// Schedule a top-`k` classification of several images in one forward
    /// pass. The ticket yields one ranked list per image, in input order.
    pub fn submit_ranked_batch(
        &self,
        images: Vec<PixelImage>,
        k: usize,
    ) -> ClassificationTicket<Vec<Vec<Classification>>> {
        self.spawn(move |classifier| classifier.classify_ranked_batch(&images, k))
    }

    /// Classify one image and await the result.
    ///
    /// # Errors
    /// Same as [`ClassificationTicket::wait`].
    pub async fn classify(&self, image: Option<PixelImage>) -> Result<Classification> {
        self.submit(image).wait().await
    }

    /// Classify one image and hand `(label, probability)` to `on_complete`.
    ///
    /// Errors and worker panics are logged and delivered as the
    /// "Not found" sentinel. The callback runs exactly once, normally on a
    /// blocking pool thread. If the runtime has shut down and drops the
    /// task unrun, the sentinel is delivered on the dropping thread.
    pub fn submit_with_callback<F>(&self, image: Option<PixelImage>, on_complete: F)
    where
        F: FnOnce(String, f32) + Send + 'static,
    {
        let classifier = Arc::clone(&self.classifier);
        let callback = CallbackOnce::new(on_complete);
        self.handle.spawn_blocking(move || {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                classifier.classify_image(image.as_ref())
            }))
            .unwrap_or_else(|_| Err(worker_lost()));

            callback.deliver(or_sentinel(outcome));
        });
    }

    fn spawn<T, F>(&self, work: F) -> ClassificationTicket<T>
    where
        T: Send + 'static,
        F: FnOnce(&BirdClassifier) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let classifier = Arc::clone(&self.classifier);
        self.handle.spawn_blocking(move || {
            // A panic drops `tx`, which the ticket reports as TaskFailed.
            let result = work(&classifier);
            if tx.send(result).is_err() {
                debug!("Classification finished after its ticket was dropped");
            }
        });
        ClassificationTicket { rx }
    }
}

/// Callback that fires exactly once: with the result when delivered, or
/// with the sentinel when dropped undelivered.
struct CallbackOnce<F: FnOnce(String, f32)> {
    on_complete: Option<F>,
}

impl<F: FnOnce(String, f32)> CallbackOnce<F> {
    fn new(on_complete: F) -> Self {
        Self {
            on_complete: Some(on_complete),
        }
    }

    fn deliver(mut self, classification: Classification) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete(classification.label, classification.probability);
        }
    }
}

impl<F: FnOnce(String, f32)> Drop for CallbackOnce<F> {
    fn drop(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            warn!("Classification task dropped before it ran; reporting no result");
            let sentinel = Classification::not_found();
            on_complete(sentinel.label, sentinel.probability);
        }
    }
}

/// Collapse a classification outcome to a value, logging any error.
pub fn or_sentinel(result: Result<Classification>) -> Classification {
    result.unwrap_or_else(|e| {
        error!("Classification failed: {e}");
        Classification::not_found()
    })
}
