use super::{ClassificationProvider, SegmentationProvider};
use crate::error::InferenceError;
use crate::pipeline::types::{
    ClassificationOutcome, DecodedImage, Mask, SeedPoint, SegmentationOutcome,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Serialises access to a shared accelerator. Callers beyond the permit count wait in
/// FIFO order instead of failing.
///
/// Each call runs on its own task that owns the permit. A caller that gives up early
/// detaches from that task, and the device stays reserved until the work really ends.
pub struct DeviceLimited<P> {
    inner: Arc<P>,
    permits: Arc<Semaphore>,
}

impl<P> DeviceLimited<P> {
    pub fn new(inner: P, concurrency: usize) -> Self {
        Self::sharing(inner, Arc::new(Semaphore::new(concurrency.max(1))))
    }

    /// Several providers running on the same device share one semaphore.
    pub fn sharing(inner: P, permits: Arc<Semaphore>) -> Self {
        Self {
            inner: Arc::new(inner),
            permits,
        }
    }

    pub fn permits(&self) -> Arc<Semaphore> {
        Arc::clone(&self.permits)
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, InferenceError> {
        if self.permits.available_permits() == 0 {
            debug!("Inference device busy, queueing request");
        }
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| InferenceError::DeviceUnavailable(e.to_string()))
    }
}

fn device_task_failed(error: tokio::task::JoinError) -> InferenceError {
    InferenceError::DeviceUnavailable(format!("device task failed: {error}"))
}

#[async_trait]
impl<P: SegmentationProvider + 'static> SegmentationProvider for DeviceLimited<P> {
    async fn segment(
        &self,
        image: &DecodedImage,
        seed: SeedPoint,
    ) -> Result<SegmentationOutcome, InferenceError> {
        let permit = self.acquire().await?;
        let inner = Arc::clone(&self.inner);
        let image = image.clone();
        tokio::spawn(async move {
            let _permit = permit;
            inner.segment(&image, seed).await
        })
        .await
        .map_err(device_task_failed)?
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[async_trait]
impl<P: ClassificationProvider + 'static> ClassificationProvider for DeviceLimited<P> {
    async fn classify(
        &self,
        image: &DecodedImage,
        mask: &Mask,
    ) -> Result<ClassificationOutcome, InferenceError> {
        let permit = self.acquire().await?;
        let inner = Arc::clone(&self.inner);
        let image = image.clone();
        let mask = mask.clone();
        tokio::spawn(async move {
            let _permit = permit;
            inner.classify(&image, &mask).await
        })
        .await
        .map_err(device_task_failed)?
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::solid_image;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct ConcurrencyTracker {
        active: AtomicUsize,
        peak: AtomicUsize,
        finished: AtomicUsize,
        delay_ms: u64,
    }

    #[async_trait]
    impl SegmentationProvider for ConcurrencyTracker {
        async fn segment(
            &self,
            image: &DecodedImage,
            _seed: SeedPoint,
        ) -> Result<SegmentationOutcome, InferenceError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.delay_ms.max(10))).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(SegmentationOutcome::new(
                Mask::full(image.width(), image.height()),
                1.0,
            ))
        }

        fn name(&self) -> &'static str {
            "ConcurrencyTracker"
        }
    }

    #[tokio::test]
    async fn single_permit_serialises_calls() {
        let tracker = Arc::new(ConcurrencyTracker::default());
        let limited = Arc::new(DeviceLimited::new(Arc::clone(&tracker), 1));
        let image = solid_image(64, 64, [0, 0, 0]);

        let mut tasks = Vec::new();
        for _ in 0..5 {
            let limited = Arc::clone(&limited);
            let image = image.clone();
            tasks.push(tokio::spawn(async move {
                limited.segment(&image, image.center()).await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn closed_device_is_an_inference_error() {
        let limited = DeviceLimited::new(ConcurrencyTracker::default(), 1);
        limited.permits().close();
        let image = solid_image(64, 64, [0, 0, 0]);
        let result = limited.segment(&image, image.center()).await;
        assert!(matches!(result, Err(InferenceError::DeviceUnavailable(_))));
    }

    #[tokio::test]
    async fn abandoned_call_keeps_the_device_until_the_work_ends() {
        let tracker = Arc::new(ConcurrencyTracker {
            delay_ms: 100,
            ..Default::default()
        });
        let limited = DeviceLimited::new(Arc::clone(&tracker), 1);
        let image = solid_image(64, 64, [0, 0, 0]);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(5),
            limited.segment(&image, image.center()),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(limited.permits().available_permits(), 0);

        // The next caller queues behind the detached call instead of overlapping it.
        assert!(limited.segment(&image, image.center()).await.is_ok());
        assert_eq!(tracker.finished.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 1);
        assert_eq!(limited.permits().available_permits(), 1);
    }
}
