use giftcheck_core::{AnalysisMode, ClassificationResult, Link};

use crate::RemoteError;

/// One way of classifying links. The scheduler picks an implementation per
/// batch and never switches mid-batch.
#[async_trait::async_trait]
pub trait Classifier: Send + Sync {
    fn mode(&self) -> AnalysisMode;

    async fn classify(&self, link: &Link) -> Result<ClassificationResult, RemoteError>;

    /// Classifies consecutive links as one unit, handing each result to
    /// `on_result` in input order as soon as it is known.
    ///
    /// On error, the results already handed over stay valid; the links after
    /// them were not classified. The default classifies one link at a time
    /// and stops at the first error.
    async fn classify_chunk(
        &self,
        links: &[Link],
        on_result: &mut (dyn FnMut(ClassificationResult) + Send),
    ) -> Result<(), RemoteError> {
        for link in links {
            on_result(self.classify(link).await?);
        }
        Ok(())
    }
}
