use crate::{
    AnalysisMode, BatchProgress, Category, ClassificationResult, Link, ResultStatus,
    SessionState, Statistics, SubmitStats,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub session: SessionState,
    pub mode: Option<AnalysisMode>,
    pub progress: BatchProgress,
    pub link_count: usize,
    pub statistics: Statistics,
    /// Current page of filtered, sorted results.
    pub rows: Vec<ResultRowView>,
    pub page: usize,
    pub total_pages: usize,
    /// Results passing the filter, across all pages.
    pub matching: usize,
    pub last_submit: Option<SubmitStats>,
    pub last_error: Option<String>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRowView {
    pub link: Link,
    pub status: ResultStatus,
    pub category: Category,
    pub privileged: bool,
    pub status_text: String,
    pub gift_type: Option<String>,
    pub price: Option<f64>,
    pub sender_name: Option<String>,
    pub expire_date: Option<String>,
}

impl From<&ClassificationResult> for ResultRowView {
    fn from(result: &ClassificationResult) -> Self {
        Self {
            link: result.link.clone(),
            status: result.status,
            category: result.category,
            privileged: result.privileged,
            status_text: result.status_text(),
            gift_type: result.attributes.gift_type.clone(),
            price: result.attributes.price,
            sender_name: result.attributes.sender_name.clone(),
            expire_date: result.attributes.expire_date.clone(),
        }
    }
}
