use crate::domain::requirement::Requirement;
use crate::error::AppResult;

pub trait RequirementSource: Send + Sync {
    /// Ordered, non-empty requirement blocks in document order.
    fn extract(&self) -> AppResult<Vec<Requirement>>;
}
