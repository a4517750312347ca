use std::path::Path;

use crate::domain::requirement::Requirement;
use crate::error::AppResult;
use crate::infra::document;

pub fn run(path: &Path) -> AppResult<Vec<Requirement>> {
    let requirements = document::open(path)?.extract()?;
    tracing::info!(
        count = requirements.len(),
        document = %path.display(),
        "requirements extracted"
    );
    Ok(requirements)
}
