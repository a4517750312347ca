use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{IssueTrackerService, TestCaseGenerator, VersionControlService};

#[derive(Clone)]
pub struct AppContext {
    pub config: AppConfig,
    pub version_control: Arc<dyn VersionControlService>,
    pub issue_tracker: Arc<dyn IssueTrackerService>,
    pub test_case_generator: Arc<dyn TestCaseGenerator>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        version_control: Arc<dyn VersionControlService>,
        issue_tracker: Arc<dyn IssueTrackerService>,
        test_case_generator: Arc<dyn TestCaseGenerator>,
    ) -> Self {
        Self {
            config,
            version_control,
            issue_tracker,
            test_case_generator,
        }
    }
}
