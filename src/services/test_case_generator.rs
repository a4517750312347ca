use async_trait::async_trait;

use crate::error::AppResult;

const PROMPT_PREFIX: &str = "Generate software test cases for the following requirement:";

#[async_trait]
pub trait TestCaseGenerator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, requirement: &str) -> AppResult<String>;
}

pub fn test_case_prompt(requirement: &str) -> String {
    format!("{PROMPT_PREFIX}\n{}", requirement.trim())
}

/// Returns the cleaned output, or the reason it cannot be used as test cases.
pub fn usable_output(requirement: &str, output: &str) -> Result<String, String> {
    let cleaned = output.trim();
    if cleaned.is_empty() {
        return Err("model returned no text".to_string());
    }

    let echoed = |candidate: &str| cleaned.eq_ignore_ascii_case(candidate.trim());
    if echoed(requirement) || echoed(&test_case_prompt(requirement)) || echoed(PROMPT_PREFIX) {
        return Err("model echoed its input".to_string());
    }

    Ok(cleaned.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_prompt_with_trimmed_requirement() {
        assert_eq!(
            test_case_prompt("  Users can log in. "),
            "Generate software test cases for the following requirement:\nUsers can log in."
        );
    }

    #[test]
    fn accepts_real_output() {
        assert_eq!(
            usable_output("Users can log in.", "  1. Log in with valid credentials\n"),
            Ok("1. Log in with valid credentials".to_string())
        );
    }

    #[test]
    fn rejects_empty_and_echoed_output() {
        let requirement = "Users can log in.";
        assert!(usable_output(requirement, "   \n").is_err());
        assert!(usable_output(requirement, "users can log in.").is_err());
        assert!(usable_output(requirement, &test_case_prompt(requirement)).is_err());
    }
}
