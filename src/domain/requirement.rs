#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub index: usize,
    pub text: String,
}

impl Requirement {
    /// Builds the ordered requirement list, dropping blocks that are empty after trimming.
    pub fn collect<I, S>(blocks: I) -> Vec<Requirement>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        blocks
            .into_iter()
            .filter_map(|block| {
                let text = block.as_ref().trim();
                (!text.is_empty()).then(|| text.to_string())
            })
            .enumerate()
            .map(|(index, text)| Requirement { index, text })
            .collect()
    }
}
