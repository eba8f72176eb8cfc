//! Question-answering prompt over supplied context.

/// System rules for answering strictly from the supplied context.
pub const TEXT_QA_SYSTEM_PROMPT: &str = "You are an expert Q&A system that is trusted around the world.\n\
Always answer the query using the provided context information, and not prior knowledge.\n\
Some rules to follow:\n\
1. Never directly reference the given context in your answer.\n\
2. Avoid statements like 'Based on the context, ...' or 'The context information ...' or anything along those lines.";

/// A rendered question-answering prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQaPrompt {
    pub system: String,
    pub user: String,
}

impl TextQaPrompt {
    /// Fills the template with `context` and `query`.
    #[must_use]
    pub fn new(context: &str, query: &str) -> Self {
        Self {
            system: TEXT_QA_SYSTEM_PROMPT.to_string(),
            user: format!(
                "Context information is below.\n\
                 ---------------------\n\
                 {context}\n\
                 ---------------------\n\
                 Given the context information and not prior knowledge, answer the query.\n\
                 Query: {query}\n\
                 Answer: "
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_places_context_and_query() {
        let prompt = TextQaPrompt::new("[{\"subject\":\"Hi\"}]", "What are the subjects?");

        assert_eq!(
            prompt.user,
            "Context information is below.\n\
             ---------------------\n\
             [{\"subject\":\"Hi\"}]\n\
             ---------------------\n\
             Given the context information and not prior knowledge, answer the query.\n\
             Query: What are the subjects?\n\
             Answer: "
        );
        assert!(prompt.system.starts_with("You are an expert Q&A system"));
    }

    #[test]
    fn test_braces_in_context_are_kept_verbatim() {
        let prompt = TextQaPrompt::new("{query}", "q");
        assert!(prompt.user.contains("\n{query}\n"));
        assert!(prompt.user.contains("Query: q\n"));
    }
}
