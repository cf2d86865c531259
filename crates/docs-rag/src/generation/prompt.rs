//! Prompt templates for the query pipeline

use crate::types::SearchHit;

/// Identity the assistant answers with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    /// Name the assistant introduces itself with
    pub assistant_name: String,
    /// Who the assistant says developed it
    pub developer: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            assistant_name: "Docs Assistant".to_string(),
            developer: "the docs-rag team".to_string(),
        }
    }
}

/// Prompt builder for RAG queries
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    persona: Persona,
}

impl PromptBuilder {
    pub fn new(persona: Persona) -> Self {
        Self { persona }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// Reply to a short greeting, without any retrieved context
    pub fn greeting(&self, question: &str) -> String {
        format!(
            r#"You are {name}, a friendly assistant that answers questions about the documents it has been given.
The user has just greeted you. Reply with a short, warm greeting, introduce yourself by name in one sentence,
and invite them to ask a question about the documents. Do not invent facts about the documents.
If asked who developed you, say {developer}.

User: {question}

Reply:"#,
            name = self.persona.assistant_name,
            developer = self.persona.developer,
            question = question.trim()
        )
    }

    /// Positive redirect when nothing relevant was retrieved
    pub fn no_context(&self, question: &str) -> String {
        format!(
            r#"You are {name}, a helpful assistant that answers questions using a library of documents.
No passage in the documents matched the user's question closely enough to answer it.
Do not say that nothing was found and do not make up an answer. Instead, in two or three friendly sentences,
acknowledge the topic, suggest how the user could rephrase or narrow the question, and mention what kind of
questions you can help with.
If asked who developed you, say {developer}.

Question:
{question}

Reply:"#,
            name = self.persona.assistant_name,
            developer = self.persona.developer,
            question = question.trim()
        )
    }

    /// Ask the model to pick and order the best `limit` candidates as JSON
    pub fn rerank(&self, question: &str, candidates: &[SearchHit], limit: usize) -> String {
        let snippets = candidates
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("[{}] {}", i + 1, hit.payload.chunk))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"Given the user question below, rerank the following text snippets by how relevant they are to the question.
Return the best {limit} snippets, most relevant first, as a JSON array of objects with keys "chunk" (the snippet
text, copied exactly) and "score" (a number between 0 and 1). Return only the JSON array.

Question: {question}

Snippets:
{snippets}"#,
            limit = limit,
            question = question.trim(),
            snippets = snippets
        )
    }

    /// Final answer prompt over the selected chunks
    pub fn answer<'a>(&self, question: &str, chunks: impl IntoIterator<Item = &'a str>) -> String {
        let context = chunks.into_iter().collect::<Vec<_>>().join("\n\n");

        format!(
            r#"You are {name}, a helpful AI assistant. Use only the following context to answer the user's question.
If unsure, say "Sorry, I don't know."
If asked who developed you, say {developer}.

Context:
{context}

Question:
{question}

Answer:"#,
            name = self.persona.assistant_name,
            developer = self.persona.developer,
            context = context,
            question = question.trim()
        )
    }

    /// Restyle an answer for clarity
    pub fn rewrite(&self, answer: &str) -> String {
        format!(
            "Rewrite the following answer for clarity, keeping it concise and friendly:\n\n{}",
            answer
        )
    }
}
