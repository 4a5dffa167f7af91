//! Prompt builder: fixed legal system instruction + per-turn user prompt.

/// System instructions for answer generation.
pub const LEGAL_SYSTEM_PROMPT: &str = "You are a legal assistant specializing in Indian constitutional law and human rights.

Your knowledge domains:
- Indian Constitution (Articles, Amendments, Schedules)
- Fundamental Rights (Articles 12-35)
- Directive Principles of State Policy
- Universal Declaration of Human Rights (UDHR)
- Constitutional governance structures (Panchayati Raj, etc.)

Guidelines:
1. Always cite specific Articles/Sections when applicable
2. Distinguish between constitutional rights vs. human rights treaties
3. If context lacks relevant information, say: \"Based on the available documents, I don't have specific information on this topic.\"
4. Use clear, accessible language while maintaining legal accuracy
";

/// Builds the user prompt from conversation context, retrieved context and
/// the (possibly rewritten) question. Sections stay labeled even when empty
/// so the model sees a stable layout.
pub fn build_user_prompt(query: &str, retrieved_context: &str, conversation_context: &str) -> String {
    format!(
        "Conversation:\n{conversation_context}\n\nContext:\n{retrieved_context}\n\nQuestion: {query}"
    )
}
