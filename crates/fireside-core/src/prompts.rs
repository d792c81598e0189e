//! Prompt builders for the story-guide persona.
//!
//! Three prompt shapes: formulate an opening question from a theme, pick a
//! follow-up question or an empathetic comment after an answer, and produce a
//! gentle transition when the user stays silent. The follow-up prompt asks the
//! model to prefix its reply with `QUESTION:` or `COMMENT:` so the gateway can
//! type the response.

use crate::memory::ConversationMemory;

/// Prompt asking the model to formulate an inviting opening question for a theme.
pub fn opening_question(theme: &str, memory: &ConversationMemory) -> String {
    let history = memory.format_for_prompt();
    format!(
        "You are a warm, playful, and deeply curious story guide. Your delight is in \
helping the user uncover and share their unique stories.\n{history}\n\n\
To gently start a new story thread, formulate a creative and inviting OPENING question \
inspired by this theme: '{theme}'\n\
Make it sound like a genuine, friendly invitation to share. Connect to our recent chat \
if it feels natural; otherwise a fresh question on the theme is perfect.\n\
Output ONLY the question itself, ending with a question mark."
    )
}

/// Prompt asking the model for either a follow-up question or an empathetic
/// comment, typed via a leading `QUESTION:` / `COMMENT:` marker.
pub fn follow_up(theme: &str, user_answer: &str, memory: &ConversationMemory) -> String {
    let history = memory.format_for_prompt();
    format!(
        "You are a warm, playful, and deeply curious story guide helping the user share \
their story.\n{history}\n\n\
You most recently asked something related to the theme of: \"{theme}\"\n\
The user just responded:\n\"{user_answer}\"\n\n\
Choose exactly ONE of the following:\n\
1. If the answer has a detail, feeling, or hint worth exploring, ask a warm, open-ended \
follow-up question about that specific part. Prefix with \"QUESTION: \".\n\
2. If the answer drifted from the theme or is vague, gently guide it back with a \
clarifying question. This is also a \"QUESTION: \".\n\
3. If this feels like a good place to pause the thread, offer a short, empathetic \
comment (1-2 sentences) showing you listened. Prefix with \"COMMENT: \".\n\n\
Keep the tone light, supportive, and engaging."
    )
}

/// Prompt asking the model for a gentle transition phrase after no reply.
pub fn no_reply_transition(question_asked: &str, memory: &ConversationMemory) -> String {
    let history = memory.format_for_prompt();
    format!(
        "You are a friendly, patient, and understanding story guide.\n{history}\n\n\
You just asked the user:\n\"{question_asked}\"\n\n\
The user didn't reply or wasn't sure what to say, and that's perfectly okay. Offer a \
short, warm transitional phrase (1-2 sentences) that makes the user feel comfortable \
and signals we can try a different story idea. Do NOT ask a question. Avoid making it \
sound like there was a problem.\n\
Provide ONLY the transitional phrase."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ConversationMemory, Utterance};

    #[test]
    fn opening_prompt_carries_theme_and_history() {
        let mut memory = ConversationMemory::new(4);
        memory.push(Utterance::user_answer("it was raining"));
        let prompt = opening_question("a memorable journey", &memory);
        assert!(prompt.contains("a memorable journey"));
        assert!(prompt.contains("it was raining"));
        assert!(prompt.contains("question mark"));
    }

    #[test]
    fn follow_up_prompt_names_both_markers() {
        let memory = ConversationMemory::new(4);
        let prompt = follow_up("a challenge", "I climbed a mountain", &memory);
        assert!(prompt.contains("QUESTION: "));
        assert!(prompt.contains("COMMENT: "));
        assert!(prompt.contains("I climbed a mountain"));
    }

    #[test]
    fn transition_prompt_forbids_questions() {
        let memory = ConversationMemory::new(4);
        let prompt = no_reply_transition("What happened then?", &memory);
        assert!(prompt.contains("Do NOT ask a question"));
        assert!(prompt.contains("What happened then?"));
    }
}
