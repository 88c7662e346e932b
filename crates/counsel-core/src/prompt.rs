//! Assembly of the single prompt string sent to the completion API.
//!
//! The prompt is built from, in order: the persona frame, the user's extra
//! instructions, the recent-conversation summary, the knowledge-base context,
//! the user's request, and the request-type instruction block.

use crate::{
  classify::RequestType,
  message::{Message, Role, truncate_chars},
  persona::{Persona, PromptType, SHARED_FORMAT_RULES},
};

/// How much conversation history is folded into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
  /// Most recent turns kept.
  pub turns:          usize,
  /// Characters kept from each turn.
  pub chars_per_turn: usize,
}

impl Default for HistoryWindow {
  fn default() -> Self { Self { turns: 6, chars_per_turn: 500 } }
}

/// Render the tail of a session as `User: …` / `Assistant: …` lines.
///
/// `history` must be in ascending timestamp order.
pub fn summarize_history(history: &[Message], window: HistoryWindow) -> String {
  let start = history.len().saturating_sub(window.turns);
  history[start..]
    .iter()
    .map(|m| {
      let speaker = match m.role {
        Role::User => "User",
        Role::Assistant => "Assistant",
      };
      let text = truncate_chars(m.content.trim(), window.chars_per_turn);
      if text.len() < m.content.trim().len() {
        format!("{speaker}: {text}...")
      } else {
        format!("{speaker}: {text}")
      }
    })
    .collect::<Vec<_>>()
    .join("\n")
}

/// Everything the assembler needs for one request.
#[derive(Debug, Clone)]
pub struct PromptInput<'a> {
  pub query:             &'a str,
  pub context:           &'a str,
  pub persona:           &'a Persona,
  pub user_instructions: &'a str,
  pub history:           &'a str,
  pub request_type:      RequestType,
}

/// Instruction block appended for each request type.
pub fn request_type_block(kind: RequestType) -> Option<&'static str> {
  match kind {
    RequestType::FillForm => Some(concat!(
      "IMPORTANT: The user is asking you to fill in a form. You MUST:\n",
      "1. Preserve the original layout, headings, numbering and wording of the form exactly\n",
      "2. Fill in only the blank fields, using the information the user provided\n",
      "3. Mark any field you cannot complete as [TO BE COMPLETED]\n",
      "4. Not add, remove or reorder sections",
    )),
    RequestType::Analysis => Some(concat!(
      "IMPORTANT: The user is requesting a legal analysis. Structure your answer in four parts:\n",
      "1. **Document Structure:** how the material is organised and what each part does\n",
      "2. **Key Provisions:** the clauses or rules that matter most and what they require\n",
      "3. **Risk Assessment:** exposures, ambiguities and one-sided terms\n",
      "4. **Recommendations:** concrete changes or actions the user should take",
    )),
    RequestType::Document => Some(concat!(
      "IMPORTANT: The user is requesting document generation. You MUST:\n",
      "1. Create a complete legal document based on the request\n",
      "2. Use proper legal formatting with a title in capital letters\n",
      "3. Organise the body into numbered clauses (1., 1.1, 1.2, 2., ...)\n",
      "4. Include all necessary clauses, definitions and signature blocks\n",
      "5. Use the knowledge base context to inform the document content",
    )),
    RequestType::Table => Some(concat!(
      "IMPORTANT: The user is requesting tabular output. You MUST:\n",
      "1. Present the data as a numbered list with one entry per row, not as a markdown or vertical-bar table\n",
      "2. Start each entry with a bold label naming the row, then give its fields as short labelled phrases\n",
      "3. Keep every entry short and factual",
    )),
    RequestType::Chat => None,
  }
}

/// Build the final prompt.
pub fn assemble(input: &PromptInput<'_>) -> String {
  let mut sections: Vec<String> = Vec::with_capacity(8);

  sections.push(input.persona.text.trim().to_string());
  if input.persona.kind != PromptType::Default {
    sections.push(SHARED_FORMAT_RULES.to_string());
  }

  let instructions = input.user_instructions.trim();
  if !instructions.is_empty() {
    sections.push(format!("ADDITIONAL USER INSTRUCTIONS:\n{instructions}"));
  }

  if !input.history.trim().is_empty() {
    sections.push(format!("Recent Conversation:\n{}", input.history.trim()));
  }

  sections.push(format!("Knowledge Base Context:\n{}", input.context.trim()));
  sections.push(format!("User Request: {}", input.query.trim()));

  if let Some(block) = request_type_block(input.request_type) {
    sections.push(block.to_string());
  }

  if !instructions.is_empty() {
    sections.push(
      "Follow both the system protocols and the user's additional instructions above."
        .to_string(),
    );
  }

  sections.push("Response:".to_string());
  sections.join("\n\n")
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn message(role: Role, content: &str) -> Message {
    Message {
      user_id:           "u".into(),
      timestamp:         Utc::now(),
      session_id:        "s".into(),
      role,
      content:           content.into(),
      session_title:     "t".into(),
      model_used:        "m".into(),
      request_type:      RequestType::Chat,
      sources:           None,
      user_instructions: None,
    }
  }

  fn input<'a>(persona: &'a Persona, kind: RequestType) -> PromptInput<'a> {
    PromptInput {
      query:             "Can my landlord keep my deposit?",
      context:           "Va. Code § 55.1-1226 governs security deposits.",
      persona,
      user_instructions: "",
      history:           "",
      request_type:      kind,
    }
  }

  #[test]
  fn chat_prompt_has_frame_context_and_query() {
    let persona = Persona::builtin(PromptType::Default);
    let prompt = assemble(&input(&persona, RequestType::Chat));
    assert!(prompt.starts_with("You are Legal Chat Bot"));
    assert!(prompt.contains("Knowledge Base Context:\nVa. Code"));
    assert!(prompt.contains("User Request: Can my landlord keep my deposit?"));
    assert!(!prompt.contains("IMPORTANT:"));
    assert!(!prompt.contains("ADDITIONAL USER INSTRUCTIONS"));
    assert!(prompt.ends_with("Response:"));
  }

  #[test]
  fn each_request_type_gets_its_block() {
    let persona = Persona::builtin(PromptType::Default);
    let cases = [
      (RequestType::FillForm, "Preserve the original layout"),
      (RequestType::Analysis, "Risk Assessment"),
      (RequestType::Document, "numbered clauses"),
      (RequestType::Table, "numbered list"),
    ];
    for (kind, needle) in cases {
      let prompt = assemble(&input(&persona, kind));
      assert!(prompt.contains(needle), "{kind}: missing {needle:?}");
    }
  }

  #[test]
  fn table_block_asks_for_numbered_list_without_pipes() {
    let block = request_type_block(RequestType::Table).unwrap();
    assert!(block.contains("numbered list"));
    assert!(!block.contains('|'));
  }

  #[test]
  fn empty_context_still_produces_prompt() {
    let persona = Persona::builtin(PromptType::Default);
    let mut i = input(&persona, RequestType::Chat);
    i.context = "";
    let prompt = assemble(&i);
    assert!(prompt.contains("Knowledge Base Context:\n\n\nUser Request:"));
  }

  #[test]
  fn non_default_persona_gets_shared_rules() {
    let persona = Persona::builtin(PromptType::Litigation);
    let prompt = assemble(&input(&persona, RequestType::Chat));
    assert!(prompt.starts_with("You are a litigation associate"));
    assert!(prompt.contains(SHARED_FORMAT_RULES));
  }

  #[test]
  fn user_instructions_are_included() {
    let persona = Persona::builtin(PromptType::Default);
    let mut i = input(&persona, RequestType::Chat);
    i.user_instructions = "Answer in Spanish.";
    let prompt = assemble(&i);
    assert!(prompt.contains("ADDITIONAL USER INSTRUCTIONS:\nAnswer in Spanish."));
    assert!(prompt.contains("Follow both the system protocols"));
  }

  #[test]
  fn history_keeps_recent_turns_truncated() {
    let history: Vec<Message> = (0..10)
      .map(|i| {
        let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
        message(role, &format!("turn {i} {}", "x".repeat(20)))
      })
      .collect();
    let window = HistoryWindow { turns: 3, chars_per_turn: 10 };
    let summary = summarize_history(&history, window);
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "Assistant: turn 7 xxx...");
    assert_eq!(lines[2], "Assistant: turn 9 xxx...");
  }

  #[test]
  fn short_history_is_not_marked_truncated() {
    let history = vec![message(Role::User, "hello")];
    assert_eq!(summarize_history(&history, HistoryWindow::default()), "User: hello");
  }
}
