//! Incremental message assembly
//!
//! Consumes `message_chunk` and `message_complete` events for the active
//! conversation, reconstructs the in-flight bot reply, and merges the
//! final payload into the ordered message list. Events for any other
//! conversation are dropped, never buffered.

use motorchat_api::types::{CarProperty, CompletionPayload, Message, StructuredReply};
use motorchat_api::wire::{MessageChunk, MessageComplete};

/// Assembly state for the reply currently in flight.
///
/// `appended` guards against pushing a second placeholder message when
/// several fragments arrive before the first list mutation is observed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplyState {
    /// No reply in flight
    #[default]
    Idle,
    /// Fragments are accumulating
    Streaming { text: String, appended: bool },
}

/// A completion payload normalized into the message shape
#[derive(Debug, Clone, Default)]
pub struct NormalizedReply {
    pub text: String,
    pub car_props: Option<Vec<CarProperty>>,
    pub sql_query: Option<String>,
}

/// Normalize a terminal payload into `(text, structured fields)`.
///
/// Precedence: an object payload is used directly; a textual payload is
/// first tried as JSON-encoded structure, and if it does not decode to an
/// object the whole string becomes the reply text with no structured
/// fields. Missing structured fields stay unset in every case.
pub fn normalize(payload: CompletionPayload) -> NormalizedReply {
    match payload {
        CompletionPayload::Structured(reply) => from_structured(reply),
        CompletionPayload::Text(text) => match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(value) if value.is_object() => match serde_json::from_value(value) {
                Ok(reply) => from_structured(reply),
                Err(_) => NormalizedReply {
                    text,
                    ..Default::default()
                },
            },
            _ => NormalizedReply {
                text,
                ..Default::default()
            },
        },
    }
}

fn from_structured(reply: StructuredReply) -> NormalizedReply {
    NormalizedReply {
        text: reply.chat_reply.unwrap_or_default(),
        car_props: reply.car_props,
        sql_query: reply.sql_query,
    }
}

/// Message-assembly state machine for the active conversation.
///
/// Owns the in-memory message list; the list belongs exclusively to the
/// currently active conversation and is discarded wholesale on switch.
#[derive(Default)]
pub struct Assembler {
    messages: Vec<Message>,
    state: ReplyState,
    typing: bool,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordered message list for the active conversation
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a bot reply is currently streaming
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Current reply state (exposed for observability)
    pub fn state(&self) -> &ReplyState {
        &self.state
    }

    /// Apply a fragment event. Returns `true` if any state changed.
    ///
    /// Fragments whose conversation id does not match `active` are
    /// silently dropped: late fragments from an abandoned conversation
    /// must never leak into the current view.
    pub fn apply_chunk(&mut self, active: Option<&str>, chunk: &MessageChunk) -> bool {
        if active != Some(chunk.conversation_id.as_str()) {
            return false;
        }

        if self.state == ReplyState::Idle {
            self.state = ReplyState::Streaming {
                text: String::new(),
                appended: false,
            };
        }
        let ReplyState::Streaming { text, appended } = &mut self.state else {
            unreachable!()
        };
        text.push_str(&chunk.chunk);
        let accumulated = text.clone();

        if let Some(last) = self.messages.last_mut().filter(|m| m.is_streaming_bot()) {
            last.text = accumulated;
        } else if !*appended {
            *appended = true;
            self.messages.push(Message::bot_partial(accumulated));
        }

        self.typing = true;
        true
    }

    /// Apply a completion event. Returns `true` if any state changed.
    ///
    /// The assembly window closes regardless of parse outcome: the
    /// accumulator and append guard are reset before normalization so a
    /// malformed payload can never wedge the next reply.
    pub fn apply_complete(&mut self, active: Option<&str>, complete: MessageComplete) -> bool {
        if active != Some(complete.conversation_id.as_str()) {
            return false;
        }

        self.state = ReplyState::Idle;

        let reply = normalize(complete.message);
        if let Some(last) = self.messages.last_mut().filter(|m| m.is_streaming_bot()) {
            last.text = reply.text;
            last.is_complete = true;
            last.car_props = reply.car_props;
            last.sql_query = reply.sql_query;
        } else {
            // Completion with no preceding fragments
            self.messages
                .push(Message::bot_complete(reply.text, reply.car_props, reply.sql_query));
        }

        self.typing = false;
        true
    }

    /// Optimistically append a user message. Whitespace-only input is a
    /// no-op and returns `false`.
    pub fn push_user(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        self.messages.push(Message::user(text));
        true
    }

    /// Replace the whole list with loaded history. Never a merge.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Drop the in-flight reply state but keep finalized messages.
    /// Used when the server emits an `error` event mid-stream.
    pub fn abort_reply(&mut self) {
        self.state = ReplyState::Idle;
        self.typing = false;
    }

    /// Discard everything: list, accumulator, typing flag.
    /// Used on conversation switch.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.state = ReplyState::Idle;
        self.typing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motorchat_api::types::Sender;

    fn chunk(text: &str, conversation: &str) -> MessageChunk {
        MessageChunk {
            chunk: text.into(),
            conversation_id: conversation.into(),
            is_complete: false,
        }
    }

    fn complete(payload: CompletionPayload, conversation: &str) -> MessageComplete {
        MessageComplete {
            message: payload,
            conversation_id: conversation.into(),
            is_complete: true,
        }
    }

    fn incomplete_count(assembler: &Assembler) -> usize {
        assembler
            .messages()
            .iter()
            .filter(|m| !m.is_complete)
            .count()
    }

    #[test]
    fn test_fragments_concatenate_in_order() {
        let mut assembler = Assembler::new();
        for piece in ["The ", "2021 ", "Corolla"] {
            assembler.apply_chunk(Some("c1"), &chunk(piece, "c1"));
            assert_eq!(incomplete_count(&assembler), 1);
            assert!(assembler.messages().last().unwrap().is_streaming_bot());
        }
        assert_eq!(assembler.messages().len(), 1);
        assert_eq!(assembler.messages()[0].text, "The 2021 Corolla");
        assert!(assembler.is_typing());
    }

    #[test]
    fn test_foreign_conversation_fragment_is_noop() {
        let mut assembler = Assembler::new();
        assembler.apply_chunk(Some("c1"), &chunk("Hel", "c1"));
        let before = assembler.messages()[0].text.clone();

        let mutated = assembler.apply_chunk(Some("c1"), &chunk("XXX", "c2"));
        assert!(!mutated);
        assert_eq!(assembler.messages().len(), 1);
        assert_eq!(assembler.messages()[0].text, before);

        // the accumulator was untouched too: the next on-target fragment
        // continues from "Hel", not "HelXXX"
        assembler.apply_chunk(Some("c1"), &chunk("lo", "c1"));
        assert_eq!(assembler.messages()[0].text, "Hello");
    }

    #[test]
    fn test_no_active_conversation_drops_everything() {
        let mut assembler = Assembler::new();
        assert!(!assembler.apply_chunk(None, &chunk("hi", "c1")));
        assert!(!assembler.apply_complete(None, complete(CompletionPayload::Text("hi".into()), "c1")));
        assert!(assembler.messages().is_empty());
        assert!(!assembler.is_typing());
    }

    #[test]
    fn test_plain_string_completion() {
        let mut assembler = Assembler::new();
        assembler.apply_chunk(Some("c1"), &chunk("hel", "c1"));
        assembler.apply_complete(Some("c1"), complete(CompletionPayload::Text("hello".into()), "c1"));

        let messages = assembler.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello");
        assert!(messages[0].is_complete);
        assert!(messages[0].car_props.is_none());
        assert!(messages[0].sql_query.is_none());
        assert!(!assembler.is_typing());
        assert_eq!(*assembler.state(), ReplyState::Idle);
    }

    #[test]
    fn test_json_encoded_structured_completion() {
        let payload = CompletionPayload::Text(
            r#"{"chatReply":"Here","carProps":[{"emoji":"🚗","key":"Color","value":"Red"}],"sqlQuery":"SELECT 1"}"#
                .into(),
        );
        let mut assembler = Assembler::new();
        assembler.apply_chunk(Some("c1"), &chunk("Her", "c1"));
        assembler.apply_complete(Some("c1"), complete(payload, "c1"));

        let message = &assembler.messages()[0];
        assert_eq!(message.text, "Here");
        let props = message.car_props.as_ref().unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].emoji, "🚗");
        assert_eq!(props[0].key, "Color");
        assert_eq!(props[0].value, "Red");
        assert_eq!(message.sql_query.as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn test_object_completion_with_missing_fields() {
        let payload = CompletionPayload::Structured(StructuredReply {
            chat_reply: Some("Hi".into()),
            car_props: None,
            sql_query: None,
        });
        let mut assembler = Assembler::new();
        assembler.apply_complete(Some("c1"), complete(payload, "c1"));

        let message = &assembler.messages()[0];
        assert_eq!(message.text, "Hi");
        assert!(message.car_props.is_none());
        assert!(message.sql_query.is_none());
    }

    #[test]
    fn test_completion_without_fragments_appends() {
        let mut assembler = Assembler::new();
        assembler.push_user("what colors?");
        assembler.apply_complete(Some("c1"), complete(CompletionPayload::Text("Red".into()), "c1"));

        let messages = assembler.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].sender, Sender::Bot);
        assert_eq!(messages[1].text, "Red");
        assert!(messages[1].is_complete);
    }

    #[test]
    fn test_malformed_json_string_falls_back_to_text() {
        let mut assembler = Assembler::new();
        assembler.apply_chunk(Some("c1"), &chunk("...", "c1"));
        assembler.apply_complete(
            Some("c1"),
            complete(CompletionPayload::Text("{not json".into()), "c1"),
        );

        let message = &assembler.messages()[0];
        assert_eq!(message.text, "{not json");
        assert!(message.is_complete);
        assert!(message.car_props.is_none());
        // the completion still closed the window
        assert!(!assembler.is_typing());
        assert_eq!(*assembler.state(), ReplyState::Idle);
    }

    #[test]
    fn test_json_string_that_is_not_an_object_stays_text() {
        for raw in ["42", "[1,2]", "\"quoted\"", "null"] {
            let mut assembler = Assembler::new();
            assembler.apply_complete(
                Some("c1"),
                complete(CompletionPayload::Text(raw.into()), "c1"),
            );
            assert_eq!(assembler.messages()[0].text, raw);
            assert!(assembler.messages()[0].car_props.is_none());
        }
    }

    #[test]
    fn test_reset_discards_partial_reply() {
        let mut assembler = Assembler::new();
        assembler.apply_chunk(Some("c1"), &chunk("partial", "c1"));
        assert!(assembler.is_typing());

        // conversation switch
        assembler.reset();
        assert!(assembler.messages().is_empty());
        assert!(!assembler.is_typing());

        // a fresh history load shows only complete messages; the old
        // partial never reappears
        assembler.replace_all(vec![Message::user("hi"), Message::bot_complete("hello", None, None)]);
        assert_eq!(assembler.messages().len(), 2);
        assert!(assembler.messages().iter().all(|m| m.is_complete));

        // a late completion for the old conversation is dropped
        let mutated = assembler.apply_complete(
            Some("c2"),
            complete(CompletionPayload::Text("stale".into()), "c1"),
        );
        assert!(!mutated);
        assert_eq!(assembler.messages().len(), 2);
    }

    #[test]
    fn test_whitespace_send_is_noop() {
        let mut assembler = Assembler::new();
        assert!(!assembler.push_user(""));
        assert!(!assembler.push_user("   \t\n"));
        assert!(assembler.messages().is_empty());

        assert!(assembler.push_user("  hi  "));
        // text is kept verbatim; only the emptiness check trims
        assert_eq!(assembler.messages()[0].text, "  hi  ");
    }

    #[test]
    fn test_double_completion_finalizes_independently() {
        let mut assembler = Assembler::new();
        assembler.apply_chunk(Some("c1"), &chunk("Hi", "c1"));
        assembler.apply_complete(Some("c1"), complete(CompletionPayload::Text("Hi".into()), "c1"));
        assert_eq!(assembler.messages().len(), 1);

        // second completion finds no trailing incomplete message, so it
        // appends a fresh complete one
        assembler.apply_complete(Some("c1"), complete(CompletionPayload::Text("Hi".into()), "c1"));
        assert_eq!(assembler.messages().len(), 2);
        assert!(assembler.messages().iter().all(|m| m.is_complete));
    }

    #[test]
    fn test_fragments_after_user_message_append_once() {
        let mut assembler = Assembler::new();
        assembler.push_user("question");
        assembler.apply_chunk(Some("c1"), &chunk("a", "c1"));
        assembler.apply_chunk(Some("c1"), &chunk("b", "c1"));

        assert_eq!(assembler.messages().len(), 2);
        assert_eq!(assembler.messages()[1].text, "ab");
        assert_eq!(incomplete_count(&assembler), 1);
    }

    #[test]
    fn test_abort_reply_keeps_messages() {
        let mut assembler = Assembler::new();
        assembler.push_user("q");
        assembler.apply_chunk(Some("c1"), &chunk("par", "c1"));

        assembler.abort_reply();
        assert!(!assembler.is_typing());
        assert_eq!(*assembler.state(), ReplyState::Idle);
        // the partially assembled message stays in the list; only the
        // in-flight accumulator is gone
        assert_eq!(assembler.messages().len(), 2);
    }

    #[test]
    fn test_normalize_object_empty_chat_reply() {
        let reply = normalize(CompletionPayload::Structured(StructuredReply {
            chat_reply: None,
            car_props: Some(vec![]),
            sql_query: None,
        }));
        assert_eq!(reply.text, "");
        assert_eq!(reply.car_props, Some(vec![]));
    }
}
