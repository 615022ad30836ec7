//! Answer extraction from an orchestration trace payload.
//!
//! The model's own input is carried as a JSON document encoded into a string
//! field of the payload:
//!
//! ```text
//! payload.trace.orchestrationTrace.modelInvocationInput.text
//!     = "{\"messages\":[{\"role\":\"assistant\",\"content\":\"...\"}, ...]}"
//! ```
//!
//! The assistant messages are concatenated in order and scanned for
//! `<answer>...</answer>` segments. A segment never contains another
//! `<answer>` opening tag or a line break, and the shortest closing match
//! wins.
//!
//! # Example
//!
//! ```
//! use eventstream_answer::answer::find_answers;
//!
//! let found = find_answers("<answer>A</answer> then <answer>B</answer>");
//! assert_eq!(found.len(), 2);
//! assert_eq!(found[1].full, "<answer>B</answer>");
//! assert_eq!(found[1].inner, "B");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{EventStreamError, Result};

/// JSON pointer to the encoded model invocation input.
pub const MODEL_INVOCATION_TEXT_POINTER: &str =
    "/trace/orchestrationTrace/modelInvocationInput/text";

/// Role whose content is scanned.
pub const ASSISTANT_ROLE: &str = "assistant";

const OPEN_TAG: &str = "<answer>";

// A segment never crosses a line terminator.
static ANSWER_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<answer>([^\n\r\x{2028}\x{2029}]*?)</answer>").expect("Valid regex pattern")
});

/// Inner document of `modelInvocationInput.text`.
///
/// Entries stay untyped: anything that is not an assistant message is
/// skipped whatever its shape.
#[derive(Debug, Deserialize)]
struct InvocationInput {
    messages: Vec<Value>,
}

/// One tagged answer segment found in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerMatch<'a> {
    /// Byte offset of the opening tag in the scanned text.
    pub start: usize,
    /// The full segment, tags included.
    pub full: &'a str,
    /// Text between the tags.
    pub inner: &'a str,
}

/// Find every `<answer>...</answer>` segment in `text`, in order.
///
/// Segments do not overlap, do not span lines, and never contain an inner
/// `<answer>` tag: for `<answer>x<answer>y</answer>` the only segment is
/// `<answer>y</answer>`.
pub fn find_answers(text: &str) -> Vec<AnswerMatch<'_>> {
    ANSWER_SEGMENT
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let inner = caps.get(1)?;
            // The shortest match may still start at an earlier opening tag;
            // the segment proper begins at the last one before the close.
            let start = match inner.as_str().rfind(OPEN_TAG) {
                Some(rel) => inner.start() + rel,
                None => whole.start(),
            };
            let inner_start = start + OPEN_TAG.len();
            Some(AnswerMatch {
                start,
                full: &text[start..whole.end()],
                inner: &text[inner_start..inner.end()],
            })
        })
        .collect()
}

/// Concatenate the content of every assistant message in the trace.
///
/// # Errors
///
/// Returns `AnswerNotFound` if the trace path is missing, the encoded text
/// is not a `{"messages": [...]}` document, there are no assistant
/// messages, or an assistant message has non-string content.
pub fn assistant_transcript(payload: &Value) -> Result<String> {
    let text = payload
        .pointer(MODEL_INVOCATION_TEXT_POINTER)
        .ok_or_else(|| {
            EventStreamError::answer_not_found(format!(
                "payload has no {}",
                MODEL_INVOCATION_TEXT_POINTER
            ))
        })?
        .as_str()
        .ok_or_else(|| {
            EventStreamError::answer_not_found("modelInvocationInput.text is not a string")
        })?;

    let input: InvocationInput = serde_json::from_str(text).map_err(|e| {
        EventStreamError::answer_not_found(format!(
            "modelInvocationInput.text is not a messages document: {}",
            e
        ))
    })?;

    let mut transcript = String::new();
    let mut assistant_messages = 0usize;

    for (index, message) in input.messages.iter().enumerate() {
        if message.get("role").and_then(Value::as_str) != Some(ASSISTANT_ROLE) {
            continue;
        }
        let content = message.get("content").and_then(Value::as_str).ok_or_else(|| {
            EventStreamError::answer_not_found(format!(
                "assistant message {} has non-string content",
                index
            ))
        })?;
        transcript.push_str(content);
        assistant_messages += 1;
    }

    if assistant_messages == 0 {
        return Err(EventStreamError::answer_not_found(
            "trace has no assistant messages",
        ));
    }

    Ok(transcript)
}

/// All tagged answers in the assistant messages, in order, tags included.
///
/// # Errors
///
/// Returns `AnswerNotFound` under the same conditions as
/// [`assistant_transcript`], or if no segment is found.
pub fn extract_all_answers(payload: &Value) -> Result<Vec<String>> {
    let transcript = assistant_transcript(payload)?;
    let answers: Vec<String> = find_answers(&transcript)
        .into_iter()
        .map(|m| m.full.to_string())
        .collect();

    if answers.is_empty() {
        return Err(EventStreamError::answer_not_found(
            "assistant messages contain no <answer> segment",
        ));
    }

    Ok(answers)
}

/// The last tagged answer in the assistant messages, tags included.
///
/// # Errors
///
/// Same as [`extract_all_answers`].
pub fn extract_answer(payload: &Value) -> Result<String> {
    let transcript = assistant_transcript(payload)?;
    find_answers(&transcript)
        .last()
        .map(|m| m.full.to_string())
        .ok_or_else(|| {
            EventStreamError::answer_not_found("assistant messages contain no <answer> segment")
        })
}
