//! Input supplied ahead of a command's prompts.

use std::collections::VecDeque;

use p4bridge_protocol::{Record, SpecRecord};

/// One answer to a prompt
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// Sent as-is
    Text(String),
    /// Formatted as a form with the command's spec definition
    Form(Record),
}

/// Answers for the prompts of the next command
///
/// A single value answers every prompt; a queue answers one prompt per
/// entry. Input is discarded when the command finishes.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// The same answer for every prompt
    Single(InputValue),
    /// One answer per prompt, in order
    Queue(VecDeque<InputValue>),
}

impl Input {
    /// The answer for the next prompt
    pub fn next_value(&mut self) -> Option<InputValue> {
        match self {
            Self::Single(value) => Some(value.clone()),
            Self::Queue(queue) => queue.pop_front(),
        }
    }
}

impl From<&str> for InputValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for InputValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Record> for InputValue {
    fn from(record: Record) -> Self {
        Self::Form(record)
    }
}

impl From<SpecRecord> for InputValue {
    fn from(spec: SpecRecord) -> Self {
        Self::Form(spec.into_record())
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Self::Single(text.into())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Self::Single(text.into())
    }
}

impl From<Record> for Input {
    fn from(record: Record) -> Self {
        Self::Single(record.into())
    }
}

impl From<SpecRecord> for Input {
    fn from(spec: SpecRecord) -> Self {
        Self::Single(spec.into())
    }
}

impl<V: Into<InputValue>> From<Vec<V>> for Input {
    fn from(values: Vec<V>) -> Self {
        Self::Queue(values.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<InputValue>> FromIterator<V> for Input {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::Queue(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_repeats() {
        let mut input = Input::from("secret");
        assert_eq!(input.next_value(), Some(InputValue::Text("secret".into())));
        assert_eq!(input.next_value(), Some(InputValue::Text("secret".into())));
    }

    #[test]
    fn test_queue_drains() {
        let mut input = Input::from(vec!["old", "new", "new"]);
        assert_eq!(input.next_value(), Some("old".into()));
        assert_eq!(input.next_value(), Some("new".into()));
        assert_eq!(input.next_value(), Some("new".into()));
        assert_eq!(input.next_value(), None);
    }
}
