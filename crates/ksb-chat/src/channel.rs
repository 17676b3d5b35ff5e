use ksb_types::models::Message;

/// The scope a message lives in.
///
/// Direct channels store their two participants in ascending order, so the
/// channel between A and B is the same value as the one between B and A.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Group,
    Direct { low: i64, high: i64 },
}

impl Channel {
    /// Channel a request for `requester` (optionally talking to `target`) reads from.
    pub fn for_request(requester: i64, target: Option<i64>) -> Self {
        match target {
            None => Self::Group,
            Some(target) => Self::between(requester, target),
        }
    }

    pub fn between(a: i64, b: i64) -> Self {
        Self::Direct {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Channel of a message sent by `author`, addressed to `receiver` if any.
    pub fn of_parts(author: i64, receiver: Option<i64>) -> Self {
        match receiver {
            None => Self::Group,
            Some(receiver) => Self::between(author, receiver),
        }
    }

    pub fn of(message: &Message) -> Self {
        Self::of_parts(message.author_id, message.receiver_id)
    }

    pub fn contains(&self, message: &Message) -> bool {
        Self::of(message) == *self
    }
}

/// Filter an ordered message sequence down to the channel `requester` asked
/// for. Order is preserved.
pub fn resolve(messages: Vec<Message>, requester: i64, target: Option<i64>) -> Vec<Message> {
    let channel = Channel::for_request(requester, target);
    messages.into_iter().filter(|m| channel.contains(m)).collect()
}
