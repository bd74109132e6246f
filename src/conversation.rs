use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

/// Raw image bytes plus the mime hint the API wants alongside them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub data: Vec<u8>,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    Text(String),
    Image(Attachment),
    /// Placeholder shown while a request is in flight; replaced in place
    /// exactly once when the request resolves.
    Pending,
}

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub seq: u64,
    pub author: Author,
    pub body: EntryBody,
}

/// Append-only log of chat entries. Sequence ids are assigned at append time
/// and define display order; entries are never removed or reordered.
#[derive(Default)]
pub struct Transcript {
    entries: Vec<ChatEntry>,
    next_seq: u64,
}

impl Transcript {
    pub fn append(&mut self, author: Author, body: EntryBody) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(ChatEntry { seq, author, body });
        seq
    }

    /// Swaps the body of an existing entry. Only the `Pending` placeholder is
    /// ever rewritten; everything else stays immutable after append.
    pub fn replace(&mut self, seq: u64, body: EntryBody) {
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.seq == seq) {
            entry.body = body;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }
}

/// One unit of work handed to the responder. The request id correlates the
/// eventual completion event back to the dispatch that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub request_id: u64,
    pub prompt: String,
    pub attachment: Option<Attachment>,
}

/// Contract for the remote side of the conversation. `dispatch` must not
/// block the calling thread and must cause exactly one completion callback
/// (`on_response` or `on_failure`) to be delivered for the request id.
pub trait Responder {
    fn has_credential(&self) -> bool;
    fn dispatch(&mut self, request: OutboundRequest);
}

pub const IMAGE_ONLY_REPLY: &str =
    "Nice picture! Add a question next time and I'll take a closer look.";
pub const MISSING_KEY_REPLY: &str =
    "No API key configured. Open Settings and add your Gemini key first.";
const FAILURE_PREFIX: &str = "Request failed: ";

/// The send/receive lifecycle around the transcript. All state lives on the
/// UI thread; background tasks only report back through the completion
/// callbacks, keyed by request id so late results for abandoned requests are
/// dropped instead of corrupting a newer exchange.
pub struct Conversation<R> {
    transcript: Transcript,
    responder: R,
    busy: bool,
    pending_seq: Option<u64>,
    in_flight: Option<u64>,
    next_request_id: u64,
}

impl<R: Responder> Conversation<R> {
    pub fn new(responder: R) -> Self {
        Self {
            transcript: Transcript::default(),
            responder,
            busy: false,
            pending_seq: None,
            in_flight: None,
            next_request_id: 0,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn responder_mut(&mut self) -> &mut R {
        &mut self.responder
    }

    /// Appends an assistant bubble outside the request lifecycle (greeting,
    /// local notices).
    pub fn note(&mut self, text: impl Into<String>) {
        self.transcript
            .append(Author::Assistant, EntryBody::Text(text.into()));
    }

    /// Accepts a user message. The user's side of the exchange always lands
    /// in the transcript, even when the dispatch below is refused.
    pub fn submit(&mut self, text: &str, attachment: Option<Attachment>) {
        let text = text.trim();
        if text.is_empty() && attachment.is_none() {
            return;
        }

        if let Some(image) = attachment.clone() {
            self.transcript.append(Author::User, EntryBody::Image(image));
        }
        if !text.is_empty() {
            self.transcript
                .append(Author::User, EntryBody::Text(text.to_string()));
        }

        if text.is_empty() {
            // Image without a question: canned acknowledgement, no remote call.
            self.transcript
                .append(Author::Assistant, EntryBody::Text(IMAGE_ONLY_REPLY.into()));
            return;
        }

        if self.busy {
            debug!("submit dropped: a request is already in flight");
            return;
        }

        if !self.responder.has_credential() {
            self.transcript
                .append(Author::Assistant, EntryBody::Text(MISSING_KEY_REPLY.into()));
            return;
        }

        self.busy = true;
        self.pending_seq = Some(self.transcript.append(Author::Assistant, EntryBody::Pending));
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.in_flight = Some(request_id);
        debug!(request_id, "dispatching prompt");
        self.responder.dispatch(OutboundRequest {
            request_id,
            prompt: text.to_string(),
            attachment,
        });
    }

    pub fn on_response(&mut self, request_id: u64, text: String) {
        self.resolve(request_id, EntryBody::Text(text));
    }

    pub fn on_failure(&mut self, request_id: u64, message: String) {
        self.resolve(request_id, EntryBody::Text(format!("{FAILURE_PREFIX}{message}")));
    }

    fn resolve(&mut self, request_id: u64, body: EntryBody) {
        if self.in_flight != Some(request_id) {
            debug!(request_id, "dropping completion for a superseded request");
            return;
        }
        self.in_flight = None;
        self.busy = false;
        if let Some(seq) = self.pending_seq.take() {
            self.transcript.replace(seq, body);
        }
    }
}
