/// Completion events posted by the background request task back to the UI
/// thread. Exactly one event is sent per dispatched request.
#[derive(Debug, Clone)]
pub enum AppEvent {
    ResponseReady { request_id: u64, text: String },
    ResponseFailed { request_id: u64, message: String },
}
