use crate::api::StubContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) stub: StubContext,
    pub(crate) max_upload_bytes: usize,
}
