use crate::memory::MemoryClient;

#[derive(Clone)]
pub struct AppState {
    pub memory: MemoryClient,
}
