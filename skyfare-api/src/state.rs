use skyfare_order::BookingManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<BookingManager>,
}

impl AppState {
    pub fn new(manager: Arc<BookingManager>) -> Self {
        Self { manager }
    }
}
