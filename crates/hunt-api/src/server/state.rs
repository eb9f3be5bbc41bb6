#[derive(Clone)]
struct AppState {
    inner: Arc<Mutex<HuntService>>,
}

impl AppState {
    fn new(service: HuntService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }
}
