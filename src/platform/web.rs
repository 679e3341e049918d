//! Browser bindings

use wasm_bindgen::prelude::*;

use crate::ads::SimulatedAds;
use crate::commentary::CannedCommentary;
use crate::error::StoreError;
use crate::persistence::{KeyValueStore, MemoryStore};
use crate::session::SessionController;
use crate::tuning::Tuning;

fn js_error(e: JsValue) -> StoreError {
    StoreError::Unavailable(format!("{:?}", e))
}

/// Key-value store over `window.localStorage`
pub struct LocalStore {
    storage: web_sys::Storage,
}

impl LocalStore {
    /// `None` when storage is disabled (private mode, sandboxed iframe)
    pub fn open() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok()??;
        Some(Self { storage })
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.storage.get_item(key).map_err(js_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.storage.set_item(key, value).map_err(js_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.storage.remove_item(key).map_err(js_error)
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialised".into());
    }
}

/// Session handle for the page script.
///
/// Complex values cross the boundary as JSON strings.
#[wasm_bindgen]
pub struct WebSession {
    inner: SessionController,
}

#[wasm_bindgen]
impl WebSession {
    /// Start a session; `tuning_json` may be empty for the defaults
    #[wasm_bindgen(constructor)]
    pub fn new(tuning_json: &str) -> Result<WebSession, JsValue> {
        let tuning = if tuning_json.trim().is_empty() {
            Tuning::default()
        } else {
            Tuning::from_json(tuning_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };

        let store: Box<dyn KeyValueStore> = match LocalStore::open() {
            Some(store) => Box::new(store),
            None => {
                log::warn!("LocalStorage unavailable, progress will not be saved");
                Box::new(MemoryStore::new())
            }
        };

        let seed = js_sys::Date::now() as u64;
        let inner = SessionController::new(tuning, store, Box::new(SimulatedAds::new()), seed)
            .map_err(|e| JsValue::from_str(&e.to_string()))?
            .with_commentary(Box::new(CannedCommentary::new(seed)));
        log::info!("2048 Stack starting (seed {})", seed);
        Ok(WebSession { inner })
    }

    pub fn aim(&mut self, x: f32) {
        self.inner.aim(x);
    }

    pub fn drop_tile(&mut self) -> bool {
        self.inner.drop_tile()
    }

    /// Advance by `dt` seconds (one animation frame)
    pub fn advance(&mut self, dt: f32) {
        self.inner.advance(dt);
    }

    pub fn request_continue(&mut self) -> bool {
        self.inner.request_continue()
    }

    pub fn request_reset(&mut self) -> bool {
        self.inner.request_reset()
    }

    pub fn dismiss_ad(&mut self) -> bool {
        self.inner.dismiss_ad()
    }

    pub fn teardown(&mut self) {
        self.inner.teardown();
    }

    /// Seconds until the ad can be closed, or -1
    pub fn ad_seconds_left(&self) -> i32 {
        self.inner.ad_seconds_left().map_or(-1, |s| s as i32)
    }

    pub fn next_value(&self) -> u32 {
        self.inner.game().next_value()
    }

    pub fn preview_x(&self) -> f32 {
        self.inner.game().preview_pos().x
    }

    pub fn loss_line_y(&self) -> f32 {
        self.inner.tuning().loss_line_y
    }

    pub fn stats_json(&self) -> String {
        to_json(&self.inner.stats())
    }

    pub fn tiles_json(&self) -> String {
        to_json(&self.inner.tile_views())
    }

    /// Events since the last call, as a JSON array
    pub fn drain_events_json(&mut self) -> String {
        to_json(&self.inner.drain_events())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::warn!("Failed to serialise for JS: {}", e);
        "null".to_string()
    })
}
