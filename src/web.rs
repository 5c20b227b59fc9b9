use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo::events::EventListener;
use gloo::net::http::{Request, Response};
use gloo::render::{request_animation_frame, AnimationFrame};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, KeyboardEvent};

use crate::bridge::{self, BridgeError, NetworkPolicy, ENV_PATH, REDIS_PATH, SCORE_PATH};
use crate::game::{Session, Step};
use crate::render::{self, Surface};
use crate::settings::GameSettings;
use crate::{log, log_error};

const BOARD_ID: &str = "game";
const PREVIEW_IDS: [&str; 2] = ["next-block-1", "next-block-2"];
const SCORE_IDS: [&str; 2] = ["score", "highscore"];

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
}

fn network(e: gloo::net::Error) -> BridgeError {
    BridgeError::Network(e.to_string())
}

#[derive(Clone)]
struct HttpBridge {
    base: String,
}

impl HttpBridge {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn text(path: &str, resp: Response) -> Result<String, BridgeError> {
        if !resp.ok() {
            return Err(BridgeError::Status {
                path: path.to_string(),
                status: resp.status(),
            });
        }
        resp.text().await.map_err(network)
    }

    async fn get_text(&self, path: &str) -> Result<String, BridgeError> {
        let resp = Request::get(&self.url(path)).send().await.map_err(network)?;
        Self::text(path, resp).await
    }

    async fn get_score(&self) -> Result<u32, BridgeError> {
        bridge::parse_score(&self.get_text(SCORE_PATH).await?)
    }

    async fn post_score(&self, score: u32) -> Result<u32, BridgeError> {
        let resp = Request::post(&self.url(SCORE_PATH))
            .body(score.to_string())
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;
        bridge::parse_score(&Self::text(SCORE_PATH, resp).await?)
    }

    async fn debug_report(&self) -> Result<String, BridgeError> {
        let env = self.get_text(ENV_PATH).await?;
        let redis = self.get_text(REDIS_PATH).await?;
        Ok(bridge::debug_report(&env, &redis))
    }
}

struct Canvas {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Canvas {
    fn find(document: &Document, id: &str) -> Option<Canvas> {
        let canvas = document
            .get_element_by_id(id)?
            .dyn_into::<HtmlCanvasElement>()
            .ok()?;
        let ctx = canvas
            .get_context("2d")
            .ok()??
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        Some(Self { canvas, ctx })
    }
}

impl Surface for Canvas {
    fn width(&self) -> f64 {
        self.canvas.width() as f64
    }

    fn height(&self) -> f64 {
        self.canvas.height() as f64
    }

    fn clear(&mut self) {
        self.ctx.clear_rect(0.0, 0.0, self.width(), self.height());
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str, alpha: f64) {
        self.ctx.set_global_alpha(alpha);
        self.ctx.set_fill_style_str(color);
        self.ctx.fill_rect(x, y, w, h);
        self.ctx.set_global_alpha(1.0);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str, font: &str) {
        self.ctx.set_fill_style_str(color);
        self.ctx.set_font(font);
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        let _ = self.ctx.fill_text(text, x, y);
    }
}

fn set_text(document: &Document, id: &str, text: &str) {
    match document.get_element_by_id(id) {
        Some(el) => el.set_text_content(Some(text)),
        None => log_error(&format!("#{} element not found!", id)),
    }
}

fn set_display(document: &Document, id: &str, display: &str) {
    let Some(el) = document
        .get_element_by_id(id)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
    else {
        log_error(&format!("#{} element not found!", id));
        return;
    };
    let _ = el.style().set_property("display", display);
}

struct App {
    document: Document,
    session: RefCell<Session>,
    board: RefCell<Canvas>,
    previews: RefCell<Vec<Canvas>>,
    bridge: HttpBridge,
    policy: NetworkPolicy,
    last_frame: Cell<Option<f64>>,
    frame: RefCell<Option<AnimationFrame>>,
    listeners: RefCell<Vec<EventListener>>,
}

impl App {
    fn schedule(self: &Rc<Self>) {
        let app = Rc::clone(self);
        let handle = request_animation_frame(move |timestamp| app.on_frame(timestamp));
        *self.frame.borrow_mut() = Some(handle);
    }

    fn on_frame(self: &Rc<Self>, timestamp: f64) {
        self.frame.borrow_mut().take();
        let dt_ms = match self.last_frame.replace(Some(timestamp)) {
            Some(prev) => (timestamp - prev).max(0.0),
            None => 0.0,
        };
        let game_over = {
            let mut session = self.session.borrow_mut();
            // gravity first, so the ghost and piece are drawn where they rest this frame
            session.advance(dt_ms);
            session.is_game_over()
        };
        self.render();
        if game_over {
            self.finish();
        } else {
            self.schedule();
        }
    }

    fn render(&self) {
        let session = self.session.borrow();
        render::draw_frame(
            &mut *self.board.borrow_mut(),
            self.previews.borrow_mut().as_mut_slice(),
            &session,
        );
        self.update_scores(&session);
    }

    // Runs every frame; missing elements were already reported by `run`.
    fn update_scores(&self, session: &Session) {
        let values = [session.score(), session.high_score()];
        for (id, value) in SCORE_IDS.iter().zip(values) {
            if let Some(el) = self.document.get_element_by_id(id) {
                el.set_text_content(Some(&format!("{:08}", value)));
            }
        }
    }

    fn finish(self: &Rc<Self>) {
        let (score, writeback) = {
            let mut session = self.session.borrow_mut();
            (session.score(), session.take_high_score_writeback())
        };
        log(&format!("game over, score {}", score));
        let Some(high) = writeback else {
            return;
        };
        let bridge = self.bridge.clone();
        let policy = self.policy;
        spawn_local(async move {
            let saved = policy
                .run("save high score", || {
                    let bridge = bridge.clone();
                    async move { bridge.post_score(high).await }
                })
                .await;
            if let Some(kept) = saved {
                log(&format!("high score on server: {}", kept));
            }
        });
    }

    fn on_key(&self, event: &KeyboardEvent) {
        let command = self
            .session
            .borrow()
            .settings()
            .controls
            .command_for(&event.code());
        let Some(command) = command else {
            return;
        };
        event.prevent_default();
        if self.session.borrow_mut().apply(command) == Step::GameOver {
            log("topped out");
        }
    }

    fn load_high_score(self: &Rc<Self>) {
        let app = Rc::clone(self);
        spawn_local(async move {
            let bridge = app.bridge.clone();
            let stored = app
                .policy
                .run("load high score", || {
                    let bridge = bridge.clone();
                    async move { bridge.get_score().await }
                })
                .await;
            if let Some(stored) = stored {
                app.session.borrow_mut().load_high_score(stored);
                app.update_scores(&app.session.borrow());
            }
        });
    }

    fn show_debug(self: &Rc<Self>) {
        let app = Rc::clone(self);
        spawn_local(async move {
            let bridge = app.bridge.clone();
            let report = app
                .policy
                .run("fetch debug info", || {
                    let bridge = bridge.clone();
                    async move { bridge.debug_report().await }
                })
                .await;
            if let Some(report) = report {
                set_text(&app.document, "debug-info", &report);
                set_display(&app.document, "debug-modal", "block");
            }
        });
    }

    fn wire(self: &Rc<Self>) {
        let mut listeners = Vec::new();

        let app = Rc::clone(self);
        listeners.push(EventListener::new(&self.document, "keydown", move |event| {
            if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
                app.on_key(event);
            }
        }));

        match self.document.get_element_by_id("debug-button") {
            Some(button) => {
                let app = Rc::clone(self);
                listeners.push(EventListener::new(&button, "click", move |_| {
                    app.show_debug()
                }));
            }
            None => log_error("#debug-button element not found!"),
        }

        match self.document.get_element_by_id("close-debug") {
            Some(button) => {
                let document = self.document.clone();
                listeners.push(EventListener::new(&button, "click", move |_| {
                    set_display(&document, "debug-modal", "none")
                }));
            }
            None => log_error("#close-debug element not found!"),
        }

        match self.document.get_element_by_id("mode-toggle") {
            Some(toggle) => {
                let document = self.document.clone();
                listeners.push(EventListener::new(&toggle, "click", move |_| {
                    if let Some(body) = document.body() {
                        let _ = body.class_list().toggle("light-mode");
                    }
                }));
            }
            None => log_error("#mode-toggle element not found!"),
        }

        *self.listeners.borrow_mut() = listeners;
    }
}

/// Starts the self-driven game on the current page. `base_url` prefixes the
/// score and debug endpoints (empty for same origin).
#[wasm_bindgen]
pub fn run(settings: JsValue, base_url: Option<String>) -> Result<(), JsValue> {
    let settings: GameSettings = from_value(settings).unwrap_or_default();
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let board = Canvas::find(&document, BOARD_ID)
        .ok_or_else(|| JsValue::from_str("missing <canvas id=\"game\">"))?;
    let previews = PREVIEW_IDS
        .iter()
        .filter_map(|id| {
            let canvas = Canvas::find(&document, id);
            if canvas.is_none() {
                log_error(&format!("#{} canvas not found!", id));
            }
            canvas
        })
        .collect();
    set_display(&document, "debug-modal", "none");
    for id in SCORE_IDS {
        if document.get_element_by_id(id).is_none() {
            log_error(&format!("#{} element not found!", id));
        }
    }

    let policy = settings.network;
    let app = Rc::new(App {
        document,
        session: RefCell::new(Session::new(settings)),
        board: RefCell::new(board),
        previews: RefCell::new(previews),
        bridge: HttpBridge {
            base: base_url.unwrap_or_default(),
        },
        policy,
        last_frame: Cell::new(None),
        frame: RefCell::new(None),
        listeners: RefCell::new(Vec::new()),
    });
    app.wire();
    app.update_scores(&app.session.borrow());
    app.load_high_score();
    app.schedule();
    Ok(())
}

/// Session handle for pages that run their own loop and drawing.
#[wasm_bindgen]
pub struct GameClient {
    session: Session,
}

#[wasm_bindgen]
impl GameClient {
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue) -> GameClient {
        let settings: GameSettings = from_value(settings).unwrap_or_default();
        Self {
            session: Session::new(settings),
        }
    }

    #[wasm_bindgen(js_name = tick)]
    pub fn tick(&mut self, dt_ms: f64) -> Result<JsValue, JsValue> {
        self.session.advance(dt_ms);
        to_value(&self.session.view()).map_err(|e| e.into())
    }

    /// Applies the command bound to `code`; false when unbound or rejected.
    #[wasm_bindgen(js_name = keyDown)]
    pub fn key_down(&mut self, code: &str) -> bool {
        let command = self.session.settings().controls.command_for(code);
        match command {
            Some(command) => self.session.apply(command) != Step::Rejected,
            None => false,
        }
    }

    #[wasm_bindgen(js_name = loadHighScore)]
    pub fn load_high_score(&mut self, score: u32) {
        self.session.load_high_score(score);
    }

    #[wasm_bindgen(js_name = takeHighScoreWriteback)]
    pub fn take_high_score_writeback(&mut self) -> Option<u32> {
        self.session.take_high_score_writeback()
    }

    #[wasm_bindgen(js_name = isGameOver)]
    pub fn is_game_over(&self) -> bool {
        self.session.is_game_over()
    }

    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.view()).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
