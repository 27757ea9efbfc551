//! Brick Quest entry point
//!
//! Browser driver on wasm32, scripted headless run natively.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, KeyboardEvent};

    use brick_quest::audio::{AudioManager, sound_for};
    use brick_quest::consts::*;
    use brick_quest::renderer::RenderState;
    use brick_quest::settings::Settings;
    use brick_quest::sim::{Assets, GamePhase, Hud, Session, TickInput};

    /// Game instance holding all state
    struct Game {
        session: Session,
        settings: Settings,
        render_state: Option<RenderState>,
        audio: AudioManager,
        accumulator: f32,
        last_time: f64,
        input: TickInput,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
        /// Last HUD pushed to the DOM, to skip unchanged writes
        shown: Option<Hud>,
    }

    impl Game {
        fn new(settings: Settings, seed: u64) -> Self {
            let session = Session::with_tunings(seed, Assets::all(), settings.levels.clone());
            Self {
                session,
                audio: AudioManager::new(&settings),
                settings,
                render_state: None,
                accumulator: 0.0,
                last_time: 0.0,
                input: TickInput::default(),
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
                shown: None,
            }
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32, time: f64) {
            self.accumulator += dt.min(MAX_FRAME_DT);

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                self.session.tick(&self.input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // Edges apply to the first substep only
                self.input.clear();
            }
            if substeps == MAX_SUBSTEPS {
                self.accumulator = self.accumulator.min(SIM_DT);
            }

            for event in self.session.take_events() {
                if let Some(effect) = sound_for(&event) {
                    self.audio.play(effect);
                }
            }

            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (59_000.0 / elapsed).round() as u32;
                }
            }
        }

        /// Render the current frame
        fn render(&mut self) {
            let Some(render_state) = &mut self.render_state else {
                return;
            };
            let sprites = self.session.scene();
            match render_state.render(&sprites, self.session.camera(), self.settings.camera_shake()) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let (w, h) = render_state.size;
                    render_state.resize(w, h);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    log::error!("Out of memory!");
                }
                Err(e) => log::warn!("Render error: {:?}", e),
            }
        }

        /// Push HUD values to the DOM slots
        fn update_hud(&mut self, document: &Document) {
            if self.settings.show_fps {
                set_slot(document, "hud-fps", Some(self.fps.to_string()));
            }

            let hud = self.session.hud();
            if self.shown.as_ref() == Some(&hud) {
                return;
            }

            set_slot(document, "hud-level", Some(hud.level.to_string()));
            set_slot(document, "hud-lives", hud.lives.map(|v| v.to_string()));
            set_slot(document, "hud-health", hud.health_percent.map(|v| format!("{v}%")));
            set_slot(document, "hud-currency", Some(hud.currency.to_string()));
            set_slot(document, "hud-score", Some(hud.score.to_string()));
            set_slot(document, "hud-swords", hud.sword_charges.map(|v| v.to_string()));
            set_slot(document, "hud-boss", hud.boss_health.map(|v| v.to_string()));
            set_slot(document, "hud-shield", hud.shield_ready.map(ready));
            set_slot(document, "hud-fireball", hud.fireball_ready.map(ready));
            set_slot(document, "hud-treasure", hud.treasure.map(found));
            set_slot(document, "hud-potion", hud.potion.map(found));

            show(document, "loading", hud.phase == GamePhase::Loading);
            show(document, "pause-menu", hud.phase == GamePhase::Paused);
            show(document, "game-over", hud.end_message.is_some());
            if let Some(el) = document.get_element_by_id("end-message") {
                el.set_text_content(hud.end_message.as_deref());
            }

            self.shown = Some(hud);
        }

        fn key_down(&mut self, key: &str) -> bool {
            let Some(action) = self.settings.action_for(key) else {
                return false;
            };
            self.audio.resume();
            self.input.press(action);
            true
        }

        fn key_up(&mut self, key: &str) -> bool {
            let Some(action) = self.settings.action_for(key) else {
                return false;
            };
            self.input.release(action);
            true
        }

        fn restart(&mut self) {
            self.session.restart();
            self.accumulator = 0.0;
            self.input = TickInput::default();
            self.shown = None;
        }
    }

    fn ready(flag: bool) -> String {
        if flag { "ready" } else { "cooling" }.to_string()
    }

    fn found(flag: bool) -> String {
        if flag { "found" } else { "-" }.to_string()
    }

    /// Write a value into `#id .hud-value`, hiding the slot when absent
    fn set_slot(document: &Document, id: &str, value: Option<String>) {
        let Some(slot) = document.get_element_by_id(id) else {
            return;
        };
        let _ = slot.set_attribute("class", if value.is_some() { "hud-item" } else { "hud-item hidden" });
        if let Some(el) = document.query_selector(&format!("#{id} .hud-value")).ok().flatten() {
            el.set_text_content(value.as_deref());
        }
    }

    fn show(document: &Document, id: &str, visible: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
        }
    }

    fn js_err(msg: &str) -> JsValue {
        JsValue::from_str(msg)
    }

    pub async fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).map_err(|e| js_err(&e.to_string()))?;

        log::info!("Brick Quest starting...");

        let window = web_sys::window().ok_or_else(|| js_err("no window"))?;
        let document = window.document().ok_or_else(|| js_err("no document"))?;

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or_else(|| js_err("no canvas"))?
            .dyn_into()
            .map_err(|_| js_err("#canvas is not a canvas"))?;

        let (width, height) = fit_canvas(&window, &canvas);

        let settings = Settings::load();
        let seed = settings.seed.unwrap_or_else(|| js_sys::Date::now() as u64);
        let game = Rc::new(RefCell::new(Game::new(settings, seed)));
        log::info!("Game initialized with seed: {}", seed);

        // Initialize WebGPU
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL,
            ..Default::default()
        });
        let surface = instance
            .create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone()))
            .map_err(|e| js_err(&format!("Failed to create surface: {e}")))?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| js_err(&format!("Failed to get adapter: {e}")))?;

        log::info!("Using adapter: {:?}", adapter.get_info().name);

        let render_state = RenderState::new(surface, &adapter, width, height)
            .await
            .map_err(|e| js_err(&e.to_string()))?;
        game.borrow_mut().render_state = Some(render_state);

        if let Some(hud) = document.get_element_by_id("hud") {
            let _ = hud.set_attribute("class", "");
        }

        setup_input_handlers(&window, game.clone());
        setup_restart_button(&document, game.clone());
        setup_auto_pause(&window, &document, game.clone());
        setup_resize(&window, canvas, game.clone());

        request_animation_frame(game);

        log::info!("Brick Quest running!");
        Ok(())
    }

    /// Size the canvas backing store to its CSS size times the pixel ratio
    fn fit_canvas(window: &web_sys::Window, canvas: &HtmlCanvasElement) -> (u32, u32) {
        let dpr = window.device_pixel_ratio();
        let width = ((canvas.client_width() as f64 * dpr) as u32).max(1);
        let height = ((canvas.client_height() as f64 * dpr) as u32).max(1);
        canvas.set_width(width);
        canvas.set_height(height);
        (width, height)
    }

    fn setup_input_handlers(window: &web_sys::Window, game: Rc<RefCell<Game>>) {
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                // Holding a key repeats keydown; only the first one is an edge
                if event.repeat() {
                    return;
                }
                if game.borrow_mut().key_down(&event.key()) {
                    event.prevent_default();
                }
            });
            let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                if game.borrow_mut().key_up(&event.key()) {
                    event.prevent_default();
                }
            });
            let _ = window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt, time);
            g.render();
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                g.update_hud(&document);
            }
        }

        request_animation_frame(game);
    }

    fn setup_restart_button(document: &Document, game: Rc<RefCell<Game>>) {
        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                game.borrow_mut().restart();
                log::info!("Game restarted");
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_auto_pause(window: &web_sys::Window, document: &Document, game: Rc<RefCell<Game>>) {
        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    g.session.set_paused(true);
                    g.input.clear();
                }
            });
            let _ = document.add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Window blur (click outside)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                g.session.set_paused(true);
                g.input.clear();
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_resize(window: &web_sys::Window, canvas: HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Some(window) = web_sys::window() else {
                return;
            };
            let (w, h) = fit_canvas(&window, &canvas);
            if let Some(render_state) = &mut game.borrow_mut().render_state {
                render_state.resize(w, h);
            }
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    if let Err(e) = wasm_game::run().await {
        log::error!("Brick Quest failed to start: {:?}", e);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Brick Quest (native) starting...");
    log::info!("Native mode runs headless - serve the wasm build for the playable version");

    headless_demo();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Drive the session with a scripted run and print what happened
#[cfg(not(target_arch = "wasm32"))]
fn headless_demo() {
    use brick_quest::Settings;
    use brick_quest::consts::SIM_DT;
    use brick_quest::sim::{Action, Assets, GameEvent, Session, TickInput};

    let settings = Settings::load();
    let seed = settings.seed.unwrap_or(2024);
    let mut session = Session::with_tunings(seed, Assets::all(), settings.levels.clone());

    let seconds = 90.0;
    let frames = (seconds / SIM_DT) as u32;
    let mut input = TickInput::default();
    input.press(Action::Forward);
    let (mut jumps, mut coins, mut defeats, mut hits) = (0u32, 0u32, 0u32, 0u32);

    for frame in 0..frames {
        // Hop every 0.75 s, throw every 2 s
        if frame % 90 == 0 {
            input.press(Action::Jump);
        }
        if frame % 240 == 120 {
            input.press(Action::Attack);
        }
        session.tick(&input, SIM_DT);
        input.clear();

        for event in session.take_events() {
            match event {
                GameEvent::Jumped => jumps += 1,
                GameEvent::CoinCollected { .. } | GameEvent::DiamondCollected { .. } => coins += 1,
                GameEvent::EnemyStomped { .. } | GameEvent::EnemyDefeated { .. } => defeats += 1,
                GameEvent::Damaged { .. } => hits += 1,
                GameEvent::LevelEnded(outcome) => log::info!("Level ended: {outcome:?}"),
                _ => {}
            }
        }
        if session.hud().end_message.is_some() && session.pending_handoff().is_none() {
            break;
        }
    }

    let hud = session.hud();
    println!("\nHeadless run (seed {seed}):");
    println!("  level {}  phase {:?}", hud.level, hud.phase);
    println!("  reached z {:.1}", session.state().furthest_z);
    println!("  jumps {jumps}  pickups {coins}  defeats {defeats}  hits {hits}");
    println!("  score {}  currency {}", hud.score, hud.currency);
    if let Some(message) = hud.end_message {
        println!("  {message}");
    }
}
