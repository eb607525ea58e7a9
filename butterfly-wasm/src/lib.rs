use std::cell::RefCell;
use std::rc::Rc;

use butterfly_core::{Flock, Timestamp, Vector2D, Viewport};
use butterfly_shared::FlockSettings;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MouseEvent, Window};

mod dom_sink;
pub use dom_sink::{css_transform, DomSink};

/// Element id the page reserves for the flock
pub const DEFAULT_CONTAINER_ID: &str = "butterfly-flock";

struct FlockHost {
    flock: Flock,
    sink: DomSink,
}

type SharedHost = Rc<RefCell<FlockHost>>;

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
}

/// Starts the butterfly flock inside the element with `container_id`
/// (`DEFAULT_CONTAINER_ID` when omitted).
///
/// Returns `false` and does nothing when the element is missing. The
/// listeners and animation loop live for the rest of the page.
#[wasm_bindgen(js_name = mountFlock)]
pub fn mount_flock(
    container_id: Option<String>,
    settings_json: Option<String>,
) -> Result<bool, JsValue> {
    let container_id = container_id.as_deref().unwrap_or(DEFAULT_CONTAINER_ID);
    let window = web_sys::window().ok_or("no global window")?;
    let document = window.document().ok_or("no document")?;

    let Some(container) = document.get_element_by_id(container_id) else {
        log::debug!("No #{} element, butterflies stay off", container_id);
        return Ok(false);
    };

    let settings = match settings_json {
        Some(json) => FlockSettings::from_json(&json).map_err(|e| JsValue::from_str(&e.to_string()))?,
        None => FlockSettings::default(),
    };
    let config = settings
        .to_config()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let flock = Flock::new(config, viewport(&window), &mut rand::thread_rng());
    let sink = DomSink::create(&document, &container, &flock, &settings)?;
    let count = sink.len();
    let host = Rc::new(RefCell::new(FlockHost { flock, sink }));

    listen_pointer(&window, &host)?;
    listen_resize(&window, &host)?;
    start_animation(&window, host)?;

    log::info!("Mounted {} butterflies in #{}", count, container_id);
    Ok(true)
}

fn now(window: &Window) -> Timestamp {
    let millis = window
        .performance()
        .map(|performance| performance.now())
        .unwrap_or_else(js_sys::Date::now);
    Timestamp::from_millis(millis)
}

fn viewport(window: &Window) -> Viewport {
    let dimension = |value: Result<JsValue, JsValue>| {
        value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as f32
    };
    Viewport::new(
        dimension(window.inner_width()),
        dimension(window.inner_height()),
    )
}

fn listen_pointer(window: &Window, host: &SharedHost) -> Result<(), JsValue> {
    let document = window.document().ok_or("no document")?;
    let host = host.clone();
    let clock = window.clone();

    let on_move = Closure::wrap(Box::new(move |event: MouseEvent| {
        let position = Vector2D::new(event.client_x() as f32, event.client_y() as f32);
        host.borrow_mut().flock.pointer_moved(position, now(&clock));
    }) as Box<dyn FnMut(MouseEvent)>);

    document.add_event_listener_with_callback("mousemove", on_move.as_ref().unchecked_ref())?;
    on_move.forget();
    Ok(())
}

fn listen_resize(window: &Window, host: &SharedHost) -> Result<(), JsValue> {
    let host = host.clone();
    let source = window.clone();

    let on_resize = Closure::wrap(Box::new(move || {
        let viewport = viewport(&source);
        host.borrow_mut().flock.resized(viewport);
        log::debug!("Resized to {}x{}", viewport.width, viewport.height);
    }) as Box<dyn FnMut()>);

    window.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())?;
    on_resize.forget();
    Ok(())
}

/// Runs one flock frame per repaint, re-requesting itself each time
fn start_animation(window: &Window, host: SharedHost) -> Result<(), JsValue> {
    let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = callback.clone();
    let frame_window = window.clone();

    *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        {
            let mut guard = host.borrow_mut();
            let FlockHost { flock, sink } = &mut *guard;
            if let Err(e) = flock.frame(now(&frame_window), sink) {
                log::warn!("Failed to render butterflies: {:?}", e);
            }
        }

        if let Some(next_frame) = next.borrow().as_ref() {
            if let Err(e) = request_frame(&frame_window, next_frame) {
                log::error!("Animation loop stopped: {:?}", e);
            }
        }
    }) as Box<dyn FnMut()>));

    // The RefCell borrow must end before `callback` drops at the end of the function
    let started = match callback.borrow().as_ref() {
        Some(frame) => request_frame(window, frame),
        None => Ok(()),
    };
    started
}

fn request_frame(window: &Window, frame: &Closure<dyn FnMut()>) -> Result<(), JsValue> {
    window
        .request_animation_frame(frame.as_ref().unchecked_ref())
        .map(|_| ())
}
