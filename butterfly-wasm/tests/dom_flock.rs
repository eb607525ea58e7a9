use butterfly_core::{Butterfly, Flock, FlockConfig, RenderSink, Vector2D, Viewport};
use butterfly_wasm::{mount_flock, DomSink, DEFAULT_CONTAINER_ID};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window()
        .expect("no global window")
        .document()
        .expect("no document")
}

fn append_div(id: &str, style: &str) -> Result<web_sys::HtmlElement, JsValue> {
    let document = document();
    let div = document
        .create_element("div")?
        .dyn_into::<web_sys::HtmlElement>()?;
    div.set_id(id);
    div.set_attribute("style", style)?;
    document.body().expect("no body").append_child(&div)?;
    Ok(div)
}

#[wasm_bindgen_test]
fn missing_container_leaves_page_untouched() {
    let mounted = mount_flock(Some("no-such-flock".to_string()), None).unwrap();
    assert!(!mounted);
    assert!(document().get_element_by_id("no-such-flock").is_none());
}

#[wasm_bindgen_test]
fn mount_creates_one_image_per_butterfly() {
    let container = append_div("flock-mount-test", "position: fixed; inset: 0;").unwrap();

    let mounted = mount_flock(Some("flock-mount-test".to_string()), Some(r#"{ "count": 3 }"#.to_string())).unwrap();
    assert!(mounted);
    assert_eq!(container.child_element_count(), 3);

    let first = container.first_element_child().expect("no butterfly element");
    assert_eq!(first.class_name(), "butterfly");
    let src = first.get_attribute("src").unwrap_or_default();
    assert!(src.starts_with("images/butterfly-"));
}

#[wasm_bindgen_test]
fn mount_without_id_uses_default_container() {
    let container = append_div(DEFAULT_CONTAINER_ID, "position: fixed; inset: 0;").unwrap();

    let mounted = mount_flock(None, Some(r#"{ "count": 2 }"#.to_string())).unwrap();
    assert!(mounted);
    assert_eq!(container.child_element_count(), 2);
}

#[wasm_bindgen_test]
fn invalid_settings_are_reported() {
    append_div("flock-invalid-test", "").unwrap();

    assert!(mount_flock(Some("flock-invalid-test".to_string()), Some("{ not json".to_string())).is_err());
    assert!(mount_flock(Some("flock-invalid-test".to_string()), Some(r#"{ "count": 0 }"#.to_string())).is_err());
}

#[wasm_bindgen_test]
fn dom_sink_centers_elements_on_butterflies() {
    let element = append_div(
        "flock-sink-test",
        "position: absolute; display: block; width: 20px; height: 10px;",
    )
    .unwrap();

    let flock = Flock::from_butterflies(
        FlockConfig::default(),
        Viewport::new(800.0, 600.0),
        [Butterfly::new(
            Vector2D::new(100.0, 50.0),
            Vector2D::zero(),
            Vector2D::zero(),
        )],
    );

    let mut sink = DomSink::from_elements(vec![element.clone()]);
    assert_eq!(sink.len(), 1);
    assert!(!sink.is_empty());
    assert_eq!(sink.rendered_size(0), Vector2D::new(20.0, 10.0));
    flock.render(&mut sink).unwrap();

    let style = element.style();
    assert_eq!(style.get_property_value("left").unwrap(), "90px");
    assert_eq!(style.get_property_value("top").unwrap(), "45px");
    assert!(!style.get_property_value("transform").unwrap().is_empty());
}
