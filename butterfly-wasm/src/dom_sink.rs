use butterfly_core::{Flock, RenderSink, Transform, Vector2D};
use butterfly_shared::FlockSettings;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement};

/// Renders butterflies by writing inline styles on one element each
pub struct DomSink {
    elements: Vec<HtmlElement>,
}

impl DomSink {
    /// Appends one `<img class="butterfly">` per butterfly to `container`,
    /// sized and sourced from the butterfly's variant.
    pub fn create(
        document: &Document,
        container: &Element,
        flock: &Flock,
        settings: &FlockSettings,
    ) -> Result<DomSink, JsValue> {
        let mut elements = Vec::with_capacity(flock.len());

        for butterfly in flock.butterflies() {
            let img = document
                .create_element("img")?
                .dyn_into::<HtmlImageElement>()?;
            img.set_class_name("butterfly");
            img.set_alt("");
            if let Some(variant) = settings.variant(butterfly.variant()) {
                img.set_src(&variant.src);
            }

            let size = format!("{}px", butterfly.size());
            let style = img.style();
            style.set_property("width", &size)?;
            style.set_property("height", &size)?;

            container.append_child(&img)?;
            elements.push(img.into());
        }

        Ok(DomSink { elements })
    }

    pub fn from_elements(elements: Vec<HtmlElement>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl RenderSink for DomSink {
    type Error = JsValue;

    fn rendered_size(&self, index: usize) -> Vector2D {
        self.elements
            .get(index)
            .map(|el| Vector2D::new(el.offset_width() as f32, el.offset_height() as f32))
            .unwrap_or_default()
    }

    fn set_position(&mut self, index: usize, top_left: Vector2D) -> Result<(), JsValue> {
        let Some(el) = self.elements.get(index) else {
            return Ok(());
        };
        let style = el.style();
        style.set_property("left", &format!("{}px", top_left.x))?;
        style.set_property("top", &format!("{}px", top_left.y))?;
        Ok(())
    }

    fn set_transform(&mut self, index: usize, transform: Transform) -> Result<(), JsValue> {
        let Some(el) = self.elements.get(index) else {
            return Ok(());
        };
        el.style().set_property("transform", &css_transform(transform))
    }
}

/// CSS for a horizontal flip composed with a uniform scale
pub fn css_transform(transform: Transform) -> String {
    format!("scaleX({}) scale({})", transform.flip, transform.scale)
}
