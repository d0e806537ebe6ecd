#![cfg(target_arch = "wasm32")]

use foundation::{FeatureId, LayerId, Millis};
use js_sys::{Function, Object, Reflect};
use pretty_assertions::assert_eq;
use scene::{Pixel, RenderSurface};
use viewport_web::browser::{BrowserTimer, JsSurface};
use viewport_web::loader::Timer;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

fn surface_returning(hits: &str) -> JsSurface {
    let obj = Object::new();
    let body = format!("return new Float64Array({hits});");
    Reflect::set(
        &obj,
        &JsValue::from_str("featuresAtPixel"),
        &Function::new_with_args("x, y", &body),
    )
    .expect("set featuresAtPixel");
    obj.unchecked_into()
}

#[wasm_bindgen_test]
fn hits_with_non_integer_ids_are_skipped() {
    let surface = surface_returning("[1, 2, 2.5, 3, -1, 4, 7, 8, 1e20, 0, 9]");
    let mut hits = Vec::new();
    surface.for_each_feature_at_pixel(Pixel::new(0.0, 0.0), &mut |f, l| hits.push((f, l)));
    assert_eq!(
        hits,
        vec![
            (FeatureId(1), LayerId(2)),
            (FeatureId(7), LayerId(8)),
        ]
    );
}

#[wasm_bindgen_test]
async fn browser_timer_settles() {
    BrowserTimer.sleep(Millis(1)).await;
}
