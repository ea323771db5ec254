// Test serialization using json
#![cfg(feature = "serde")]

use sdf_text::{AnchorX, AnchorY, Direction, EngineConfig, LineHeight, Rect, TextAlign, Vec2};
use serde::{de::Deserialize, ser::Serialize};
use std::cmp::PartialEq;
use std::fmt::Debug;

fn test<X: Debug + PartialEq + Serialize + for<'a> Deserialize<'a>>(x: X, t: &str) {
    match serde_json::to_string(&x) {
        Ok(text) => assert_eq!(text, t),
        Err(err) => panic!("Ser of '{x:?}' failed: {err}"),
    }

    match serde_json::from_str::<X>(t) {
        Ok(v) => assert_eq!(v, x),
        Err(err) => panic!("Deser of '{t}' failed: {err}"),
    }
}

#[test]
fn vec2() {
    test(Vec2(1.0, 2.0), "[1.0,2.0]");
}

#[test]
fn rect() {
    test(
        Rect::new(0.0, 1.0, 2.0, 3.0),
        "{\"min_x\":0.0,\"min_y\":1.0,\"max_x\":2.0,\"max_y\":3.0}",
    );
}

#[test]
fn options() {
    test(Direction::Rtl, "\"Rtl\"");
    test(TextAlign::Justify, "\"Justify\"");
    test(LineHeight::Multiple(1.5), "{\"Multiple\":1.5}");
    test(AnchorX::Percent(50.0), "{\"Percent\":50.0}");
    test(AnchorY::TopBaseline, "\"TopBaseline\"");
}

#[test]
fn config_round_trip() {
    let config = EngineConfig {
        base_url: Some("https://example.com/fonts".into()),
        sdf_glyph_size: 32,
        use_accelerated: false,
        ..Default::default()
    };
    let text = serde_json::to_string(&config).unwrap();
    let back: EngineConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
}

#[test]
fn config_missing_fields_take_defaults() {
    let config: EngineConfig = serde_json::from_str("{\"pool_size\":2}").unwrap();
    assert_eq!(config.pool_size, 2);
    assert_eq!(config.sdf_glyph_size, EngineConfig::default().sdf_glyph_size);
    assert_eq!(config.default_font_url, sdf_text::DEFAULT_FONT_URL);
}
