use textanim::catalog::StyleCatalog;
use textanim::color::Color;
use textanim::error::AnimError;
use textanim::renderer::StyleRenderer;
use textanim::request::{CanvasSize, RenderRequest};
use textanim::sequence::{generate, FrameSequenceGenerator};
use textanim::styles::FrameContext;

fn request(text: &str, style: &str, fps: u32, duration: f32) -> RenderRequest {
    let style = StyleCatalog::builtin()
        .get(style)
        .expect("builtin style should exist")
        .clone();
    RenderRequest::new(text, style)
        .with_fps(fps)
        .with_duration(duration)
        .with_canvas(CanvasSize::new(64, 32))
}

#[test]
fn every_style_yields_exactly_total_frames_at_canvas_size() {
    let renderer = StyleRenderer::default();
    for key in StyleCatalog::builtin().keys() {
        let request = request("Go", key, 15, 1.0);
        let frames = generate(&renderer, &request).expect("valid request should render");
        assert_eq!(frames.len(), 15, "style {key}");
        for frame in &frames {
            assert_eq!(frame.canvas(), CanvasSize::new(64, 32), "style {key}");
            assert_eq!(frame.data().len(), 64 * 32 * 3);
        }
    }
}

#[test]
fn fractional_duration_rounds_to_nearest_frame() {
    let renderer = StyleRenderer::default();
    let request = request("Go", "bounce", 24, 1.27);
    let generator = FrameSequenceGenerator::new(&renderer, &request).expect("valid");
    assert_eq!(generator.total_frames(), 30);
    assert_eq!(generator.frames().count(), 30);
}

#[test]
fn hello_typewriter_starts_blank_and_ends_complete() {
    let renderer = StyleRenderer::default();
    let request = RenderRequest::new(
        "Hello",
        StyleCatalog::builtin()
            .get("typewriter")
            .expect("style")
            .clone(),
    )
    .with_fps(20)
    .with_duration(1.0);

    let generator = FrameSequenceGenerator::new(&renderer, &request).expect("valid");
    assert_eq!(generator.total_frames(), 20);

    let first = renderer
        .plan(&request.text, &request.style, &FrameContext::for_request(&request, 0))
        .expect("plan");
    assert!(first.draws.is_empty());

    let last = renderer
        .plan(&request.text, &request.style, &FrameContext::for_request(&request, 19))
        .expect("plan");
    assert_eq!(last.draws.len(), 1);
    assert_eq!(last.draws[0].text, "Hello");

    let frames = generator.generate().expect("render");
    assert!(frames[0].is_uniform(Color::BLACK));
    assert!(!frames[19].is_uniform(Color::BLACK));
}

#[test]
fn empty_text_renders_background_only_for_every_style() {
    let renderer = StyleRenderer::default();
    for style in StyleCatalog::builtin().iter() {
        let request = request("", &style.key, 20, 1.0);
        let frames = generate(&renderer, &request).expect("empty text is valid");
        assert_eq!(frames.len(), 20);
        for frame in frames {
            assert!(frame.is_uniform(style.background), "style {}", style.key);
        }
    }
}

#[test]
fn zero_fps_or_duration_is_rejected_before_rendering() {
    let renderer = StyleRenderer::default();
    for request in [
        request("Hi", "neon", 0, 1.0),
        request("Hi", "neon", 20, 0.0),
    ] {
        let error = match FrameSequenceGenerator::new(&renderer, &request) {
            Ok(_) => panic!("request should be rejected"),
            Err(error) => error,
        };
        assert!(matches!(error, AnimError::InvalidRequest(_)), "{error}");
    }
}

#[test]
fn out_of_bounds_requests_are_invalid() {
    let renderer = StyleRenderer::default();
    let too_long = "x".repeat(101);
    let cases = [
        request("Hi", "bounce", 61, 1.0),
        request("Hi", "bounce", 20, 10.5),
        request(&too_long, "bounce", 20, 1.0),
        request("Hi", "bounce", 20, 1.0).with_canvas(CanvasSize::new(63, 32)),
    ];
    for request in cases {
        let error = generate(&renderer, &request).expect_err("out of bounds");
        assert!(matches!(error, AnimError::InvalidRequest(_)), "{error}");
    }
}

#[test]
fn sequence_can_be_abandoned_part_way() {
    let renderer = StyleRenderer::default();
    let request = request("Stop", "rainbow", 30, 10.0);
    let generator = FrameSequenceGenerator::new(&renderer, &request).expect("valid");
    let taken = generator
        .frames()
        .take(3)
        .collect::<Result<Vec<_>, _>>()
        .expect("render");
    assert_eq!(taken.len(), 3);
    assert_eq!(generator.frames().len(), 300);
}
