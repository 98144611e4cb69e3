use meme_svg::{render_svg, Attribution, CaptionPair, DeviceClass};

#[test]
fn smoke_render_pending_surface() {
    let svg = render_svg(None, "cat.png", &CaptionPair::default(), DeviceClass::default(), &Attribution::default());
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("<foreignObject"));
    assert!(svg.contains(meme_svg::links::ATTRIBUTION_LABEL));
}
