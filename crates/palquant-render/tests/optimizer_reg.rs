//! Histogram palette optimizer regression test

use palquant_core::color::{self, compose_rgb, compose_rgba};
use palquant_core::{Palette, RgbMap};
use palquant_render::PaletteOptimizer;
use palquant_test::{RegParams, color_gradient, stripes};

#[test]
fn optimizer_reg() {
    let mut rp = RegParams::new("optimizer");

    let pixs = color_gradient(64, 64).unwrap();
    let mut optimizer = PaletteOptimizer::new();
    optimizer.feed_with_image(&pixs, false).unwrap();
    rp.check(!optimizer.histogram().is_exact(), "gradient leaves exact mode");

    for &size in &[2usize, 16, 64, 256] {
        let mut palette = Palette::new(size).unwrap();
        optimizer.calculate(&mut palette, None).unwrap();
        rp.check(
            !palette.is_empty() && palette.len() <= size,
            &format!("palette of {} entries within {size}", palette.len()),
        );
        if rp.display() {
            eprintln!("  size {size}: {} colors", palette.len());
        }
    }

    assert!(rp.cleanup(), "optimizer regression test failed");
}

#[test]
fn optimizer_exact_colors() {
    let mut rp = RegParams::new("optimizer_exact");

    let colors = [
        compose_rgb(12, 200, 7),
        compose_rgb(250, 250, 250),
        compose_rgb(0, 0, 0),
    ];
    let pixs = stripes(9, 2, &colors).unwrap();
    let mut optimizer = PaletteOptimizer::new();
    optimizer.feed_with_image(&pixs, false).unwrap();

    let mut palette = Palette::new(32).unwrap();
    optimizer.calculate(&mut palette, None).unwrap();
    let mut expected = colors.to_vec();
    expected.sort_unstable();
    rp.compare_palettes(&Palette::from_colors(expected).unwrap(), &palette);

    assert!(rp.cleanup(), "optimizer_exact regression test failed");
}

#[test]
fn optimizer_mask_slot() {
    let mut rp = RegParams::new("optimizer_mask");

    let pixs = color_gradient(32, 32).unwrap();
    let mut optimizer = PaletteOptimizer::new();
    optimizer.feed_with_image(&pixs, false).unwrap();

    for mask in [0usize, 5, 15] {
        let mut palette = Palette::new(16).unwrap();
        optimizer.calculate(&mut palette, Some(mask)).unwrap();
        rp.show_palette(&format!("mask {mask}"), &palette);
        rp.check(palette.len() <= 16, "mask keeps the palette size");
        rp.compare_values(0.0, palette.entry(mask).unwrap_or(u32::MAX) as f64, 0.0);
        let opaque = palette
            .colors()
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != mask)
            .all(|(_, &c)| color::alpha(c) == 255);
        rp.check(opaque, "every other entry is opaque");

        // An RgbMap built with the mask never maps visible colors to it.
        let map = RgbMap::new(&palette, Some(mask)).unwrap();
        let hits = pixs
            .data()
            .iter()
            .filter(|&&c| {
                let (r, g, b, a) = color::extract_rgba(c);
                map.map_color(r, g, b, a) == mask
            })
            .count();
        rp.compare_values(0.0, hits as f64, 0.0);
    }

    assert!(rp.cleanup(), "optimizer_mask regression test failed");
}

#[test]
fn optimizer_alpha() {
    let mut rp = RegParams::new("optimizer_alpha");

    let pixs = stripes(
        4,
        4,
        &[
            compose_rgba(255, 0, 0, 255),
            compose_rgba(255, 0, 0, 96),
            compose_rgba(0, 0, 0, 0),
            compose_rgba(0, 0, 255, 255),
        ],
    )
    .unwrap();

    let mut with_alpha = PaletteOptimizer::new();
    with_alpha.feed_with_image(&pixs, true).unwrap();
    let mut palette = Palette::new(8).unwrap();
    with_alpha.calculate(&mut palette, None).unwrap();
    rp.compare_values(3.0, palette.len() as f64, 0.0);
    rp.check(
        palette.colors().contains(&compose_rgba(255, 0, 0, 96)),
        "translucent red kept",
    );

    let mut opaque = PaletteOptimizer::new();
    opaque.feed_with_image(&pixs, false).unwrap();
    let mut palette = Palette::new(8).unwrap();
    opaque.calculate(&mut palette, None).unwrap();
    rp.compare_values(2.0, palette.len() as f64, 0.0);

    assert!(rp.cleanup(), "optimizer_alpha regression test failed");
}

#[test]
fn optimizer_merge() {
    let mut rp = RegParams::new("optimizer_merge");

    let top = color_gradient(30, 10).unwrap();
    let bottom = stripes(30, 10, &[compose_rgb(1, 2, 3), compose_rgb(200, 100, 0)]).unwrap();

    let mut whole = PaletteOptimizer::new();
    whole.feed_with_image(&top, false).unwrap();
    whole.feed_with_image(&bottom, false).unwrap();

    let mut a = PaletteOptimizer::new();
    a.feed_with_image(&top, false).unwrap();
    let mut b = PaletteOptimizer::new();
    b.feed_with_image(&bottom, false).unwrap();
    a.merge(&b);

    let mut expected = Palette::new(12).unwrap();
    let mut merged = Palette::new(12).unwrap();
    whole.calculate(&mut expected, None).unwrap();
    a.calculate(&mut merged, None).unwrap();
    rp.compare_palettes(&expected, &merged);

    assert!(rp.cleanup(), "optimizer_merge regression test failed");
}
