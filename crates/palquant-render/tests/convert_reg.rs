//! Pixel format conversion regression test
//!
//! Covers every format pair, dithering and cancellation.

use palquant_core::color::{self, compose_graya, compose_rgb, compose_rgba};
use palquant_core::{Image, Palette, PixelFormat, RgbMap};
use palquant_render::{
    ConvertOptions, DitheringAlgorithm, DitheringMatrix, TaskDelegate, TaskStatus,
    convert_pixel_format,
};
use palquant_test::{RegParams, color_gradient, rgb_image_from_fn, solid_image};

/// Cancels once `limit` rows were reported.
struct CancelAfterRows {
    limit: usize,
    reports: Vec<f64>,
}

impl TaskDelegate for CancelAfterRows {
    fn is_canceled(&self) -> bool {
        self.reports.len() >= self.limit
    }

    fn report_progress(&mut self, fraction: f64) {
        self.reports.push(fraction);
    }
}

fn gray_ramp_palette(levels: u32) -> Palette {
    let colors = (0..levels)
        .map(|i| {
            let v = (i * 255 / (levels - 1)) as u8;
            compose_rgb(v, v, v)
        })
        .collect();
    Palette::from_colors(colors).unwrap()
}

#[test]
fn convert_reg() {
    let mut rp = RegParams::new("convert");

    let pixs = color_gradient(20, 12).unwrap();
    let palette = gray_ramp_palette(16);

    // Rgb -> Grayscale -> Rgb keeps gray images intact
    let gray_src = rgb_image_from_fn("gray", 16, 4, |x, y| {
        let v = (x * 16 + y) as u8;
        compose_rgb(v, v, v)
    })
    .unwrap();
    let options = ConvertOptions {
        format: PixelFormat::Grayscale,
        ..Default::default()
    };
    let gray = convert_pixel_format(&gray_src, None, None, &palette, &options, None).unwrap();
    rp.check(gray.image.format() == PixelFormat::Grayscale, "grayscale output");
    let options = ConvertOptions {
        format: PixelFormat::Rgb,
        ..Default::default()
    };
    let back = convert_pixel_format(&gray.image, None, None, &palette, &options, None).unwrap();
    rp.compare_images(&gray_src, &back.image);

    // Rgb -> Indexed with and without an RgbMap agree on exact palette colors
    let exact = rgb_image_from_fn("exact", 16, 1, |x, _| palette.entry(x as usize).unwrap()).unwrap();
    let options = ConvertOptions {
        is_background: true,
        ..Default::default()
    };
    let scan = convert_pixel_format(&exact, None, None, &palette, &options, None).unwrap();
    let map = RgbMap::new(&palette, None).unwrap();
    let mapped = convert_pixel_format(&exact, None, Some(&map), &palette, &options, None).unwrap();
    let expected = Image::from_pixels(16, 1, PixelFormat::Indexed, (0..16).collect()).unwrap();
    rp.compare_images(&expected, &scan.image);
    rp.compare_images(&expected, &mapped.image);

    // Indexed values stay inside the palette
    let indexed = convert_pixel_format(&pixs, None, None, &palette, &options, None).unwrap();
    rp.check(
        indexed.image.data().iter().all(|&i| (i as usize) < palette.len()),
        "indices inside the palette",
    );

    // Same format is a copy
    let options = ConvertOptions {
        format: PixelFormat::Rgb,
        ..Default::default()
    };
    let copy = convert_pixel_format(&pixs, None, None, &palette, &options, None).unwrap();
    rp.compare_images(&pixs, &copy.image);

    assert!(rp.cleanup(), "convert regression test failed");
}

#[test]
fn convert_transparency() {
    let mut rp = RegParams::new("convert_transparency");

    let palette = Palette::from_colors(vec![
        compose_rgb(0, 0, 0),
        compose_rgb(255, 255, 255),
        color::TRANSPARENT,
    ])
    .unwrap();
    let pixs = Image::from_pixels(
        3,
        1,
        PixelFormat::Rgb,
        vec![compose_rgba(10, 10, 10, 0), compose_rgb(250, 250, 250), compose_rgb(3, 3, 3)],
    )
    .unwrap();

    // Transparent layer: alpha 0 goes to the mask index
    let layer = ConvertOptions {
        mask_color: Some(2),
        ..Default::default()
    };
    let out = convert_pixel_format(&pixs, None, None, &palette, &layer, None).unwrap();
    rp.compare_images(
        &Image::from_pixels(3, 1, PixelFormat::Indexed, vec![2, 1, 0]).unwrap(),
        &out.image,
    );

    // And back: the mask index becomes transparent
    let to_rgb = ConvertOptions {
        format: PixelFormat::Rgb,
        ..layer.clone()
    };
    let back = convert_pixel_format(&out.image, None, None, &palette, &to_rgb, None).unwrap();
    rp.compare_values(0.0, back.image.data()[0] as f64, 0.0);
    rp.compare_colors(compose_rgb(255, 255, 255), back.image.data()[1], 0);

    // Background: no mask, colors map as opaque
    let background = ConvertOptions {
        is_background: true,
        ..layer
    };
    let out = convert_pixel_format(&pixs, None, None, &palette, &background, None).unwrap();
    rp.compare_values(0.0, out.image.data()[0] as f64, 0.0);

    // Grayscale keeps alpha
    let gray = Image::from_pixels(
        2,
        1,
        PixelFormat::Grayscale,
        vec![compose_graya(128, 64), compose_graya(7, 0)],
    )
    .unwrap();
    let to_rgb = ConvertOptions {
        format: PixelFormat::Rgb,
        ..Default::default()
    };
    let rgb = convert_pixel_format(&gray, None, None, &palette, &to_rgb, None).unwrap();
    rp.compare_colors(compose_rgba(128, 128, 128, 64), rgb.image.data()[0], 0);
    rp.compare_values(0.0, rgb.image.data()[1] as f64, 0.0);

    assert!(rp.cleanup(), "convert_transparency regression test failed");
}

#[test]
fn convert_dithering() {
    let mut rp = RegParams::new("convert_dither");

    let palette = gray_ramp_palette(2);
    let pixs = solid_image(16, 16, compose_rgb(128, 128, 128)).unwrap();

    let mut counts = Vec::new();
    for dithering in [
        DitheringAlgorithm::None,
        DitheringAlgorithm::Ordered,
        DitheringAlgorithm::Old,
    ] {
        let options = ConvertOptions {
            dithering,
            matrix: DitheringMatrix::bayer(8).unwrap(),
            is_background: true,
            ..Default::default()
        };
        let out = convert_pixel_format(&pixs, None, None, &palette, &options, None).unwrap();
        let whites = out.image.data().iter().filter(|&&i| i == 1).count();
        if rp.display() {
            eprintln!("  {dithering:?}: {whites} of 256 white");
        }
        counts.push(whites);
    }

    rp.compare_values(256.0, counts[0] as f64, 0.0);
    rp.check(counts[1] > 64 && counts[1] < 192, "ordered dithering mixes both entries");
    rp.check(counts[2] > 64 && counts[2] < 192, "old dithering mixes both entries");

    assert!(rp.cleanup(), "convert_dither regression test failed");
}

#[test]
fn convert_cancel() {
    let mut rp = RegParams::new("convert_cancel");

    let pixs = color_gradient(8, 1000).unwrap();
    let palette = gray_ramp_palette(4);
    let options = ConvertOptions {
        is_background: true,
        ..Default::default()
    };
    let mut delegate = CancelAfterRows {
        limit: 10,
        reports: Vec::new(),
    };

    let out = convert_pixel_format(&pixs, None, None, &palette, &options, Some(&mut delegate))
        .unwrap();
    rp.check(out.status == TaskStatus::Canceled, "conversion reports canceled");
    rp.compare_values(10.0, out.rows_done as f64, 0.0);
    rp.compare_values(10.0, delegate.reports.len() as f64, 0.0);
    rp.compare_values(0.01, delegate.reports[9], 1e-12);

    // Rows past the cancellation point are left zeroed.
    let untouched = (10..1000).all(|y| out.image.row_data(y).iter().all(|&p| p == 0));
    rp.check(untouched, "unconverted rows stay zero");

    // A caller-provided destination keeps its contents.
    let mut dst = Image::new(8, 1000, PixelFormat::Indexed).unwrap().into_mut();
    dst.clear(3);
    let mut delegate = CancelAfterRows {
        limit: 10,
        reports: Vec::new(),
    };
    let out = convert_pixel_format(
        &pixs,
        Some(dst.into()),
        None,
        &palette,
        &options,
        Some(&mut delegate),
    )
    .unwrap();
    rp.check(
        out.image.row_data(999).iter().all(|&p| p == 3),
        "unconverted rows of a given destination are untouched",
    );

    // Without cancellation every row reports progress, ending at 1.0.
    let mut delegate = CancelAfterRows {
        limit: usize::MAX,
        reports: Vec::new(),
    };
    let out = convert_pixel_format(&pixs, None, None, &palette, &options, Some(&mut delegate))
        .unwrap();
    rp.check(out.status.is_completed(), "conversion completed");
    rp.compare_values(1000.0, delegate.reports.len() as f64, 0.0);
    rp.compare_values(1.0, delegate.reports.last().copied().unwrap_or(0.0), 0.0);

    assert!(rp.cleanup(), "convert_cancel regression test failed");
}
