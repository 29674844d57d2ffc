use frame_vision::core_modules::blur::blur_filter;
use frame_vision::core_modules::edge_detector::edge_detector;
use frame_vision::core_modules::grayscale::grayscale_converter;
use frame_vision::core_modules::histogram::histogram_aggregator;
use frame_vision::{InvalidInput, PixelBuffer, PixelFormat, Stage, process_frame};

fn gray_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> PixelBuffer {
    let samples: Vec<u8> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| f(x, y))
        .collect();
    PixelBuffer::new(width, height, PixelFormat::Gray8, samples).unwrap()
}

fn bgr_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> PixelBuffer {
    let samples: Vec<u8> = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .flat_map(|(x, y)| f(x, y))
        .collect();
    PixelBuffer::new(width, height, PixelFormat::Bgr8, samples).unwrap()
}

/// A cheap deterministic pseudo-random byte for test patterns.
fn noise(x: u32, y: u32, seed: u32) -> u8 {
    let mut v = x.wrapping_mul(374_761_393)
        ^ y.wrapping_mul(668_265_263)
        ^ seed.wrapping_mul(2_246_822_519);
    v = (v ^ (v >> 13)).wrapping_mul(1_274_126_177);
    (v >> 24) as u8
}

#[test]
fn histogram_sums_to_pixel_count_for_many_shapes() {
    for (width, height, seed) in [(1, 1, 0), (7, 3, 1), (64, 48, 2), (3, 200, 3), (255, 1, 4)] {
        let buf = gray_from_fn(width, height, |x, y| noise(x, y, seed));
        let hist = histogram_aggregator::compute(&buf).unwrap();
        assert_eq!(hist.total(), (width * height) as u64, "{width}x{height}");
    }
}

#[test]
fn histogram_of_known_two_by_four_buffer() {
    let buf = PixelBuffer::new(
        4,
        2,
        PixelFormat::Gray8,
        vec![0u8, 0, 255, 255, 128, 128, 64, 64],
    )
    .unwrap();
    let hist = histogram_aggregator::compute(&buf).unwrap();
    for value in 0..256usize {
        let expected = if [0, 64, 128, 255].contains(&value) { 2 } else { 0 };
        assert_eq!(hist[value], expected, "bin {value}");
    }
}

#[test]
fn black_frame_converts_to_black_gray() {
    let frame = PixelBuffer::uniform(100, 100, PixelFormat::Bgr8, &[0, 0, 0]).unwrap();
    let gray = grayscale_converter::convert(&frame).unwrap();
    assert_eq!((gray.width(), gray.height(), gray.channels()), (100, 100, 1));
    assert!(gray.samples().iter().all(|&v| v == 0));
}

#[test]
fn blur_with_kernel_one_is_identity() {
    let frame = bgr_from_fn(31, 17, |x, y| [noise(x, y, 1), noise(x, y, 2), noise(x, y, 3)]);
    assert_eq!(blur_filter::apply(&frame, 1).unwrap().samples(), frame.samples());
}

#[test]
fn blur_preserves_shape() {
    let frame = bgr_from_fn(20, 10, |x, y| [noise(x, y, 4), 0, 255]);
    let gray = gray_from_fn(20, 10, |x, y| noise(x, y, 5));
    for raw in [1, 2, 3, 8, 15, 30, 31] {
        for buf in [&frame, &gray] {
            let out = blur_filter::apply(buf, raw).unwrap();
            assert_eq!((out.width(), out.height()), (buf.width(), buf.height()));
            assert_eq!(out.channels(), buf.channels());
        }
    }
}

#[test]
fn edge_map_is_binary_and_threshold_order_free() {
    let buf = gray_from_fn(64, 48, |x, y| {
        let square = (16..48).contains(&x) && (12..36).contains(&y);
        let base = if square { 200 } else { 40 };
        base / 2 + noise(x, y, 9) / 8
    });
    let forward = edge_detector::detect(&buf, 40, 120).unwrap();
    let inverted = edge_detector::detect(&buf, 120, 40).unwrap();

    assert!(forward.samples().iter().all(|&v| v == 0 || v == 255));
    assert_eq!(forward, inverted);
    assert!(forward.samples().contains(&255), "the square outline should be found");
}

#[test]
fn every_stage_rejects_empty_buffers() {
    let empty_color = PixelBuffer::new(0, 5, PixelFormat::Bgr8, Vec::<u8>::new()).unwrap();
    let empty_gray = PixelBuffer::new(5, 0, PixelFormat::Gray8, Vec::<u8>::new()).unwrap();

    let is_empty_err = |err: InvalidInput| matches!(err, InvalidInput::EmptyBuffer { .. });
    assert!(is_empty_err(grayscale_converter::convert(&empty_color).unwrap_err()));
    assert!(is_empty_err(histogram_aggregator::compute(&empty_gray).unwrap_err()));
    assert!(is_empty_err(blur_filter::apply(&empty_color, 5).unwrap_err()));
    assert!(is_empty_err(blur_filter::apply(&empty_gray, 1).unwrap_err()));
    assert!(is_empty_err(edge_detector::detect(&empty_gray, 10, 20).unwrap_err()));
}

#[test]
fn uniform_frame_through_the_pipeline() {
    let frame = PixelBuffer::uniform(40, 30, PixelFormat::Bgr8, &[12, 200, 77]).unwrap();
    let out = process_frame(&frame, 5, 50, 150).unwrap();

    assert!(out.edges.samples().iter().all(|&v| v == 0));
    let filled: Vec<(usize, u64)> = out
        .histogram
        .bins()
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, count)| count > 0)
        .collect();
    assert_eq!(filled.len(), 1);
    assert_eq!(filled[0].1, 40 * 30);
    assert_eq!(out.grayscale.pixel(0, 0), Some(&[filled[0].0 as u8][..]));
}

#[test]
fn pipeline_reports_the_failing_stage() {
    let gray_frame = gray_from_fn(8, 8, |x, _| x as u8);
    let err = process_frame(&gray_frame, 5, 50, 150).unwrap_err();
    assert_eq!(err.stage, Stage::Grayscale);
    assert_eq!(err.source, InvalidInput::ChannelMismatch { expected: 3, actual: 1 });
}

#[test]
fn pipeline_outputs_line_up_with_individual_stages() {
    let frame = bgr_from_fn(33, 21, |x, y| [noise(x, y, 11), noise(x, y, 12), (x * 7) as u8]);
    let out = process_frame(&frame, 6, 150, 60).unwrap();

    let gray = grayscale_converter::convert(&frame).unwrap();
    assert_eq!(out.original, frame);
    assert_eq!(out.grayscale, gray);
    assert_eq!(out.histogram, histogram_aggregator::compute(&gray).unwrap());
    assert_eq!(out.blurred, blur_filter::apply(&frame, 7).unwrap());
    assert_eq!(out.edges, edge_detector::detect(&gray, 60, 150).unwrap());
}
