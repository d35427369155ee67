use rayon::prelude::*;

// Below this many pixels the morphology passes stay on the calling thread.
const PARALLEL_MIN_PIXELS: usize = 64 * 1024;

/// Bilinear resize of a single-channel image using pixel-center alignment.
///
/// Source coordinates are clamped to the image edge, so an identity resize
/// returns the input unchanged.
pub fn resize_bilinear(
    pixels: &[u8],
    width: usize,
    height: usize,
    new_width: usize,
    new_height: usize,
) -> Vec<u8> {
    assert_eq!(pixels.len(), width * height);
    if width == 0 || height == 0 || new_width == 0 || new_height == 0 {
        return vec![0; new_width * new_height];
    }
    if width == new_width && height == new_height {
        return pixels.to_vec();
    }

    let x_taps: Vec<(usize, usize, f32)> = (0..new_width)
        .map(|nx| source_taps(nx, width, new_width))
        .collect();
    let mut output = vec![0u8; new_width * new_height];
    for (ny, out_row) in output.chunks_exact_mut(new_width).enumerate() {
        let (y0, y1, fy) = source_taps(ny, height, new_height);
        let row0 = &pixels[y0 * width..(y0 + 1) * width];
        let row1 = &pixels[y1 * width..(y1 + 1) * width];
        for (out, &(x0, x1, fx)) in out_row.iter_mut().zip(&x_taps) {
            let top = f32::from(row0[x0]) * (1.0 - fx) + f32::from(row0[x1]) * fx;
            let bottom = f32::from(row1[x0]) * (1.0 - fx) + f32::from(row1[x1]) * fx;
            let value = top * (1.0 - fy) + bottom * fy;
            *out = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    output
}

fn source_taps(dst: usize, src_len: usize, dst_len: usize) -> (usize, usize, f32) {
    let scale = src_len as f32 / dst_len as f32;
    let pos = (dst as f32 + 0.5) * scale - 0.5;
    if pos <= 0.0 {
        return (0, 0, 0.0);
    }
    let base = pos.floor() as usize;
    if base >= src_len - 1 {
        return (src_len - 1, src_len - 1, 0.0);
    }
    (base, base + 1, pos - base as f32)
}

/// Per-pixel `|a - b|`.
pub fn abs_diff(a: &[u8], b: &[u8]) -> Vec<u8> {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(&x, &y)| x.abs_diff(y)).collect()
}

/// Grayscale erosion with a `kernel x kernel` square. Neighbours outside the
/// image are ignored.
pub fn erode(pixels: &[u8], width: usize, height: usize, kernel: usize) -> Vec<u8> {
    rank_filter(pixels, width, height, kernel, u8::min)
}

/// Grayscale dilation with a `kernel x kernel` square. Neighbours outside the
/// image are ignored.
pub fn dilate(pixels: &[u8], width: usize, height: usize, kernel: usize) -> Vec<u8> {
    rank_filter(pixels, width, height, kernel, u8::max)
}

/// Morphological opening: erosion followed by dilation.
pub fn open(pixels: &[u8], width: usize, height: usize, kernel: usize) -> Vec<u8> {
    let eroded = erode(pixels, width, height, kernel);
    dilate(&eroded, width, height, kernel)
}

pub fn count_above(pixels: &[u8], threshold: u8) -> usize {
    pixels.iter().filter(|&&value| value > threshold).count()
}

// The square window is separable: a horizontal pass followed by a vertical one.
fn rank_filter(
    pixels: &[u8],
    width: usize,
    height: usize,
    kernel: usize,
    pick: fn(u8, u8) -> u8,
) -> Vec<u8> {
    assert_eq!(pixels.len(), width * height);
    if kernel <= 1 || width == 0 || height == 0 {
        return pixels.to_vec();
    }
    let before = kernel / 2;
    let after = kernel - 1 - before;
    let parallel = use_parallel(pixels.len());

    let mut horizontal = vec![0u8; pixels.len()];
    let row_pass = |(y, dst): (usize, &mut [u8])| {
        let src = &pixels[y * width..(y + 1) * width];
        for (x, out) in dst.iter_mut().enumerate() {
            let lo = x.saturating_sub(before);
            let hi = (x + after).min(width - 1);
            *out = src[lo..=hi].iter().copied().fold(src[x], pick);
        }
    };
    if parallel {
        horizontal
            .par_chunks_exact_mut(width)
            .enumerate()
            .for_each(row_pass);
    } else {
        horizontal
            .chunks_exact_mut(width)
            .enumerate()
            .for_each(row_pass);
    }

    let mut output = vec![0u8; pixels.len()];
    let column_pass = |(y, dst): (usize, &mut [u8])| {
        let lo = y.saturating_sub(before);
        let hi = (y + after).min(height - 1);
        dst.copy_from_slice(&horizontal[y * width..(y + 1) * width]);
        for row in lo..=hi {
            let src = &horizontal[row * width..(row + 1) * width];
            for (out, &value) in dst.iter_mut().zip(src) {
                *out = pick(*out, value);
            }
        }
    };
    if parallel {
        output
            .par_chunks_exact_mut(width)
            .enumerate()
            .for_each(column_pass);
    } else {
        output
            .chunks_exact_mut(width)
            .enumerate()
            .for_each(column_pass);
    }
    output
}

fn use_parallel(pixels: usize) -> bool {
    pixels >= PARALLEL_MIN_PIXELS && rayon::current_num_threads() > 1
}
