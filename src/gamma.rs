use std::sync::OnceLock;

/// Returns the 256-entry table mapping an 8-bit encoded value to its linear
/// intensity in `[0, 1]`.
///
/// With `srgb == true` the table applies the inverse sRGB transfer function;
/// otherwise it is the identity scaled by `1/255`.
///
/// The tables are built on first use and shared by all callers.
pub fn compute_gamma_lut(srgb: bool) -> &'static [f32; 256] {
    static SRGB: OnceLock<[f32; 256]> = OnceLock::new();
    static LINEAR: OnceLock<[f32; 256]> = OnceLock::new();

    if srgb {
        SRGB.get_or_init(|| build_lut(srgb_to_linear))
    } else {
        LINEAR.get_or_init(|| build_lut(|x| x))
    }
}

fn build_lut(f: impl Fn(f32) -> f32) -> [f32; 256] {
    let mut lut = [0.0; 256];
    for (i, out) in lut.iter_mut().enumerate() {
        *out = f(i as f32 / 255.0);
    }
    lut
}

fn srgb_to_linear(x: f32) -> f32 {
    if x <= 0.04045 {
        x / 12.92
    } else {
        ((x + 0.055) / 1.055).powf(2.4)
    }
}
