//! Small `f32` vector helpers shared by the engines.

/// Logistic function, evaluated in `f64` and narrowed.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    (1.0 / (1.0 + (-f64::from(x)).exp())) as f32
}

/// Squared L2 norm.
#[inline]
pub fn squared_norm(v: &[f32]) -> f32 {
    v.iter().fold(0.0f32, |acc, x| acc + x * x)
}

/// `dst += src`, element-wise over the shorter of the two.
#[inline]
pub fn add_assign(dst: &mut [f32], src: &[f32]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d += s;
    }
}

/// `dst *= factor`.
#[inline]
pub fn scale(dst: &mut [f32], factor: f32) {
    for d in dst.iter_mut() {
        *d *= factor;
    }
}

/// Dot product over the shorter of the two slices.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).fold(0.0f32, |acc, (x, y)| acc + x * y)
}
