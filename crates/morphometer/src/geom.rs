//! Small planar geometry helpers on `[x, y]` pixel coordinates.

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

#[inline]
pub fn midpoint(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [0.5 * (a[0] + b[0]), 0.5 * (a[1] + b[1])]
}

/// Point `from + t·(to − from)`; `t > 1` extrapolates past `to`.
#[inline]
pub fn extrapolate(from: [f64; 2], to: [f64; 2], t: f64) -> [f64; 2] {
    [from[0] + t * (to[0] - from[0]), from[1] + t * (to[1] - from[1])]
}

/// `n` evenly spaced points from `a` to `b`, both endpoints included.
pub fn linspace(a: [f64; 2], b: [f64; 2], n: usize) -> Vec<[f64; 2]> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| extrapolate(a, b, i as f64 / last))
                .collect()
        }
    }
}

#[inline]
fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// Closed-segment intersection test for `p1–p2` against `q1–q2`.
///
/// Parallel (including collinear) segments never intersect. The crossing
/// point must lie inside both segments' bounding boxes.
pub fn segments_intersect(p1: [f64; 2], p2: [f64; 2], q1: [f64; 2], q2: [f64; 2]) -> bool {
    let r = [p2[0] - p1[0], p2[1] - p1[1]];
    let s = [q2[0] - q1[0], q2[1] - q1[1]];
    let denom = r[0] * s[1] - r[1] * s[0];
    if denom.abs() < 1e-12 {
        return false;
    }
    // p1 + t·r = q1 + u·s
    let t = cross(p1, q1, [p1[0] + s[0], p1[1] + s[1]]) / denom;
    let u = cross(p1, q1, [p1[0] + r[0], p1[1] + r[1]]) / denom;
    let eps = 1e-9;
    if !(-eps..=1.0 + eps).contains(&t) || !(-eps..=1.0 + eps).contains(&u) {
        return false;
    }
    let x = p1[0] + t * r[0];
    let y = p1[1] + t * r[1];
    let in_box = |a: [f64; 2], b: [f64; 2]| {
        x >= a[0].min(b[0]) - eps
            && x <= a[0].max(b[0]) + eps
            && y >= a[1].min(b[1]) - eps
            && y <= a[1].max(b[1]) + eps
    };
    in_box(p1, p2) && in_box(q1, q2)
}
