// SPDX-License-Identifier: MIT OR Apache-2.0
//! Column-major 4x4 matrix helpers.
//!
//! Element `(row, col)` lives at `m[col * 4 + row]`.

/// 4x4 column-major matrix
pub type Matrix4 = [f64; 16];

/// Identity matrix
pub const IDENTITY: Matrix4 = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Translation matrix
pub fn translation(t: [f64; 3]) -> Matrix4 {
    let mut m = IDENTITY;
    m[12] = t[0];
    m[13] = t[1];
    m[14] = t[2];
    m
}

/// Scaling matrix
pub fn scaling(s: [f64; 3]) -> Matrix4 {
    let mut m = IDENTITY;
    m[0] = s[0];
    m[5] = s[1];
    m[10] = s[2];
    m
}

/// Rotation from Euler angles in radians, applied roll (z), pitch (x),
/// then yaw (y)
pub fn rotation(r: [f64; 3]) -> Matrix4 {
    let (sx, cx) = r[0].sin_cos();
    let (sy, cy) = r[1].sin_cos();
    let (sz, cz) = r[2].sin_cos();

    let rx = [
        1.0, 0.0, 0.0, 0.0, //
        0.0, cx, sx, 0.0, //
        0.0, -sx, cx, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];
    let ry = [
        cy, 0.0, -sy, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        sy, 0.0, cy, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];
    let rz = [
        cz, sz, 0.0, 0.0, //
        -sz, cz, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ];
    multiply(&multiply(&ry, &rx), &rz)
}

/// `a * b`
pub fn multiply(a: &Matrix4, b: &Matrix4) -> Matrix4 {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            out[col * 4 + row] = (0..4).map(|k| a[k * 4 + row] * b[col * 4 + k]).sum();
        }
    }
    out
}

/// Translation * rotation * scaling
pub fn compose(scale: [f64; 3], rotate: [f64; 3], translate: [f64; 3]) -> Matrix4 {
    multiply(&translation(translate), &multiply(&rotation(rotate), &scaling(scale)))
}

/// Transform a point (w = 1)
pub fn transform_point(m: &Matrix4, p: [f64; 3]) -> [f64; 3] {
    let x = m[0] * p[0] + m[4] * p[1] + m[8] * p[2] + m[12];
    let y = m[1] * p[0] + m[5] * p[1] + m[9] * p[2] + m[13];
    let z = m[2] * p[0] + m[6] * p[1] + m[10] * p[2] + m[14];
    let w = m[3] * p[0] + m[7] * p[1] + m[11] * p[2] + m[15];
    if w != 0.0 && w != 1.0 {
        [x / w, y / w, z / w]
    } else {
        [x, y, z]
    }
}

/// Transform a full 4-component vector
pub fn transform_vector4(m: &Matrix4, v: [f64; 4]) -> [f64; 4] {
    let mut out = [0.0; 4];
    for (row, slot) in out.iter_mut().enumerate() {
        *slot = (0..4).map(|k| m[k * 4 + row] * v[k]).sum();
    }
    out
}

/// Transform a normal by the inverse transpose of the upper 3x3, then
/// renormalize
pub fn transform_normal(m: &Matrix4, n: [f64; 3]) -> [f64; 3] {
    let a = [m[0], m[1], m[2], m[4], m[5], m[6], m[8], m[9], m[10]];
    // Columns of the upper 3x3
    let c0 = [a[0], a[1], a[2]];
    let c1 = [a[3], a[4], a[5]];
    let c2 = [a[6], a[7], a[8]];

    // Inverse transpose is the cofactor matrix divided by the determinant
    let r0 = cross(c1, c2);
    let r1 = cross(c2, c0);
    let r2 = cross(c0, c1);
    let det = dot(c0, r0);

    let out = if det.abs() > f64::EPSILON {
        [
            (r0[0] * n[0] + r1[0] * n[1] + r2[0] * n[2]) / det,
            (r0[1] * n[0] + r1[1] * n[1] + r2[1] * n[2]) / det,
            (r0[2] * n[0] + r1[2] * n[1] + r2[2] * n[2]) / det,
        ]
    } else {
        [
            c0[0] * n[0] + c1[0] * n[1] + c2[0] * n[2],
            c0[1] * n[0] + c1[1] * n[1] + c2[1] * n[2],
            c0[2] * n[0] + c1[2] * n[1] + c2[2] * n[2],
        ]
    };
    normalize(out)
}

/// Cross product
pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Dot product
pub fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Unit vector, zero stays zero
pub fn normalize(v: [f64; 3]) -> [f64; 3] {
    let len = dot(v, v).sqrt();
    if len > 0.0 {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        v
    }
}
