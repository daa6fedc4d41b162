pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u8, y: u8) -> u8 {
    mul_div255_u16(u16::from(x), u16::from(y)) as u8
}

pub(crate) fn u8_to_unit(v: u8) -> f32 {
    f32::from(v) / 255.0
}

pub(crate) fn unit_to_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub(crate) fn premultiply_rgba8(px: [u8; 4]) -> [u8; 4] {
    let a = px[3];
    [
        mul_div255_u8(px[0], a),
        mul_div255_u8(px[1], a),
        mul_div255_u8(px[2], a),
        a,
    ]
}

/// Zero alpha maps to fully transparent black.
pub(crate) fn unpremultiply_rgba8(px: [u8; 4]) -> [u8; 4] {
    let a = u32::from(px[3]);
    match a {
        0 => [0, 0, 0, 0],
        255 => px,
        _ => {
            let un = |c: u8| (((u32::from(c) * 255) + a / 2) / a).min(255) as u8;
            [un(px[0]), un(px[1]), un(px[2]), px[3]]
        }
    }
}

pub(crate) fn unpremultiply_in_place(buf: &mut [u8]) {
    for px in buf.chunks_exact_mut(4) {
        let out = unpremultiply_rgba8([px[0], px[1], px[2], px[3]]);
        px.copy_from_slice(&out);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
