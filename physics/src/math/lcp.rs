use glam::{Mat2, Vec2};

/// Solves the two point mixed LCP of a contact manifold
///
/// ```text
/// vn = K * x + b
/// vn >= 0, x >= 0, vn_i * x_i = 0
/// ```
///
/// by enumerating the active sets: both points, the first only, the second only. When none of
/// these is valid both points are released and zero is returned. `b` is the relative normal
/// velocity minus the bias minus `K` times the accumulated impulse, and the result is the new
/// accumulated impulse.
pub fn solve_block_lcp(k: &Mat2, inv_k: &Mat2, b: Vec2) -> Vec2 {
    let k11 = k.x_axis.x;
    let k21 = k.x_axis.y;
    let k12 = k.y_axis.x;
    let k22 = k.y_axis.y;

    // both constraints active, vn = 0
    let x = -(*inv_k * b);
    if x.x >= 0.0 && x.y >= 0.0 {
        return x;
    }

    // first point active, second separating
    let x1 = -b.x / k11;
    let vn2 = k21 * x1 + b.y;
    if x1 >= 0.0 && vn2 >= 0.0 {
        return Vec2::new(x1, 0.0);
    }

    // second point active, first separating
    let x2 = -b.y / k22;
    let vn1 = k12 * x2 + b.x;
    if x2 >= 0.0 && vn1 >= 0.0 {
        return Vec2::new(0.0, x2);
    }

    Vec2::ZERO
}

#[cfg(test)]
mod test {
    use super::*;

    fn coupled() -> Mat2 {
        Mat2::from_cols(Vec2::new(2.0, 1.0), Vec2::new(1.0, 2.0))
    }

    #[test]
    fn test_both_active() {
        let k = Mat2::from_diagonal(Vec2::splat(2.0));
        let x = solve_block_lcp(&k, &k.inverse(), Vec2::new(-2.0, -4.0));
        assert!(x.abs_diff_eq(Vec2::new(1.0, 2.0), 1e-6));
    }

    #[test]
    fn test_first_active() {
        let k = coupled();
        let x = solve_block_lcp(&k, &k.inverse(), Vec2::new(-2.0, 4.0));
        assert!(x.abs_diff_eq(Vec2::new(1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_second_active() {
        let k = coupled();
        let x = solve_block_lcp(&k, &k.inverse(), Vec2::new(4.0, -2.0));
        assert!(x.abs_diff_eq(Vec2::new(0.0, 1.0), 1e-6));
    }

    #[test]
    fn test_separating() {
        let k = coupled();
        let x = solve_block_lcp(&k, &k.inverse(), Vec2::new(1.0, 1.0));
        assert_eq!(x, Vec2::ZERO);
    }
}
