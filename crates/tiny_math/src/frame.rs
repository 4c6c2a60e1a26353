use crate::Vec3;

/// Local orthonormal basis (tangent `s`, bitangent `t`, normal `n`) at a
/// surface point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub s: Vec3,
    pub t: Vec3,
    pub n: Vec3,
}

impl Frame {
    /// Build a frame around a unit normal.
    ///
    /// Uses the branchless construction of Duff et al. (2017), so the basis
    /// is continuous everywhere except across the `n.z = 0` sign flip.
    pub fn from_normal(n: Vec3) -> Self {
        let sign = 1.0_f32.copysign(n.z);
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;
        let s = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
        let t = Vec3::new(b, sign + n.y * n.y * a, -n.y);
        Self { s, t, n }
    }

    /// Express a world-space vector in this frame.
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.s), v.dot(self.t), v.dot(self.n))
    }

    /// Express a local vector in world space.
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.s * v.x + self.t * v.y + self.n * v.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(frame: &Frame) {
        assert!((frame.s.length() - 1.0).abs() < 1e-5);
        assert!((frame.t.length() - 1.0).abs() < 1e-5);
        assert!(frame.s.dot(frame.t).abs() < 1e-5);
        assert!(frame.s.dot(frame.n).abs() < 1e-5);
        assert!(frame.t.dot(frame.n).abs() < 1e-5);
    }

    #[test]
    fn test_frame_is_orthonormal() {
        for n in [
            Vec3::Z,
            -Vec3::Z,
            Vec3::X,
            Vec3::new(1.0, 2.0, -3.0).normalize(),
            Vec3::new(-0.3, 0.1, 0.2).normalize(),
        ] {
            let frame = Frame::from_normal(n);
            assert_orthonormal(&frame);
            assert_eq!(frame.n, n);
        }
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = Frame::from_normal(Vec3::new(0.0, 1.0, 1.0).normalize());
        let v = Vec3::new(0.3, -0.7, 0.2);

        let back = frame.to_world(frame.to_local(v));
        assert!((back - v).length() < 1e-5);
    }

    #[test]
    fn test_normal_maps_to_local_z() {
        let n = Vec3::new(0.0, 0.6, 0.8);
        let frame = Frame::from_normal(n);

        let local = frame.to_local(n);
        assert!((local - Vec3::Z).length() < 1e-5);
    }
}
