//! Bounding Volume Hierarchy (BVH) over scene triangles.
//!
//! Uses a binary tree with median splits for nearest-hit ray queries.

use tiny_math::{Aabb, Frame, Interval, Ray, Vec2, Vec3};

use crate::{Shape, SurfaceInteraction};

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// Nearest-hit ray query over a fixed scene.
///
/// Implementations must be deterministic for a given scene and ray and
/// return the hit with the smallest parameter inside `ray.t`.
pub trait SpatialIndex: Send + Sync {
    fn intersect(&self, ray: &Ray) -> Option<SurfaceInteraction>;

    /// Bounds of everything the index can hit.
    fn bounds(&self) -> Aabb;
}

/// A triangle copied out of a shape, with its corner normals.
#[derive(Debug, Clone)]
struct Triangle {
    p: [Vec3; 3],
    n: [Vec3; 3],
    shape_id: usize,
    bbox: Aabb,
}

/// Raw Möller-Trumbore result, turned into an interaction only for the winner.
struct TriangleHit<'a> {
    t: f32,
    u: f32,
    v: f32,
    triangle: &'a Triangle,
}

impl Triangle {
    fn new(p: [Vec3; 3], n: [Vec3; 3], shape_id: usize) -> Self {
        let bbox = Aabb::from_point_set(&p);
        Self {
            p,
            n,
            shape_id,
            bbox,
        }
    }

    /// Möller-Trumbore ray-triangle intersection algorithm.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<TriangleHit<'_>> {
        let edge1 = self.p[1] - self.p[0];
        let edge2 = self.p[2] - self.p[0];

        let h = ray.direction.cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-10 {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.p[0];
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(q);
        if !ray_t.contains(t) {
            return None;
        }

        Some(TriangleHit {
            t,
            u,
            v,
            triangle: self,
        })
    }
}

impl TriangleHit<'_> {
    fn interaction(&self, ray: &Ray) -> SurfaceInteraction {
        let tri = self.triangle;
        let face = (tri.p[1] - tri.p[0]).cross(tri.p[2] - tri.p[0]).normalize_or_zero();
        let w = 1.0 - self.u - self.v;
        let shading = (tri.n[0] * w + tri.n[1] * self.u + tri.n[2] * self.v).normalize_or_zero();
        let shading = if shading == Vec3::ZERO { face } else { shading };

        let frame_ns = Frame::from_normal(shading);
        SurfaceInteraction {
            p: ray.at(self.t),
            frame_ns,
            frame_ng: Frame::from_normal(face),
            uv: Vec2::new(self.u, self.v),
            t: self.t,
            wi: frame_ns.to_local(-ray.direction.normalize_or_zero()),
            shape_id: tri.shape_id,
            material_id: tri.shape_id,
        }
    }
}

/// BVH node - either a branch with two children or a leaf with primitives.
enum BvhNode {
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    Leaf {
        triangles: Vec<Triangle>,
        bbox: Aabb,
    },
    Empty,
}

impl BvhNode {
    /// Simple median-split approach: sort triangles by centroid on the
    /// longest centroid axis, split in half, recurse.
    fn build(mut triangles: Vec<Triangle>) -> Self {
        let n = triangles.len();
        if n == 0 {
            return BvhNode::Empty;
        }

        let bounds = triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, tri| Aabb::surrounding(&acc, &tri.bbox));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                triangles,
                bbox: bounds,
            };
        }

        let centroid_bounds = triangles.iter().fold(Aabb::EMPTY, |acc, tri| {
            let c = tri.bbox.centroid();
            Aabb::surrounding(&acc, &Aabb::from_points(c, c))
        });
        let axis = centroid_bounds.longest_axis();

        triangles.sort_unstable_by(|a, b| {
            let a_val = a.bbox.centroid()[axis];
            let b_val = b.bbox.centroid()[axis];
            a_val
                .partial_cmp(&b_val)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let right_triangles = triangles.split_off(n / 2);
        let left = Self::build(triangles);
        let right = Self::build(right_triangles);

        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
        }
    }

    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<TriangleHit<'_>> {
        match self {
            BvhNode::Empty => None,

            BvhNode::Leaf { triangles, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }

                let mut closest: Option<TriangleHit<'_>> = None;
                for tri in triangles {
                    let t_max = closest.as_ref().map_or(ray_t.max, |h| h.t);
                    if let Some(hit) = tri.hit(ray, ray_t.with_max(t_max)) {
                        closest = Some(hit);
                    }
                }
                closest
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, ray_t) {
                    return None;
                }

                let hit_left = left.hit(ray, ray_t);

                // Only check right up to closest hit
                let right_max = hit_left.as_ref().map_or(ray_t.max, |h| h.t);
                let hit_right = right.hit(ray, ray_t.with_max(right_max));

                hit_right.or(hit_left)
            }
        }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }
}

/// Triangle BVH over every shape of a scene.
pub struct Bvh {
    root: BvhNode,
    triangle_count: usize,
}

impl Bvh {
    /// Build a BVH from the scene's shapes. Shape `i` gets `shape_id == i`.
    pub fn build(shapes: &[Shape]) -> Self {
        let triangles: Vec<Triangle> = shapes
            .iter()
            .enumerate()
            .flat_map(|(shape_id, shape)| {
                (0..shape.mesh.triangle_count()).map(move |t| {
                    let (p, n) = shape.mesh.triangle(t);
                    Triangle::new(p, n, shape_id)
                })
            })
            .collect();

        let triangle_count = triangles.len();
        let start = std::time::Instant::now();
        let root = BvhNode::build(triangles);
        log::debug!(
            "Built BVH over {} triangles in {:?}",
            triangle_count,
            start.elapsed()
        );

        Self {
            root,
            triangle_count,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }
}

impl SpatialIndex for Bvh {
    fn intersect(&self, ray: &Ray) -> Option<SurfaceInteraction> {
        self.root
            .hit(ray, ray.t)
            .map(|hit| hit.interaction(ray))
    }

    fn bounds(&self) -> Aabb {
        self.root.bounding_box()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mesh;
    use tiny_math::Mat4;

    fn quad_at(z: f32, name: &str) -> Shape {
        Shape::new(
            name,
            Mesh::quad().transformed(&Mat4::from_translation(Vec3::new(0.0, 0.0, z))),
        )
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::build(&[]);
        assert!(matches!(bvh.root, BvhNode::Empty));

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        assert!(bvh.intersect(&ray).is_none());
    }

    #[test]
    fn test_bvh_single_quad() {
        let bvh = Bvh::build(&[quad_at(-1.0, "quad")]);
        assert!(matches!(bvh.root, BvhNode::Leaf { .. }));

        let ray = Ray::new(Vec3::ZERO, -Vec3::Z);
        let hit = bvh.intersect(&ray).expect("ray should hit the quad");

        assert!((hit.t - 1.0).abs() < 1e-5);
        assert!((hit.p - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        assert!((hit.frame_ns.n - Vec3::Z).length() < 1e-5);
        assert_eq!(hit.shape_id, 0);
    }

    #[test]
    fn test_bvh_returns_nearest_hit() {
        let shapes: Vec<Shape> = (0..10)
            .map(|i| quad_at(-(i as f32) - 1.0, &format!("quad{}", i)))
            .rev()
            .collect();
        let bvh = Bvh::build(&shapes);
        assert_eq!(bvh.triangle_count(), 20);

        let ray = Ray::new(Vec3::new(0.1, 0.2, 0.0), -Vec3::Z);
        let hit = bvh.intersect(&ray).expect("ray should hit");

        // Nearest quad sits at z = -1 and was pushed last.
        assert!((hit.p.z + 1.0).abs() < 1e-5);
        assert_eq!(hit.shape_id, 9);
        assert_eq!(hit.material_id, 9);
    }

    #[test]
    fn test_bvh_respects_ray_interval() {
        let bvh = Bvh::build(&[quad_at(-5.0, "far")]);

        let short = Ray::with_interval(Vec3::ZERO, -Vec3::Z, Interval::new(0.0, 2.0));
        assert!(bvh.intersect(&short).is_none());
    }

    #[test]
    fn test_bvh_miss() {
        let bvh = Bvh::build(&[quad_at(-1.0, "quad")]);

        let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), -Vec3::Z);
        assert!(bvh.intersect(&ray).is_none());

        let away = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(bvh.intersect(&away).is_none());
    }

    #[test]
    fn test_shading_normal_is_interpolated() {
        let sphere = Shape::new("sphere", Mesh::uv_sphere(32, 16));
        let bvh = Bvh::build(&[sphere]);

        let ray = Ray::new(Vec3::new(0.3, 0.2, 5.0), -Vec3::Z);
        let hit = bvh.intersect(&ray).expect("ray should hit the sphere");

        // Smooth normal tracks the hit point on a unit sphere closely.
        assert!((hit.frame_ns.n - hit.p.normalize()).length() < 0.05);
        assert!((hit.frame_ns.n.length() - 1.0).abs() < 1e-4);
    }
}
