use lmbake_math::{BBox, Vec3};

/// A single index-triangle, as referenced by the BVH leaves.
#[derive(Debug, Clone, Copy)]
struct Triangle {
    a: Vec3,
    b: Vec3,
    c: Vec3,
    /// Index into `indices[3*n..3*n+3]` this triangle came from, i.e. `n`.
    index: u32,
}

impl Triangle {
    fn bounds(&self) -> BBox {
        let mut b = BBox::from_point(self.a);
        b.add_point(self.b);
        b.add_point(self.c);
        b
    }

    /// Moller-Trumbore ray/triangle intersection. Returns the hit distance
    /// along `dir` if it is within `(0, max_t]`.
    fn intersect(&self, origin: Vec3, dir: Vec3, max_t: f32) -> Option<f32> {
        const EPS: f32 = 1e-7;
        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;
        let pvec = dir.cross(edge2);
        let det = edge1.dot(pvec);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;
        let tvec = origin - self.a;
        let u = tvec.dot(pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let qvec = tvec.cross(edge1);
        let v = dir.dot(qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = edge2.dot(qvec) * inv_det;
        if t > EPS && t <= max_t {
            Some(t)
        } else {
            None
        }
    }
}

enum NodeKind {
    Leaf { first: u32, count: u32 },
    Split { left: u32, right: u32 },
}

struct Node {
    bounds: BBox,
    kind: NodeKind,
}

/// The result of a first-hit query: which source triangle (by `indices`
/// triangle number) was hit, and how far along the ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    pub triangle: i32,
    pub fraction: f32,
}

impl TraceHit {
    pub const MISS: Self = Self {
        triangle: -1,
        fraction: 1.0,
    };

    pub fn is_hit(&self) -> bool {
        self.triangle >= 0
    }
}

/// Static CPU triangle BVH, built once via [`Bvh::build`] and queried with
/// [`Bvh::find_first_hit`]. Median-split on the longest axis, no SAH.
pub struct Bvh {
    nodes: Vec<Node>,
    triangles: Vec<Triangle>,
    root: u32,
}

const LEAF_SIZE: usize = 4;

impl Bvh {
    pub fn build(vertices: &[Vec3], indices: &[u32]) -> Self {
        let mut triangles: Vec<Triangle> = indices
            .chunks_exact(3)
            .enumerate()
            .map(|(n, tri)| Triangle {
                a: vertices[tri[0] as usize],
                b: vertices[tri[1] as usize],
                c: vertices[tri[2] as usize],
                index: n as u32,
            })
            .collect();

        let mut nodes = Vec::new();
        let root = if triangles.is_empty() {
            nodes.push(Node {
                bounds: BBox::empty(),
                kind: NodeKind::Leaf { first: 0, count: 0 },
            });
            0
        } else {
            let len = triangles.len();
            Self::build_recursive(&mut nodes, &mut triangles, 0, len)
        };

        Self {
            nodes,
            triangles,
            root,
        }
    }

    fn build_recursive(nodes: &mut Vec<Node>, tris: &mut [Triangle], start: usize, end: usize) -> u32 {
        let mut bounds = BBox::empty();
        for t in &tris[start..end] {
            bounds = bounds.union(&t.bounds());
        }

        let count = end - start;
        if count <= LEAF_SIZE {
            let idx = nodes.len() as u32;
            nodes.push(Node {
                bounds,
                kind: NodeKind::Leaf {
                    first: start as u32,
                    count: count as u32,
                },
            });
            return idx;
        }

        let axis = bounds.longest_axis();
        tris[start..end].sort_by(|a, b| {
            let ca = a.bounds().center();
            let cb = b.bounds().center();
            ca[axis].partial_cmp(&cb[axis]).unwrap()
        });

        let mid = start + count / 2;
        let left = Self::build_recursive(nodes, tris, start, mid);
        let right = Self::build_recursive(nodes, tris, mid, end);

        let idx = nodes.len() as u32;
        nodes.push(Node {
            bounds,
            kind: NodeKind::Split { left, right },
        });
        idx
    }

    /// First-hit query along the segment `[origin, origin + dir * max_t]`.
    /// Returns a miss (`triangle == -1`) if the tree is empty or nothing is
    /// hit within range.
    pub fn find_first_hit(&self, origin: Vec3, dir: Vec3, max_t: f32) -> TraceHit {
        if self.triangles.is_empty() || max_t <= 0.0 {
            return TraceHit::MISS;
        }

        let inv_dir = Vec3::new(
            if dir.x != 0.0 { 1.0 / dir.x } else { f32::INFINITY },
            if dir.y != 0.0 { 1.0 / dir.y } else { f32::INFINITY },
            if dir.z != 0.0 { 1.0 / dir.z } else { f32::INFINITY },
        );

        let mut best = TraceHit::MISS;
        let mut best_t = max_t;
        self.visit(self.root, origin, dir, inv_dir, max_t, &mut best, &mut best_t);
        best
    }

    fn visit(
        &self,
        node_idx: u32,
        origin: Vec3,
        dir: Vec3,
        inv_dir: Vec3,
        max_t: f32,
        best: &mut TraceHit,
        best_t: &mut f32,
    ) {
        let node = &self.nodes[node_idx as usize];
        if node.bounds.ray_intersect(origin, inv_dir, *best_t).is_none() {
            return;
        }

        match node.kind {
            NodeKind::Leaf { first, count } => {
                for t in &self.triangles[first as usize..(first + count) as usize] {
                    if let Some(hit_t) = t.intersect(origin, dir, *best_t) {
                        *best_t = hit_t;
                        *best = TraceHit {
                            triangle: t.index as i32,
                            fraction: hit_t / max_t,
                        };
                    }
                }
            }
            NodeKind::Split { left, right } => {
                self.visit(left, origin, dir, inv_dir, max_t, best, best_t);
                self.visit(right, origin, dir, inv_dir, max_t, best, best_t);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> (Vec<Vec3>, Vec<u32>) {
        let verts = vec![
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ];
        let idx = vec![0, 1, 2, 0, 2, 3];
        (verts, idx)
    }

    #[test]
    fn ray_through_quad_center_hits() {
        let (v, i) = quad();
        let bvh = Bvh::build(&v, &i);
        let hit = bvh.find_first_hit(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0), 10.0);
        assert!(hit.is_hit());
        assert!((hit.fraction - 0.5).abs() < 1e-4);
    }

    #[test]
    fn ray_missing_quad_returns_miss() {
        let (v, i) = quad();
        let bvh = Bvh::build(&v, &i);
        let hit = bvh.find_first_hit(Vec3::new(5.0, 5.0, 5.0), Vec3::new(0.0, 0.0, -1.0), 10.0);
        assert!(!hit.is_hit());
    }

    #[test]
    fn empty_geometry_is_always_a_miss() {
        let bvh = Bvh::build(&[], &[]);
        let hit = bvh.find_first_hit(Vec3::ZERO, Vec3::Z, 100.0);
        assert!(!hit.is_hit());
    }

    #[test]
    fn many_triangles_build_balanced_tree_and_hit_correct_one() {
        let mut verts = Vec::new();
        let mut idx = Vec::new();
        for i in 0..64 {
            let x = i as f32 * 3.0;
            let base = verts.len() as u32;
            verts.push(Vec3::new(x - 1.0, -1.0, 0.0));
            verts.push(Vec3::new(x + 1.0, -1.0, 0.0));
            verts.push(Vec3::new(x, 1.0, 0.0));
            idx.extend_from_slice(&[base, base + 1, base + 2]);
        }
        let bvh = Bvh::build(&verts, &idx);
        let target_x = 30.0 * 3.0;
        let hit = bvh.find_first_hit(Vec3::new(target_x, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0), 10.0);
        assert!(hit.is_hit());
        assert_eq!(hit.triangle, 30);
    }
}
