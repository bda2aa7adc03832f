use super::DetectedCircle;
use kiddo::{KdTree, SquaredEuclidean};

/// Collapse detections whose centres are closer than `min_distance`,
/// keeping the strongest of each cluster.
pub fn dedup_circles(mut circles: Vec<DetectedCircle>, min_distance: f32) -> Vec<DetectedCircle> {
    circles.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.circle.center.y.total_cmp(&b.circle.center.y))
            .then(a.circle.center.x.total_cmp(&b.circle.center.x))
    });

    let min_sq = min_distance * min_distance;
    let mut tree: KdTree<f32, 2> = KdTree::new();
    let mut kept: Vec<DetectedCircle> = Vec::with_capacity(circles.len());
    for c in circles {
        let p = [c.circle.center.x, c.circle.center.y];
        let clash = tree
            .within_unsorted::<SquaredEuclidean>(&p, min_sq)
            .iter()
            .any(|nn| nn.distance < min_sq);
        if !clash {
            tree.add(&p, kept.len() as u64);
            kept.push(c);
        }
    }
    kept
}
