use kdrift::distance::TranslatedSquaredEuclidean;
use kdrift::tree::KdTree;

// A 2D swarm indexed with the [pos(2), vel(2), t0] layout, queried at two instants
// without moving a single point in the tree.
fn main() {
    let dimensions = 5;
    let mut tree: KdTree<&str> = KdTree::new(dimensions, 4).unwrap();

    // Three drones launched from different corners, all heading toward the center.
    tree.add(&[0.0, 0.0, 1.0, 1.0, 0.0], "alpha").unwrap();
    tree.add(&[100.0, 0.0, -1.0, 1.0, 0.0], "bravo").unwrap();
    tree.add(&[0.0, 100.0, 1.0, -1.0, 0.0], "charlie").unwrap();
    // A beacon that never moves.
    tree.add(&[50.0, 50.0, 0.0, 0.0, 0.0], "beacon").unwrap();

    let query = [50.0, 50.0, 0.0, 0.0, 0.0];

    println!("--- At launch (t = 0) ---");
    let metric = TranslatedSquaredEuclidean::new(dimensions, || 0.0).unwrap();
    for (distance, who) in tree
        .nearest_neighbors_with(&query, 4, -1.0, metric)
        .unwrap()
    {
        println!("{who} at squared distance {distance}");
    }

    println!("\n--- Mid-flight (t = 25) ---");
    let metric = TranslatedSquaredEuclidean::new(dimensions, || 25.0).unwrap();
    for (distance, who) in tree
        .nearest_neighbors_with(&query, 4, -1.0, metric)
        .unwrap()
    {
        println!("{who} at squared distance {distance}");
    }

    println!("\n--- Convergence (t = 50) ---");
    let metric = TranslatedSquaredEuclidean::new(dimensions, || 50.0).unwrap();
    for (distance, who) in tree
        .nearest_neighbors_with(&query, 4, -1.0, metric)
        .unwrap()
    {
        println!("{who} at squared distance {distance}");
    }
}
