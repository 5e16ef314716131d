use kdrift::distance::WeightedSquaredEuclidean;
use kdrift::tree::KdTree;

// Weighting one axis ten times heavier than the other changes which neighbor wins.
fn main() {
    let mut tree: KdTree<&str> = KdTree::new(2, 4).unwrap();

    tree.add(&[10.0, 0.0], "east").unwrap();
    tree.add(&[0.0, 9.0], "north").unwrap();
    tree.add(&[8.0, 8.0], "diagonal").unwrap();

    let query = [0.0, 0.0];

    println!("--- Unweighted ---");
    for (distance, who) in tree.nearest_neighbors(&query, 3).unwrap() {
        println!("{who} at squared distance {distance}");
    }

    println!("\n--- x-axis weighted 10x ---");
    let metric = WeightedSquaredEuclidean::new(2, vec![10.0, 1.0]).unwrap();
    for (distance, who) in tree
        .nearest_neighbors_with(&query, 3, -1.0, metric)
        .unwrap()
    {
        println!("{who} at squared distance {distance}");
    }

    // Keep the swarm honest: drag a point and search again.
    tree.move_point(&[1.0, 1.0], &"diagonal").unwrap();
    println!("\n--- After moving 'diagonal' to (1, 1) ---");
    for (distance, who) in tree.nearest_neighbors(&query, 1).unwrap() {
        println!("{who} at squared distance {distance}");
    }
}
