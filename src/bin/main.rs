use avl_arena::AvlTree;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut tree = AvlTree::new();

    for (key, city) in [
        (5, "New York"),
        (4, "Boston"),
        (8, "Los Angeles"),
        (7, "Houston"),
        (9, "Fort Lauderdale"),
    ] {
        tree.insert(key, city);
        tree.assert_invariants();
        println!("{:?}", tree.iter().map(|(key, _)| key).collect::<Vec<_>>());
    }

    match tree.get(9) {
        Some(city) => println!("9 => {city}"),
        None => println!("9 not found"),
    }

    let mut graph = String::new();
    if tree.dotgraph("cities", &mut graph).is_ok() {
        println!("{graph}");
    }

    tree.delete(5);
    tree.assert_invariants();
    println!("{tree:?}");
}
