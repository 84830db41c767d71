use cladeview::{NodeId, PreconditionError, Tree, parse_newick, write_newick};
use std::collections::{BTreeMap, BTreeSet};

const FLAVI: &str = include_str!("data/flavi.tre");

fn tip_names(tree: &Tree) -> BTreeSet<String> {
    tree.tip_node_ids_all()
        .iter()
        .filter_map(|id| tree.name(id))
        .map(|name| name.to_string())
        .collect()
}

fn pairwise_distances(tree: &Tree) -> BTreeMap<(String, String), f64> {
    let tips = tree.tip_node_ids_all();
    let mut distances = BTreeMap::new();
    for (i, &u) in tips.iter().enumerate() {
        for &v in &tips[i + 1..] {
            let mut key = (
                tree.name(&u).unwrap().to_string(),
                tree.name(&v).unwrap().to_string(),
            );
            if key.0 > key.1 {
                key = (key.1, key.0);
            }
            distances.insert(key, tree.path_length(u, v).unwrap());
        }
    }
    distances
}

fn assert_same_distances(before: &Tree, after: &Tree, context: &str) {
    let expected = pairwise_distances(before);
    let actual = pairwise_distances(after);
    assert_eq!(expected.len(), actual.len(), "{context}");
    for (pair, distance) in &expected {
        let other = actual[pair];
        assert!(
            (distance - other).abs() < 1e-9,
            "{context}: distance {pair:?} changed from {distance} to {other}"
        );
    }
}

#[test]
fn test_reroot_fixtures() {
    let test_cases = vec![
        (
            "Trifurcating root, leaf outgroup",
            "(A:1,B:2,C:3);",
            "A",
            "(A:0.5,(B:2,C:3):0.5);",
        ),
        (
            "Trifurcating root, support moves down",
            "((A:1,B:2)90:3,(C:4,D:5)80:6,E:7);",
            "A",
            "(A:0.5,(B:2,((C:4,D:5)80:6,E:7)90:3):0.5);",
        ),
        (
            "Deep chain shifts support by one edge",
            "(((A:1,B:2)95:3,C:4)85:5,D:6,E:7);",
            "A",
            "(A:0.5,(B:2,(C:4,(D:6,E:7)85:5)95:3):0.5);",
        ),
        (
            "Bifurcating root reuses remaining child",
            "((A:1,B:2)90:3,(C:4,D:5)80:6);",
            "C",
            "(C:2,(D:5,(A:1,B:2)80:9):2);",
        ),
        (
            "Internal node hanging from the root",
            "((A:1,B:2)90:3,C:4,D:5);",
            "90",
            "((A:1,B:2)90:1.5,(C:4,D:5)90:1.5);",
        ),
        (
            "Internal node of a bifurcating root",
            "((A:1,B:2)90:3,(C:4,D:5)80:6);",
            "90",
            "((A:1,B:2)90:4.5,(C:4,D:5)90:4.5);",
        ),
        (
            "Single-child root",
            "((A:1,B:2)ab:3);",
            "A",
            "(A:1.5,B:1.5);",
        ),
        (
            "Single-child root above a multifurcation",
            "((A:1,B:2,C:3)abc:4);",
            "A",
            "(A:0.5,(B:2,C:3):0.5);",
        ),
        (
            "Chain of single children below the root",
            "(((A:1,B:2)ab:3)x:1);",
            "B",
            "(B:1.5,A:1.5);",
        ),
        (
            "No branch lengths",
            "((A,B),C,D);",
            "A",
            "(A,(B,(C,D)));",
        ),
    ];

    for (name, newick_str, outgroup, expected) in test_cases {
        println!("Testing reroot: {}", name);
        let mut tree = parse_newick(newick_str).unwrap();
        let root_id = tree.first_node_id().unwrap();
        let outgroup_id = tree.node_id_by_name(outgroup).unwrap();

        tree.reroot(outgroup_id).unwrap();

        assert_eq!(write_newick(&tree), expected, "{name}");
        assert_eq!(tree.first_node_id(), Some(root_id), "{name}: root changed");
        assert_eq!(tree.child_ids(&root_id)[0], outgroup_id, "{name}");
        assert!(tree.is_rooted(), "{name}: root is not bifurcating");
    }
}

#[test]
fn test_synthetic_node_is_unnamed() {
    let mut tree = parse_newick("(A:1,B:2,C:3);").unwrap();
    let before = tree.node_ids_all().len();
    let a = tree.node_id_by_name("A").unwrap();

    tree.reroot(a).unwrap();

    assert_eq!(tree.node_ids_all().len(), before + 1);
    let root_id = tree.first_node_id().unwrap();
    let synthetic = tree.child_ids(&root_id)[1];
    let node = tree.node(Some(synthetic)).unwrap();
    assert_eq!(node.name(), None);
    assert_eq!(node.support(), None);
}

#[test]
fn test_support_stays_with_its_split() {
    let mut tree = parse_newick("(((A:1,B:2)95:3,C:4)85:5,D:6,E:7);").unwrap();
    let a = tree.node_id_by_name("A").unwrap();
    tree.reroot(a).unwrap();

    // The former parent of the (A,B) node now hangs below it and carries
    // the support of the edge that separates {A,B} from the rest.
    let ab = tree.node_id_by_name("95").unwrap();
    let abc = tree.node_id_by_name("85").unwrap();
    assert_eq!(tree.parent_id(&abc), Some(&ab));
    assert_eq!(tree.support(&abc).as_deref(), Some("95"));
    assert_eq!(tree.support(&ab), None);

    let down = *tree.child_ids(&abc).last().unwrap();
    assert_eq!(tree.support(&down).as_deref(), Some("85"));
    assert_eq!(tree.branch_length(down), 5.0);
    assert_eq!(tree.tip_names(&down).len(), 2);
}

#[test]
fn test_reroot_on_every_node_keeps_leaves_and_distances() {
    let original = parse_newick(FLAVI).unwrap();
    let names = tip_names(&original);

    for node_id in original.descendants_all() {
        let mut tree = original.clone();
        tree.reroot(node_id).unwrap();

        let context = format!("reroot on {node_id}");
        assert_eq!(tip_names(&tree), names, "{context}");
        assert_eq!(tree.tip_count_all(), original.tip_count_all(), "{context}");
        assert_same_distances(&original, &tree, &context);
    }
}

#[test]
fn test_repeated_reroots() {
    let mut tree = parse_newick("(A:1,B:2,C:3);").unwrap();
    let a = tree.node_id_by_name("A").unwrap();
    let b = tree.node_id_by_name("B").unwrap();

    tree.reroot(a).unwrap();
    tree.reroot(b).unwrap();
    assert_eq!(write_newick(&tree), "(B:1,(C:3,A:1):1);");

    let original = parse_newick(FLAVI).unwrap();
    let mut tree = original.clone();
    for name in ["469", "962", "478", "100", "496", "988"] {
        let node_id = tree.node_id_by_name(name).unwrap();
        tree.reroot(node_id).unwrap();
        assert_same_distances(&original, &tree, &format!("after reroot on {name}"));
    }
}

#[test]
fn test_reroot_on_root_is_noop() {
    let mut tree = parse_newick("((A:1,B:2)90:3,C:4,D:5);").unwrap();
    let before = write_newick(&tree);
    let root_id = tree.first_node_id().unwrap();

    assert_eq!(tree.reroot(root_id), Ok(()));
    assert_eq!(write_newick(&tree), before);
}

#[test]
fn test_reroot_single_child_root() {
    let original = parse_newick("((A:1,B:2,(C:1,D:1)90:2)abc:4);").unwrap();
    for name in ["A", "B", "C", "90"] {
        let mut tree = original.clone();
        let node_id = tree.node_id_by_name(name).unwrap();

        tree.reroot(node_id).unwrap();

        let context = format!("reroot on {name}");
        assert!(tree.is_rooted(), "{context}");
        assert!(tree.node_id_by_name("abc").is_none(), "{context}");
        assert_eq!(tip_names(&tree), tip_names(&original), "{context}");
        assert_same_distances(&original, &tree, &context);
    }

    // The lone child already sits where the outgroup would go.
    let test_cases = vec![
        ("((A:1,B:2)ab:3);", "ab", "((A:1,B:2)ab:3);", 4),
        ("(A:1);", "A", "(A:1);", 2),
        ("(((A:1,B:2)ab:3)x:1);", "ab", "((A:1,B:2)ab:3);", 4),
    ];
    for (newick_str, name, expected, node_count) in test_cases {
        println!("Testing reroot on lone child of {}", newick_str);
        let mut tree = parse_newick(newick_str).unwrap();
        let node_id = tree.node_id_by_name(name).unwrap();
        assert_eq!(tree.reroot(node_id), Ok(()));
        assert_eq!(write_newick(&tree), expected);
        assert_eq!(tree.node_count_all(), node_count);
    }
}

#[test]
fn test_reroot_preconditions() {
    let mut tree = parse_newick("(A:1,B:2,C:3);").unwrap();
    assert_eq!(
        tree.reroot(NodeId::default()),
        Err(PreconditionError::DetachedNode(NodeId::default()))
    );

    let mut tree = Tree::new();
    assert_eq!(tree.reroot(NodeId::default()), Err(PreconditionError::EmptyTree));
}

/// Non-trivial splits of the unrooted topology, each written as the side
/// that does not contain the alphabetically first tip.
fn splits(tree: &Tree) -> BTreeSet<BTreeSet<String>> {
    let all = tip_names(tree);
    let Some(first) = all.iter().next().cloned() else {
        return BTreeSet::new();
    };
    let root_id = tree.first_node_id().unwrap();
    tree.descendants_all()
        .into_iter()
        .filter(|id| *id != root_id)
        .filter_map(|id| {
            let clade: BTreeSet<String> =
                tree.tip_names(&id).iter().map(|n| n.to_string()).collect();
            if clade.len() < 2 || clade.len() > all.len() - 2 {
                return None;
            }
            if clade.contains(&first) {
                Some(all.difference(&clade).cloned().collect())
            } else {
                Some(clade)
            }
        })
        .collect()
}

#[test]
fn test_reroot_keeps_bipartitions() {
    let original = parse_newick(FLAVI).unwrap();
    let expected = splits(&original);
    assert_eq!(expected.len(), original.internal_node_count_all() - 1);

    for node_id in original.descendants_all() {
        let mut tree = original.clone();
        tree.reroot(node_id).unwrap();
        assert_eq!(splits(&tree), expected, "reroot on {node_id}");

        // Rooting back on the tip that came first keeps the splits too.
        let first = tree.tip_node_ids_all()[0];
        tree.reroot(first).unwrap();
        assert_eq!(splits(&tree), expected, "second reroot after {node_id}");
    }
}
