use cladeview::{MalformedKind, ParseError, parse_newick, write_newick};

const FLAVI: &str = include_str!("data/flavi.tre");

#[test]
fn test_standard_format_compliance() {
    let test_cases = vec![
        ("Empty nodes", "(,,(,));", 4, 6),
        ("Leaf names only", "(A,B,(C,D));", 4, 6),
        ("All nodes named", "(A,B,(C,D)E)F;", 4, 6),
        ("Branch lengths only", "(:0.1,:0.2,(:0.3,:0.4):0.5);", 4, 6),
        ("Names and branch lengths", "(A:0.1,B:0.2,(C:0.3,D:0.4):0.5);", 4, 6),
        ("Rooted on leaf", "((B:0.2,(C:0.3,D:0.4)E:0.5)F:0.1)A;", 3, 6),
        // Single node trees (single node is root, not tip)
        ("Single node", "A;", 0, 1),
        ("Single node with branch", "A:0.5;", 0, 1),
        ("Multifurcating tree", "(A,B,C,D);", 4, 5),
        ("Whitespace around tokens", " ( A : 1 ,\n\tB : 2 ) ;\n", 2, 3),
    ];

    for (name, newick_str, expected_tips, expected_total_nodes) in test_cases {
        println!("Testing: {}", name);
        let tree = parse_newick(newick_str)
            .unwrap_or_else(|err| panic!("Failed to parse tree {name}: {err}"));

        assert_eq!(tree.tip_count_all(), expected_tips, "Wrong tip count for {name}");
        assert_eq!(
            tree.node_count_all(),
            expected_total_nodes,
            "Wrong node count for {name}"
        );
    }
}

#[test]
fn test_labels_lengths_and_support() {
    let tree = parse_newick("((Aspergillus flavus:0.5,B:2)90:3,C:4);").unwrap();

    let flavus = tree.node_id_by_name("Aspergillus flavus").unwrap();
    assert_eq!(tree.branch_length(flavus), 0.5);
    assert_eq!(tree.support(&flavus), None);

    let clade = tree.node_id_by_name("90").unwrap();
    assert_eq!(tree.support(&clade).as_deref(), Some("90"));
    assert_eq!(tree.node(Some(clade)).unwrap().support_value(), Some(90.0));
    assert_eq!(tree.branch_length(clade), 3.0);
    assert!(tree.has_branch_lengths());
}

#[test]
fn test_root_length_is_cleared() {
    let tree = parse_newick(FLAVI).unwrap();
    let root_id = tree.first_node_id().unwrap();

    assert_eq!(tree.node(Some(root_id)).unwrap().branch_length(), None);
    assert_eq!(tree.tip_count_all(), 13);
    assert_eq!(tree.child_count(&root_id), 3);
    assert!(!tree.is_rooted());
}

#[test]
fn test_tree_without_lengths() {
    let tree = parse_newick("((A,B),C);").unwrap();
    assert!(!tree.has_branch_lengths());
    assert_eq!(tree.height(), 0.0);
}

#[test]
fn test_round_trip() {
    let test_cases = vec![
        "(A:1,B:2,C:3);",
        "((A:1,B:2)90:3,(C:4,D:5)80:6,E:7);",
        "(A,B,(C,D));",
        "(A:0.000001,B:0.25);",
    ];

    for newick_str in test_cases {
        println!("Round trip: {}", newick_str);
        let tree = parse_newick(newick_str).unwrap();
        assert_eq!(write_newick(&tree), newick_str);
    }
}

#[test]
fn test_round_trip_drops_root_length() {
    let tree = parse_newick(FLAVI).unwrap();
    let written = write_newick(&tree);

    assert_eq!(written, FLAVI.trim().replace(")98:0.0;", ")98;"));
    let reparsed = parse_newick(&written).unwrap();
    assert_eq!(write_newick(&reparsed), written);
}

#[test]
fn test_malformed_input() {
    let test_cases = vec![
        ("Unclosed parenthesis", "(A:1,B:2;", MalformedKind::UnbalancedParentheses, 8),
        ("Extra closing parenthesis", "(A:1,B:2));", MalformedKind::UnbalancedParentheses, 9),
        ("Comma at top level", "A,B;", MalformedKind::UnbalancedParentheses, 1),
        ("Unclosed at end of input", "((A,B)", MalformedKind::UnbalancedParentheses, 6),
        ("Length not a number", "(A:1,B:x);", MalformedKind::InvalidLength, 7),
        ("Negative length", "(A:1,B:-2);", MalformedKind::InvalidLength, 7),
        ("Infinite length", "(A:1,B:inf);", MalformedKind::InvalidLength, 7),
        ("Label after length", "(A:1 B,C);", MalformedKind::InvalidLength, 3),
        ("No terminator", "(A:1,B:2)", MalformedKind::MissingTerminator, 9),
        ("Input after terminator", "(A:1,B:2); C", MalformedKind::TrailingInput, 11),
        ("Second tree", "(A,B);(C,D);", MalformedKind::TrailingInput, 6),
        ("Double colon", "(A::1,B:2);", MalformedKind::UnexpectedToken, 3),
        ("Colon without value", "(A:1,B:);", MalformedKind::UnexpectedToken, 7),
        ("Two lengths", "(A:1:2,B);", MalformedKind::UnexpectedToken, 5),
        ("Group after group", "(A,B)(C);", MalformedKind::UnexpectedToken, 5),
        ("Blank input", "", MalformedKind::Empty, 0),
        ("Whitespace only", "   ", MalformedKind::Empty, 3),
        ("Terminator only", ";", MalformedKind::Empty, 0),
    ];

    for (name, newick_str, expected_kind, expected_position) in test_cases {
        println!("Testing malformed: {}", name);
        let err = parse_newick(newick_str)
            .err()
            .unwrap_or_else(|| panic!("{name} should not parse"));

        assert_eq!(err.kind(), Some(expected_kind), "Wrong kind for {name}: {err}");
        assert_eq!(
            err.position(),
            Some(expected_position),
            "Wrong position for {name}: {err}"
        );
    }
}

#[test]
fn test_error_fragment_surrounds_position() {
    let err = parse_newick("((A:1,B:2)90:3,(C:4,D:oops)80:6,E:7);").unwrap_err();
    match err {
        ParseError::Malformed { kind, position, fragment } => {
            assert_eq!(kind, MalformedKind::InvalidLength);
            assert_eq!(position, 22);
            assert!(fragment.contains("D:oops"), "fragment was {fragment:?}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
