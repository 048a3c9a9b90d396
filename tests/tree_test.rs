//! Tests for tree rendering of dependency graphs and relation trees.

use rstest::rstest;

use deptrim::domain::{
    DependencyGraph, Hierarchy, Marker, ModuleRegistry, RelationTree, TreeLine, TreePrinter,
};

fn graph(edges: &[(&str, &[&str])], root: &[&str]) -> DependencyGraph {
    let h: Hierarchy = edges
        .iter()
        .map(|(n, d)| (n.to_string(), d.iter().map(|s| s.to_string()).collect()))
        .collect();
    DependencyGraph::build(root, &ModuleRegistry::from_hierarchy(&h))
}

fn names(root: &[&str]) -> Vec<String> {
    root.iter().map(|s| s.to_string()).collect()
}

const SHOP: &[(&str, &[&str])] = &[
    ("base", &[]),
    ("mail", &["base"]),
    ("product", &["mail"]),
    ("sale", &["product", "mail"]),
    ("stock", &["product"]),
];

#[test]
fn given_shared_subtree_when_rendering_then_second_visit_is_marked() {
    // Arrange
    let g = graph(SHOP, &["sale", "stock"]);
    let root = names(&["sale", "stock"]);

    // Act
    let text = TreePrinter::new().render(&root, &g).to_text();

    // Assert
    let expected = "\
- sale
    - product
        - mail
            - base
    - mail (*)
- stock
    - product (*)
";
    assert_eq!(text, expected);
}

#[rstest]
#[case(Some(0), "")]
#[case(Some(1), "- sale\n- stock\n")]
#[case(Some(2), "- sale\n    - product\n    - mail\n- stock\n    - product\n")]
#[case(None, "- sale\n    - product\n        - mail\n            - base\n    - mail (*)\n- stock\n    - product (*)\n")]
fn given_depth_limit_when_rendering_then_prints_at_most_that_many_levels(
    #[case] limit: Option<usize>,
    #[case] expected: &str,
) {
    let g = graph(SHOP, &["sale", "stock"]);
    let root = names(&["sale", "stock"]);

    let text = TreePrinter::new()
        .with_depth_limit(limit)
        .render(&root, &g)
        .to_text();

    assert_eq!(text, expected);
}

#[test]
fn given_unknown_names_when_rendering_then_they_are_marked() {
    let g = graph(&[("sale", &["ghost"])], &["sale", "phantom"]);
    let root = names(&["sale", "phantom"]);

    let lines: Vec<TreeLine> = TreePrinter::new().render(&root, &g).lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1].to_string(), "    - ghost (unknown)");
    assert_eq!(lines[2].marker, Some(Marker::Unknown));
    assert_eq!(lines[2].depth, 0);
}

#[test]
fn given_custom_indent_when_rendering_then_uses_it() {
    let g = graph(SHOP, &["mail"]);
    let root = names(&["mail"]);

    let text = TreePrinter::new().with_indent(2).render(&root, &g).to_text();

    assert_eq!(text, "- mail\n  - base\n");
}

#[test]
fn given_render_when_consumed_partially_then_restart_begins_at_top() {
    let g = graph(SHOP, &["sale"]);
    let root = names(&["sale"]);
    let render = TreePrinter::new().render(&root, &g);

    let mut first = render.lines();
    first.next();
    first.next();
    let restarted: Vec<String> = render.lines().map(|l| l.name).collect();

    assert_eq!(restarted[0], "sale");
    assert_eq!(restarted.len(), 5);
}

#[test]
fn given_relation_tree_when_rendering_then_shows_how_removed_entries_are_reached() {
    let root = names(&["base", "sale", "mail", "stock"]);
    let g = graph(SHOP, &["base", "sale", "mail", "stock"]);
    let tree = RelationTree::build(&root, &g);

    let text = TreePrinter::new().render(tree.roots(), &tree).to_text();

    let expected = "\
- sale
    - product
        - mail
            - base
- stock
    - product (*)
";
    assert_eq!(text, expected);
}

#[test]
fn given_render_when_building_termtrees_then_display_uses_box_drawing() {
    let g = graph(SHOP, &["mail"]);
    let root = names(&["mail"]);

    let trees = TreePrinter::new().render(&root, &g).to_termtrees();

    assert_eq!(trees.len(), 1);
    let drawn = trees[0].to_string();
    assert!(drawn.starts_with("mail\n"));
    assert!(drawn.contains("base"));
}
