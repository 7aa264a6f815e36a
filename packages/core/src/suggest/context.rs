use crate::graph::{GraphStore, Node};
use std::collections::HashSet;

const MAX_EXCERPT_CHARS: usize = 280;

fn excerpt(text: &str) -> String {
    if text.chars().count() <= MAX_EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_EXCERPT_CHARS - 3).collect();
    format!("{cut}...")
}

fn describe(node: &Node) -> String {
    let title = node.data.summary_title.as_deref().unwrap_or("untitled");
    format!(
        "[{}] {}: {}",
        node.kind.as_str(),
        title,
        excerpt(&node.data.text_content)
    )
}

/// The chain of ancestors feeding `node_id` (root first, the node itself
/// last), formatted one step per line for the suggestion service. Cycles in
/// malformed graphs are guarded by the visited set.
pub fn ancestry_context(store: &GraphStore, node_id: &str) -> String {
    let mut chain: Vec<String> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut current = node_id.to_string();

    while visited.insert(current.clone()) {
        let Some(node) = store.node(&current) else {
            break;
        };
        chain.push(describe(node));
        let Some(parent) = store
            .edges()
            .find(|edge| edge.target == current)
            .map(|edge| edge.source.clone())
        else {
            break;
        };
        current = parent;
    }

    chain.reverse();
    chain.join("\n")
}

/// Grades the researcher has assigned, formatted as extra steering context.
/// Nodes without a grade are omitted; strongest evidence first.
pub fn graded_context(store: &GraphStore) -> String {
    let mut graded: Vec<(&Node, u8)> = store
        .nodes()
        .filter_map(|node| node.data.grade.map(|grade| (node, grade)))
        .collect();
    graded.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

    graded
        .into_iter()
        .map(|(node, grade)| format!("{} (graded {grade}/5)", describe(node)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Connection, NodeKind, Position};

    fn titled(store: &mut GraphStore, kind: NodeKind, title: &str, text: &str) -> String {
        let mut node = Node::with_text(kind, Position::default(), text);
        node.data.summary_title = Some(title.to_string());
        let id = node.id.clone();
        store.add_node(node);
        id
    }

    fn link(store: &mut GraphStore, source: &str, target: &str) {
        store.connect(Connection {
            source: source.to_string(),
            target: target.to_string(),
            ..Default::default()
        });
    }

    #[test]
    fn ancestry_runs_root_first_and_ends_at_the_node() {
        let mut store = GraphStore::new();
        let a = titled(&mut store, NodeKind::Observation, "Effect", "Recall improved");
        let b = titled(&mut store, NodeKind::Mechanism, "Pathway", "Adenosine blockade");
        let c = titled(&mut store, NodeKind::Validation, "Trial", "Randomized trial");
        link(&mut store, &a, &b);
        link(&mut store, &b, &c);

        let context = ancestry_context(&store, &c);
        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("[observation] Effect"));
        assert!(lines[1].starts_with("[mechanism] Pathway"));
        assert!(lines[2].starts_with("[validation] Trial"));
    }

    #[test]
    fn ancestry_of_a_root_is_just_the_node() {
        let mut store = GraphStore::new();
        let a = titled(&mut store, NodeKind::Observation, "Effect", "Recall improved");
        let context = ancestry_context(&store, &a);
        assert_eq!(context.lines().count(), 1);
    }

    #[test]
    fn ancestry_survives_a_cycle() {
        let mut store = GraphStore::new();
        let a = titled(&mut store, NodeKind::Observation, "A", "a");
        let b = titled(&mut store, NodeKind::Mechanism, "B", "b");
        link(&mut store, &a, &b);
        link(&mut store, &b, &a);

        let context = ancestry_context(&store, &b);
        assert_eq!(context.lines().count(), 2);
    }

    #[test]
    fn graded_context_lists_only_graded_nodes_strongest_first() {
        let mut store = GraphStore::new();
        let a = titled(&mut store, NodeKind::Observation, "Weak", "weak evidence");
        let b = titled(&mut store, NodeKind::Validation, "Strong", "strong evidence");
        titled(&mut store, NodeKind::Mechanism, "Ungraded", "no grade");
        store.update_node_data(&a, crate::graph::NodeDataPatch {
            grade: Some(2),
            ..Default::default()
        });
        store.update_node_data(&b, crate::graph::NodeDataPatch {
            grade: Some(5),
            ..Default::default()
        });

        let context = graded_context(&store);
        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Strong"));
        assert!(lines[0].contains("5/5"));
        assert!(lines[1].contains("Weak"));
    }

    #[test]
    fn long_text_is_excerpted() {
        let mut store = GraphStore::new();
        let long = "x".repeat(1000);
        let a = titled(&mut store, NodeKind::Observation, "Long", &long);
        let context = ancestry_context(&store, &a);
        assert!(context.len() < 400);
        assert!(context.ends_with("..."));
    }
}
