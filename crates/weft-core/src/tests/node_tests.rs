use super::*;
use crate::props::Props;

fn root_id() -> RootId {
    let mut roots: SlotMap<RootId, ()> = SlotMap::with_key();
    roots.insert(())
}

fn div(key: Option<&str>) -> Element {
    let element = Element::host("div", Props::new());
    match key {
        Some(key) => element.with_key(key),
        None => element,
    }
}

#[test]
fn work_in_progress_pairs_with_current() {
    let mut tree = NodeTree::new();
    let current = tree.create_from_element(&div(Some("a")));

    let wip = tree
        .create_work_in_progress(current, Rc::new(Props::new()))
        .expect("wip");

    assert_ne!(wip, current);
    assert_eq!(tree.get(wip).unwrap().alternate, Some(current));
    assert_eq!(tree.get(current).unwrap().alternate, Some(wip));
    assert_eq!(tree.get(wip).unwrap().key.as_deref(), Some("a"));
    assert_eq!(tree.len(), 2);
}

#[test]
fn second_work_in_progress_reuses_the_alternate() {
    let mut tree = NodeTree::new();
    let current = tree.create_from_element(&div(None));
    let first = tree
        .create_work_in_progress(current, Rc::new(Props::new()))
        .unwrap();
    tree.get_mut(first).unwrap().flags = EffectFlags::PLACEMENT;
    tree.get_mut(first).unwrap().deletions.push(current);

    let next_props = Rc::new(Props::new().attr("id", "x"));
    let second = tree
        .create_work_in_progress(current, Rc::clone(&next_props))
        .unwrap();

    assert_eq!(second, first);
    let node = tree.get(second).unwrap();
    assert!(node.flags.is_empty());
    assert!(node.deletions.is_empty());
    assert!(Rc::ptr_eq(&node.pending_props, &next_props));
    assert_eq!(tree.len(), 2);
}

#[test]
fn work_in_progress_copies_links_and_state() {
    let mut tree = NodeTree::new();
    let current = tree.create_from_element(&div(None));
    let child = tree.create_text(Rc::from("hi"));
    let chain = Rc::new(HookChain::default());
    {
        let node = tree.get_mut(current).unwrap();
        node.child = Some(child);
        node.index = 3;
        node.state = Some(Rc::clone(&chain));
        node.instance = Instance::Host(HostHandle(9));
    }

    let wip = tree
        .create_work_in_progress(current, Rc::new(Props::new()))
        .unwrap();

    let node = tree.get(wip).unwrap();
    assert_eq!(node.child, Some(child));
    assert_eq!(node.index, 3);
    assert!(Rc::ptr_eq(node.state.as_ref().unwrap(), &chain));
    assert_eq!(node.instance.host(), Some(HostHandle(9)));
}

#[test]
fn root_of_walks_parent_links() {
    let mut tree = NodeTree::new();
    let root = root_id();
    let root_node = tree.create_root_node(root);
    let child = tree.create_from_element(&div(None));
    let grandchild = tree.create_text(Rc::from("leaf"));
    tree.get_mut(child).unwrap().parent = Some(root_node);
    tree.get_mut(grandchild).unwrap().parent = Some(child);

    assert_eq!(tree.root_of(grandchild), Some(root));

    let detached = tree.create_text(Rc::from("lost"));
    assert_eq!(tree.root_of(detached), None);
}

#[test]
fn ensure_alternate_keeps_the_parent() {
    let mut tree = NodeTree::new();
    let root_node = tree.create_root_node(root_id());
    let child = tree.create_from_element(&div(None));
    tree.get_mut(child).unwrap().parent = Some(root_node);

    let alternate = tree.ensure_alternate(child).unwrap();

    assert_eq!(tree.get(alternate).unwrap().parent, Some(root_node));
    assert_eq!(tree.ensure_alternate(child).unwrap(), alternate);
}

#[test]
fn free_subtree_drops_both_buffers() {
    let mut tree = NodeTree::new();
    let parent = tree.create_from_element(&div(None));
    let child = tree.create_text(Rc::from("a"));
    tree.get_mut(parent).unwrap().child = Some(child);
    tree.get_mut(child).unwrap().parent = Some(parent);
    let parent_alt = tree.ensure_alternate(parent).unwrap();
    let child_alt = tree.ensure_alternate(child).unwrap();
    let bystander = tree.create_text(Rc::from("b"));

    tree.free_subtree(parent);

    for id in [parent, parent_alt, child, child_alt] {
        assert!(!tree.contains(id));
    }
    assert!(tree.contains(bystander));
    assert_eq!(
        tree.get(parent).unwrap_err(),
        RenderError::StaleNode { node: parent }
    );
}

#[test]
fn discard_pass_frees_only_nodes_of_that_pass() {
    let mut tree = NodeTree::new();
    let committed = tree.create_from_element(&div(None));
    tree.finish_pass();

    tree.begin_pass();
    let wip = tree
        .create_work_in_progress(committed, Rc::new(Props::new()))
        .unwrap();
    let fresh = tree.create_text(Rc::from("new"));
    tree.discard_pass();

    assert!(tree.contains(committed));
    assert!(!tree.contains(wip));
    assert!(!tree.contains(fresh));
    assert_eq!(tree.info(committed).unwrap().alternate, None);
}

#[test]
fn info_reports_kind_and_name() {
    let mut tree = NodeTree::new();
    let id = tree.create_from_element(&div(Some("k")));

    let info = tree.info(id).unwrap();

    assert_eq!(info.kind, NodeKind::HostElement);
    assert_eq!(info.name.as_deref(), Some("div"));
    assert_eq!(info.key.as_deref(), Some("k"));
    assert_eq!(info.hook_count, 0);
    assert!(tree.info(NodeId::default()).is_none());
}
