use super::*;

fn names(diff: &PropsDiff) -> Vec<String> {
    diff.changes()
        .iter()
        .map(|change| match change {
            PropChange::Set { name, value } => format!("set {name}={value}"),
            PropChange::Remove { name } => format!("remove {name}"),
            PropChange::AddListener { event, .. } => format!("listen {event}"),
            PropChange::RemoveListener { event, .. } => format!("unlisten {event}"),
            PropChange::TextContent(Some(text)) => format!("text {text}"),
            PropChange::TextContent(None) => "text cleared".to_owned(),
        })
        .collect()
}

#[test]
fn identical_props_produce_empty_diff() {
    let prev = Props::new().attr("id", "a").attr("tabindex", 3i64);
    let next = prev.clone();
    assert!(diff_props(&prev, &next).is_empty());
}

#[test]
fn removals_come_before_sets() {
    let prev = Props::new().attr("id", "a").attr("title", "old");
    let next = Props::new().attr("class", "big").attr("id", "b");

    let diff = diff_props(&prev, &next);

    assert_eq!(
        names(&diff),
        vec!["remove title", "set class=big", "set id=b"]
    );
}

#[test]
fn replacing_a_listener_removes_the_old_one() {
    let prev = Props::new().listener("onClick", || {});
    let next = Props::new().listener("onClick", || {});

    let diff = diff_props(&prev, &next);

    assert_eq!(names(&diff), vec!["unlisten onClick", "listen onClick"]);
}

#[test]
fn same_listener_is_not_rebound() {
    let listener = Listener::new(|| {});
    let prev = Props::new().attr("onClick", listener.clone());
    let next = Props::new().attr("onClick", listener);
    assert!(diff_props(&prev, &next).is_empty());
}

#[test]
fn dropped_listener_is_unbound() {
    let prev = Props::new().listener("onInput", || {});
    let next = Props::new();
    assert_eq!(names(&diff_props(&prev, &next)), vec!["unlisten onInput"]);
}

#[test]
fn text_content_changes_are_diffed_last() {
    let prev = Props::with_children("one").attr("id", "x");
    let next = Props::with_children("two").attr("id", "y");

    assert_eq!(
        names(&diff_props(&prev, &next)),
        vec!["set id=y", "text two"]
    );
}

#[test]
fn switching_from_text_to_children_clears_text() {
    let prev = Props::with_children("loading");
    let next = Props::with_children(Element::host("span", Props::new()));

    let diff = diff_props(&prev, &next);

    assert_eq!(diff.changes(), &[PropChange::TextContent(None)]);
}

#[test]
fn direct_text_detection() {
    assert!(should_set_text_content("textarea", &Props::new()));
    assert!(should_set_text_content("noscript", &Props::new()));
    assert!(should_set_text_content("p", &Props::with_children(42i32)));
    assert!(should_set_text_content(
        "div",
        &Props::new().attr(INNER_HTML, "<b>hi</b>")
    ));
    assert!(!should_set_text_content(
        "div",
        &Props::with_children(vec!["a", "b"])
    ));
    assert!(!should_set_text_content("div", &Props::new()));
}

#[test]
fn children_conversions() {
    assert_eq!(Children::from(""), Children::Empty);
    assert_eq!(Children::from(7i32).as_text().map(|t| t.to_string()), Some("7".to_owned()));
    assert_eq!(Children::from(None::<&str>), Children::Empty);
    assert!(matches!(
        Children::from(vec![1i32, 2]),
        Children::List(items) if items.len() == 2
    ));
}
